// SPDX-License-Identifier: PMPL-1.0-or-later

//! TDFOL formula model
//!
//! Formulas are immutable trees. Children sit behind [`Arc`] so rewriting a
//! formula shares every subtree it does not touch.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub mod logic;
pub mod normalize;
pub mod term;

pub use logic::{Flexible, ProofFormula, Quantifier};
pub use normalize::{context_fingerprint, Fingerprint};
pub use term::{fresh_name, unify_term_lists, unify_terms, Substitution, Term};

pub(crate) use term::write_predicate_name;

/// Words that open a temporal or deontic operator wherever a formula may start
pub(crate) const OPERATOR_KEYWORDS: &[&str] = &[
    "BEFORE",
    "AFTER",
    "DURING",
    "OBLIGATION",
    "PERMISSION",
    "PROHIBITION",
    "FORBIDDEN",
];

/// Temporal operator with its timepoints
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemporalOp {
    /// The body holds at some point strictly before the timepoint
    Before(Term),
    /// The body holds at some point strictly after the timepoint
    After(Term),
    /// The body holds throughout the closed interval
    During(Term, Term),
}

impl TemporalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            TemporalOp::Before(_) => "BEFORE",
            TemporalOp::After(_) => "AFTER",
            TemporalOp::During(_, _) => "DURING",
        }
    }

    pub fn timepoints(&self) -> Vec<&Term> {
        match self {
            TemporalOp::Before(t) | TemporalOp::After(t) => vec![t],
            TemporalOp::During(a, b) => vec![a, b],
        }
    }

    pub fn map_terms(&self, f: impl Fn(&Term) -> Term) -> TemporalOp {
        match self {
            TemporalOp::Before(t) => TemporalOp::Before(f(t)),
            TemporalOp::After(t) => TemporalOp::After(f(t)),
            TemporalOp::During(a, b) => TemporalOp::During(f(a), f(b)),
        }
    }

    /// Numeric `[start, end]` for a `During` with integer bounds
    pub fn numeric_window(&self) -> Option<(i64, i64)> {
        match self {
            TemporalOp::During(a, b) => Some((a.as_num()?, b.as_num()?)),
            _ => None,
        }
    }
}

/// Deontic modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeonticOp {
    Obligation,
    Permission,
    Prohibition,
}

impl DeonticOp {
    pub fn short(&self) -> &'static str {
        match self {
            DeonticOp::Obligation => "O",
            DeonticOp::Permission => "P",
            DeonticOp::Prohibition => "F",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            DeonticOp::Obligation => "OBLIGATION",
            DeonticOp::Permission => "PERMISSION",
            DeonticOp::Prohibition => "PROHIBITION",
        }
    }
}

impl fmt::Display for DeonticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// A TDFOL formula
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Formula {
    True,
    False,
    /// Predicate application; an atom is a predicate without arguments
    Predicate { name: String, args: Vec<Term> },
    Not(Arc<Formula>),
    And(Arc<Formula>, Arc<Formula>),
    Or(Arc<Formula>, Arc<Formula>),
    Implies(Arc<Formula>, Arc<Formula>),
    Iff(Arc<Formula>, Arc<Formula>),
    Quantified {
        kind: Quantifier,
        var: String,
        sort: Option<String>,
        body: Arc<Formula>,
    },
    Temporal { op: TemporalOp, body: Arc<Formula> },
    Deontic {
        op: DeonticOp,
        agent: Option<Term>,
        body: Arc<Formula>,
    },
}

impl Formula {
    pub fn atom(name: impl Into<String>) -> Self {
        Formula::Predicate {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn pred(name: impl Into<String>, args: Vec<Term>) -> Self {
        Formula::Predicate {
            name: name.into(),
            args,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        Formula::Not(Arc::new(f))
    }

    pub fn and(l: Formula, r: Formula) -> Self {
        Formula::And(Arc::new(l), Arc::new(r))
    }

    pub fn or(l: Formula, r: Formula) -> Self {
        Formula::Or(Arc::new(l), Arc::new(r))
    }

    pub fn implies(l: Formula, r: Formula) -> Self {
        Formula::Implies(Arc::new(l), Arc::new(r))
    }

    pub fn iff(l: Formula, r: Formula) -> Self {
        Formula::Iff(Arc::new(l), Arc::new(r))
    }

    pub fn forall(var: impl Into<String>, body: Formula) -> Self {
        Formula::Quantified {
            kind: Quantifier::Forall,
            var: var.into(),
            sort: None,
            body: Arc::new(body),
        }
    }

    pub fn exists(var: impl Into<String>, body: Formula) -> Self {
        Formula::Quantified {
            kind: Quantifier::Exists,
            var: var.into(),
            sort: None,
            body: Arc::new(body),
        }
    }

    pub fn temporal(op: TemporalOp, body: Formula) -> Self {
        Formula::Temporal {
            op,
            body: Arc::new(body),
        }
    }

    pub fn before(t: Term, body: Formula) -> Self {
        Self::temporal(TemporalOp::Before(t), body)
    }

    pub fn after(t: Term, body: Formula) -> Self {
        Self::temporal(TemporalOp::After(t), body)
    }

    pub fn during(start: Term, end: Term, body: Formula) -> Self {
        Self::temporal(TemporalOp::During(start, end), body)
    }

    pub fn deontic(op: DeonticOp, agent: Option<Term>, body: Formula) -> Self {
        Formula::Deontic {
            op,
            agent,
            body: Arc::new(body),
        }
    }

    pub fn obligation(agent: impl Into<Option<Term>>, body: Formula) -> Self {
        Self::deontic(DeonticOp::Obligation, agent.into(), body)
    }

    pub fn permission(agent: impl Into<Option<Term>>, body: Formula) -> Self {
        Self::deontic(DeonticOp::Permission, agent.into(), body)
    }

    pub fn prohibition(agent: impl Into<Option<Term>>, body: Formula) -> Self {
        Self::deontic(DeonticOp::Prohibition, agent.into(), body)
    }

    pub fn is_temporal(&self) -> bool {
        self.any_node(&|f| matches!(f, Formula::Temporal { .. }))
    }

    pub fn is_deontic(&self) -> bool {
        self.any_node(&|f| matches!(f, Formula::Deontic { .. }))
    }

    pub fn has_quantifiers(&self) -> bool {
        self.any_node(&|f| matches!(f, Formula::Quantified { .. }))
    }

    /// True when some atom takes arguments
    pub fn is_first_order(&self) -> bool {
        self.any_node(&|f| matches!(f, Formula::Predicate { args, .. } if !args.is_empty()))
    }

    fn any_node(&self, pred: &dyn Fn(&Formula) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        self.children().into_iter().any(|c| c.any_node(pred))
    }

    fn map_atom_terms(&self, f: &dyn Fn(&Term) -> Term) -> Formula {
        match self {
            Formula::Predicate { name, args } => Formula::Predicate {
                name: name.clone(),
                args: args.iter().map(f).collect(),
            },
            _ => self.clone(),
        }
    }

    fn free_vars_into(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        fn add_term(t: &Term, bound: &[String], out: &mut BTreeSet<String>) {
            let mut vars = BTreeSet::new();
            t.collect_vars(&mut vars);
            out.extend(vars.into_iter().filter(|v| !bound.contains(v)));
        }
        match self {
            Formula::True | Formula::False => {}
            Formula::Predicate { args, .. } => {
                for a in args {
                    add_term(a, bound, out);
                }
            }
            Formula::Not(a) => a.free_vars_into(bound, out),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Implies(a, b) | Formula::Iff(a, b) => {
                a.free_vars_into(bound, out);
                b.free_vars_into(bound, out);
            }
            Formula::Quantified { var, body, .. } => {
                bound.push(var.clone());
                body.free_vars_into(bound, out);
                bound.pop();
            }
            Formula::Temporal { op, body } => {
                for t in op.timepoints() {
                    add_term(t, bound, out);
                }
                body.free_vars_into(bound, out);
            }
            Formula::Deontic { agent, body, .. } => {
                if let Some(a) = agent {
                    add_term(a, bound, out);
                }
                body.free_vars_into(bound, out);
            }
        }
    }

    fn higher_order_under(&self, bound: &mut Vec<String>) -> bool {
        fn term_uses(t: &Term, bound: &[String]) -> bool {
            match t {
                Term::Func { name, args } => {
                    bound.contains(name) || args.iter().any(|a| term_uses(a, bound))
                }
                _ => false,
            }
        }
        match self {
            Formula::True | Formula::False => false,
            Formula::Predicate { name, args } => {
                let view: &[String] = bound;
                view.contains(name) || args.iter().any(|a| term_uses(a, view))
            }
            Formula::Not(a) => a.higher_order_under(bound),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Implies(a, b) | Formula::Iff(a, b) => {
                a.higher_order_under(bound) || b.higher_order_under(bound)
            }
            Formula::Quantified { var, body, .. } => {
                bound.push(var.clone());
                let found = body.higher_order_under(bound);
                bound.pop();
                found
            }
            Formula::Temporal { op, body } => {
                let in_times = {
                    let view: &[String] = bound;
                    op.timepoints().into_iter().any(|t| term_uses(t, view))
                };
                in_times || body.higher_order_under(bound)
            }
            Formula::Deontic { agent, body, .. } => {
                let in_agent = match agent {
                    Some(a) => term_uses(a, bound),
                    None => false,
                };
                in_agent || body.higher_order_under(bound)
            }
        }
    }

    /// Rebuild a quantified node whose binder must not capture variables of `incoming`
    fn requantify(
        kind: Quantifier,
        var: &str,
        sort: &Option<String>,
        body: &Formula,
        incoming: &[&Term],
        rebuild: impl FnOnce(&Formula) -> Formula,
    ) -> Formula {
        let captures = incoming.iter().any(|t| t.occurs(var));
        if captures {
            let mut taken = body.free_vars();
            for t in incoming {
                t.collect_vars(&mut taken);
            }
            taken.insert(var.to_string());
            let fresh = fresh_name(var, &taken);
            let renamed = body.substitute(var, &Term::Var(fresh.clone()));
            Formula::Quantified {
                kind,
                var: fresh,
                sort: sort.clone(),
                body: Arc::new(rebuild(&renamed)),
            }
        } else {
            Formula::Quantified {
                kind,
                var: var.to_string(),
                sort: sort.clone(),
                body: Arc::new(rebuild(body)),
            }
        }
    }
}

impl ProofFormula for Formula {
    fn verum() -> Self {
        Formula::True
    }

    fn falsum() -> Self {
        Formula::False
    }

    fn negation(inner: Self) -> Self {
        Formula::not(inner)
    }

    fn conjunction(left: Self, right: Self) -> Self {
        Formula::and(left, right)
    }

    fn disjunction(left: Self, right: Self) -> Self {
        Formula::or(left, right)
    }

    fn implication(left: Self, right: Self) -> Self {
        Formula::implies(left, right)
    }

    fn biconditional(left: Self, right: Self) -> Self {
        Formula::iff(left, right)
    }

    fn quantified(kind: Quantifier, var: String, sort: Option<String>, body: Self) -> Self {
        Formula::Quantified {
            kind,
            var,
            sort,
            body: Arc::new(body),
        }
    }

    fn is_verum(&self) -> bool {
        matches!(self, Formula::True)
    }

    fn is_falsum(&self) -> bool {
        matches!(self, Formula::False)
    }

    fn as_not(&self) -> Option<&Self> {
        match self {
            Formula::Not(a) => Some(&**a),
            _ => None,
        }
    }

    fn as_and(&self) -> Option<(&Self, &Self)> {
        match self {
            Formula::And(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_or(&self) -> Option<(&Self, &Self)> {
        match self {
            Formula::Or(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_implies(&self) -> Option<(&Self, &Self)> {
        match self {
            Formula::Implies(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_iff(&self) -> Option<(&Self, &Self)> {
        match self {
            Formula::Iff(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_quantified(&self) -> Option<(Quantifier, &str, Option<&str>, &Self)> {
        match self {
            Formula::Quantified {
                kind,
                var,
                sort,
                body,
            } => Some((*kind, var.as_str(), sort.as_deref(), &**body)),
            _ => None,
        }
    }

    fn children(&self) -> Vec<&Self> {
        match self {
            Formula::True | Formula::False | Formula::Predicate { .. } => Vec::new(),
            Formula::Not(a) => vec![&**a],
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Implies(a, b) | Formula::Iff(a, b) => {
                vec![&**a, &**b]
            }
            Formula::Quantified { body, .. }
            | Formula::Temporal { body, .. }
            | Formula::Deontic { body, .. } => vec![&**body],
        }
    }

    fn substitute(&self, var: &str, term: &Term) -> Self {
        match self {
            Formula::Quantified {
                kind,
                var: bound,
                sort,
                body,
            } => {
                if bound == var || !body.free_vars().contains(var) {
                    return self.clone();
                }
                Formula::requantify(*kind, bound, sort, body, &[term], |b| {
                    b.substitute(var, term)
                })
            }
            Formula::Not(a) => Formula::not(a.substitute(var, term)),
            Formula::And(a, b) => Formula::and(a.substitute(var, term), b.substitute(var, term)),
            Formula::Or(a, b) => Formula::or(a.substitute(var, term), b.substitute(var, term)),
            Formula::Implies(a, b) => {
                Formula::implies(a.substitute(var, term), b.substitute(var, term))
            }
            Formula::Iff(a, b) => Formula::iff(a.substitute(var, term), b.substitute(var, term)),
            Formula::Temporal { op, body } => Formula::temporal(
                op.map_terms(|t| t.replace_var(var, term)),
                body.substitute(var, term),
            ),
            Formula::Deontic { op, agent, body } => Formula::deontic(
                *op,
                agent.as_ref().map(|a| a.replace_var(var, term)),
                body.substitute(var, term),
            ),
            Formula::True | Formula::False | Formula::Predicate { .. } => {
                self.map_atom_terms(&|t| t.replace_var(var, term))
            }
        }
    }

    fn apply_subst(&self, subst: &Substitution) -> Self {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            Formula::Quantified {
                kind,
                var,
                sort,
                body,
            } => {
                let inner = subst.without(var);
                let free = body.free_vars();
                let incoming: Vec<&Term> = inner
                    .iter()
                    .filter(|(k, _)| free.contains(k.as_str()))
                    .map(|(_, t)| t)
                    .collect();
                Formula::requantify(*kind, var, sort, body, &incoming, |b| b.apply_subst(&inner))
            }
            Formula::Not(a) => Formula::not(a.apply_subst(subst)),
            Formula::And(a, b) => Formula::and(a.apply_subst(subst), b.apply_subst(subst)),
            Formula::Or(a, b) => Formula::or(a.apply_subst(subst), b.apply_subst(subst)),
            Formula::Implies(a, b) => Formula::implies(a.apply_subst(subst), b.apply_subst(subst)),
            Formula::Iff(a, b) => Formula::iff(a.apply_subst(subst), b.apply_subst(subst)),
            Formula::Temporal { op, body } => {
                Formula::temporal(op.map_terms(|t| t.apply(subst)), body.apply_subst(subst))
            }
            Formula::Deontic { op, agent, body } => Formula::deontic(
                *op,
                agent.as_ref().map(|a| a.apply(subst)),
                body.apply_subst(subst),
            ),
            Formula::True | Formula::False | Formula::Predicate { .. } => {
                self.map_atom_terms(&|t| t.apply(subst))
            }
        }
    }

    fn unify_with(&self, other: &Self, subst: &mut Substitution, flexible: &Flexible<'_>) -> bool {
        match (self, other) {
            (Formula::True, Formula::True) | (Formula::False, Formula::False) => true,
            (
                Formula::Predicate { name: p, args: xs },
                Formula::Predicate { name: q, args: ys },
            ) => p == q && unify_term_lists(xs, ys, subst, flexible),
            (Formula::Not(a), Formula::Not(b)) => a.unify_with(b, subst, flexible),
            (Formula::And(a1, b1), Formula::And(a2, b2))
            | (Formula::Or(a1, b1), Formula::Or(a2, b2))
            | (Formula::Implies(a1, b1), Formula::Implies(a2, b2))
            | (Formula::Iff(a1, b1), Formula::Iff(a2, b2)) => {
                a1.unify_with(a2, subst, flexible) && b1.unify_with(b2, subst, flexible)
            }
            (
                Formula::Quantified {
                    kind: k1,
                    var: v1,
                    sort: s1,
                    body: b1,
                },
                Formula::Quantified {
                    kind: k2,
                    var: v2,
                    sort: s2,
                    body: b2,
                },
            ) => {
                if k1 != k2 || s1 != s2 {
                    return false;
                }
                if v1 == v2 {
                    b1.unify_with(b2, subst, flexible)
                } else {
                    let renamed = b2.substitute(v2, &Term::Var(v1.clone()));
                    b1.unify_with(&renamed, subst, flexible)
                }
            }
            (Formula::Temporal { op: o1, body: b1 }, Formula::Temporal { op: o2, body: b2 }) => {
                let times_unify = match (o1, o2) {
                    (TemporalOp::Before(x), TemporalOp::Before(y))
                    | (TemporalOp::After(x), TemporalOp::After(y)) => {
                        unify_terms(x, y, subst, flexible)
                    }
                    (TemporalOp::During(a, b), TemporalOp::During(c, d)) => {
                        unify_terms(a, c, subst, flexible) && unify_terms(b, d, subst, flexible)
                    }
                    _ => false,
                };
                times_unify && b1.unify_with(b2, subst, flexible)
            }
            (
                Formula::Deontic {
                    op: o1,
                    agent: a1,
                    body: b1,
                },
                Formula::Deontic {
                    op: o2,
                    agent: a2,
                    body: b2,
                },
            ) => {
                let agents = match (a1, a2) {
                    (None, None) => true,
                    (Some(x), Some(y)) => unify_terms(x, y, subst, flexible),
                    _ => false,
                };
                o1 == o2 && agents && b1.unify_with(b2, subst, flexible)
            }
            _ => false,
        }
    }

    fn size(&self) -> usize {
        match self {
            Formula::True | Formula::False => 1,
            Formula::Predicate { args, .. } => 1 + args.iter().map(Term::size).sum::<usize>(),
            Formula::Not(a) => 1 + a.size(),
            Formula::And(a, b) | Formula::Or(a, b) | Formula::Implies(a, b) | Formula::Iff(a, b) => {
                1 + a.size() + b.size()
            }
            Formula::Quantified { body, .. } => 1 + body.size(),
            Formula::Temporal { op, body } => {
                1 + op.timepoints().iter().map(|t| t.size()).sum::<usize>() + body.size()
            }
            Formula::Deontic { agent, body, .. } => {
                1 + agent.as_ref().map(Term::size).unwrap_or(0) + body.size()
            }
        }
    }

    fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }

    fn collect_terms(&self, out: &mut IndexSet<Term>) {
        fn add(t: &Term, out: &mut IndexSet<Term>) {
            if let Term::Func { args, .. } = t {
                args.iter().for_each(|a| add(a, out));
            }
            if t.is_ground() {
                out.insert(t.clone());
            }
        }
        match self {
            Formula::Predicate { args, .. } => args.iter().for_each(|a| add(a, out)),
            _ => self.children().into_iter().for_each(|c| c.collect_terms(out)),
        }
    }

    fn collect_timepoints(&self, out: &mut IndexSet<Term>) {
        if let Formula::Temporal { op, .. } = self {
            for t in op.timepoints() {
                if t.is_ground() {
                    out.insert(t.clone());
                }
            }
        }
        self.children()
            .into_iter()
            .for_each(|c| c.collect_timepoints(out));
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Predicate { name, args } => {
                out.insert(name.clone());
                args.iter().for_each(|a| a.collect_symbols(out));
            }
            Formula::Temporal { op, body } => {
                op.timepoints().into_iter().for_each(|t| t.collect_symbols(out));
                body.collect_symbols(out);
            }
            Formula::Deontic { agent, body, .. } => {
                if let Some(a) = agent {
                    a.collect_symbols(out);
                }
                body.collect_symbols(out);
            }
            _ => self
                .children()
                .into_iter()
                .for_each(|c| c.collect_symbols(out)),
        }
    }

    fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.free_vars_into(&mut Vec::new(), &mut out);
        out
    }

    fn is_higher_order(&self) -> bool {
        self.higher_order_under(&mut Vec::new())
    }

    fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_formula(self)
    }
}

impl From<bool> for Formula {
    fn from(b: bool) -> Self {
        if b {
            Formula::True
        } else {
            Formula::False
        }
    }
}

// ============================================================================
// Canonical serialization
// ============================================================================

fn write_formula(
    formula: &Formula,
    f: &mut fmt::Formatter<'_>,
    bound: &mut Vec<String>,
    operand: bool,
) -> fmt::Result {
    match formula {
        Formula::True => write!(f, "⊤"),
        Formula::False => write!(f, "⊥"),
        Formula::Predicate { name, args } => {
            write_predicate_name(name, OPERATOR_KEYWORDS, f)?;
            if !args.is_empty() {
                write_term_list(args, f, bound)?;
            }
            Ok(())
        }
        Formula::Not(a) => {
            write!(f, "¬")?;
            write_formula(a, f, bound, true)
        }
        Formula::And(a, b) => write_binary(a, "∧", b, f, bound, operand),
        Formula::Or(a, b) => write_binary(a, "∨", b, f, bound, operand),
        Formula::Implies(a, b) => write_binary(a, "→", b, f, bound, operand),
        Formula::Iff(a, b) => write_binary(a, "↔", b, f, bound, operand),
        Formula::Quantified {
            kind,
            var,
            sort,
            body,
        } => {
            if operand {
                write!(f, "(")?;
            }
            write!(f, "{}{}", kind.symbol(), var)?;
            if let Some(s) = sort {
                write!(f, ":{}", s)?;
            }
            write!(f, ". ")?;
            bound.push(var.clone());
            let res = write_formula(body, f, bound, false);
            bound.pop();
            res?;
            if operand {
                write!(f, ")")?;
            }
            Ok(())
        }
        Formula::Temporal { op, body } => {
            write!(f, "{}[", op.keyword())?;
            for (i, t) in op.timepoints().into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", t.scoped(bound))?;
            }
            write!(f, "](")?;
            write_formula(body, f, bound, false)?;
            write!(f, ")")
        }
        Formula::Deontic { op, agent, body } => {
            match agent {
                Some(a) => write!(f, "{}[{}](", op.short(), a.scoped(bound))?,
                None => write!(f, "{}(", op.keyword())?,
            }
            write_formula(body, f, bound, false)?;
            write!(f, ")")
        }
    }
}

fn write_binary(
    l: &Formula,
    op: &str,
    r: &Formula,
    f: &mut fmt::Formatter<'_>,
    bound: &mut Vec<String>,
    operand: bool,
) -> fmt::Result {
    if operand {
        write!(f, "(")?;
    }
    write_formula(l, f, bound, true)?;
    write!(f, " {} ", op)?;
    write_formula(r, f, bound, true)?;
    if operand {
        write!(f, ")")?;
    }
    Ok(())
}

pub(crate) fn write_term_list(
    args: &[Term],
    f: &mut fmt::Formatter<'_>,
    bound: &[String],
) -> fmt::Result {
    write!(f, "(")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", a.scoped(bound))?;
    }
    write!(f, ")")
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_formula(self, f, &mut Vec::new(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn human(t: Term) -> Formula {
        Formula::pred("Human", vec![t])
    }

    #[test]
    fn test_display_quantified_implication() {
        let f = Formula::forall(
            "x",
            Formula::implies(human(Term::var("x")), Formula::pred("Mortal", vec![Term::var("x")])),
        );
        assert_eq!(f.to_string(), "∀x. Human(x) → Mortal(x)");
    }

    #[test]
    fn test_display_nested_binaries_are_parenthesised() {
        let p = Formula::atom("p");
        let q = Formula::atom("q");
        let r = Formula::atom("r");
        let f = Formula::implies(Formula::and(p.clone(), q), Formula::or(r, Formula::not(p)));
        assert_eq!(f.to_string(), "(p ∧ q) → (r ∨ ¬p)");
    }

    #[test]
    fn test_display_wrappers() {
        let f = Formula::during(
            Term::Num(1),
            Term::Num(10),
            Formula::obligation(Term::constant("A"), Formula::atom("pay")),
        );
        assert_eq!(f.to_string(), "DURING[1, 10](O[A](pay))");
        let g = Formula::prohibition(None, Formula::atom("smoke"));
        assert_eq!(g.to_string(), "PROHIBITION(smoke)");
    }

    #[test]
    fn test_keyword_and_non_identifier_predicates_are_quoted() {
        assert_eq!(Formula::atom("BEFORE").to_string(), "\"BEFORE\"");
        assert_eq!(Formula::atom("my pred").to_string(), "\"my pred\"");
        assert_eq!(Formula::atom("not").to_string(), "\"not\"");
        assert_eq!(Formula::atom("Pay").to_string(), "Pay");
        assert_eq!(
            Formula::pred("P", vec![Term::constant("A")]).to_string(),
            "P(A)"
        );
    }

    #[test]
    fn test_free_variable_display() {
        let f = human(Term::var("y"));
        assert_eq!(f.to_string(), "Human(?y)");
    }

    #[test]
    fn test_substitution_avoids_capture() {
        // ∀y. R(x, y) with x := y must rename the binder
        let f = Formula::forall("y", Formula::pred("R", vec![Term::var("x"), Term::var("y")]));
        let g = f.substitute("x", &Term::var("y"));
        match &g {
            Formula::Quantified { var, body, .. } => {
                assert_ne!(var, "y");
                assert_eq!(
                    **body,
                    Formula::pred("R", vec![Term::var("y"), Term::var(var.clone())])
                );
            }
            other => panic!("expected quantifier, got {}", other),
        }
    }

    #[test]
    fn test_substitution_respects_shadowing() {
        let f = Formula::forall("x", human(Term::var("x")));
        assert_eq!(f.substitute("x", &Term::constant("Socrates")), f);
    }

    #[test]
    fn test_higher_order_detection() {
        let f = Formula::forall("p", Formula::pred("p", vec![Term::constant("A")]));
        assert!(f.is_higher_order());
        let g = Formula::forall("x", human(Term::var("x")));
        assert!(!g.is_higher_order());
    }

    #[test]
    fn test_unify_formulas() {
        let pattern = human(Term::var("x'"));
        let fact = human(Term::constant("Socrates"));
        let mut s = Substitution::new();
        let flexible = |v: &str| v == "x'";
        assert!(pattern.unify_with(&fact, &mut s, &flexible));
        assert_eq!(s.resolve("x'"), Some(Term::constant("Socrates")));
    }

    #[test]
    fn test_collect_terms_and_timepoints() {
        let f = Formula::before(
            Term::Num(5),
            Formula::pred("Owes", vec![Term::constant("A"), Term::func("fee", vec![Term::Num(3)])]),
        );
        let mut terms = IndexSet::new();
        f.collect_terms(&mut terms);
        assert!(terms.contains(&Term::constant("A")));
        assert!(terms.contains(&Term::Num(3)));
        let mut times = IndexSet::new();
        f.collect_timepoints(&mut times);
        assert_eq!(times.into_iter().collect::<Vec<_>>(), vec![Term::Num(5)]);
    }

    #[test]
    fn test_size_counts_terms() {
        let f = Formula::not(Formula::pred("P", vec![Term::constant("A"), Term::constant("B")]));
        assert_eq!(f.size(), 4);
        assert_eq!(f.depth(), 2);
    }
}
