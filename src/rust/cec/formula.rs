// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cognitive Event Calculus formulas
//!
//! Event-calculus atoms carry their timepoints as ordinary terms, so the
//! generic substitution and unification machinery applies unchanged.
//! Cognitive operators always name an agent.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::formula::normalize::{binder_name, rename_term};
use crate::formula::{
    fresh_name, unify_term_lists, unify_terms, write_predicate_name, write_term_list, Fingerprint, Flexible,
    ProofFormula, Quantifier, Substitution, Term,
};

const CEC_DOMAIN: &str = "cec-v1:";

/// Plain predicates with these names are quoted so they do not read back as events
const EVENT_PREDICATE_NAMES: &[&str] = &["Happens", "HoldsAt", "Initiates", "Terminates", "Clipped"];

/// Built-in event-calculus predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventPredicate {
    /// `Happens(event, t)`
    Happens,
    /// `HoldsAt(fluent, t)`
    HoldsAt,
    /// `Initiates(event, fluent, t)`
    Initiates,
    /// `Terminates(event, fluent, t)`
    Terminates,
    /// `Clipped(t1, fluent, t2)`: the fluent is terminated somewhere in `[t1, t2)`
    Clipped,
}

impl EventPredicate {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Happens" => Some(EventPredicate::Happens),
            "HoldsAt" => Some(EventPredicate::HoldsAt),
            "Initiates" => Some(EventPredicate::Initiates),
            "Terminates" => Some(EventPredicate::Terminates),
            "Clipped" => Some(EventPredicate::Clipped),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventPredicate::Happens => "Happens",
            EventPredicate::HoldsAt => "HoldsAt",
            EventPredicate::Initiates => "Initiates",
            EventPredicate::Terminates => "Terminates",
            EventPredicate::Clipped => "Clipped",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            EventPredicate::Happens | EventPredicate::HoldsAt => 2,
            EventPredicate::Initiates | EventPredicate::Terminates | EventPredicate::Clipped => 3,
        }
    }

    /// Argument positions holding timepoints
    pub fn time_positions(&self) -> &'static [usize] {
        match self {
            EventPredicate::Happens | EventPredicate::HoldsAt => &[1],
            EventPredicate::Initiates | EventPredicate::Terminates => &[2],
            EventPredicate::Clipped => &[0, 2],
        }
    }
}

/// Agent-indexed mental modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CognitiveOp {
    Belief,
    Knowledge,
    Desire,
    Intention,
    Perception,
}

impl CognitiveOp {
    /// Single-letter and keyword spellings
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "B" | "BELIEVES" => Some(CognitiveOp::Belief),
            "K" | "KNOWS" => Some(CognitiveOp::Knowledge),
            "D" | "DESIRES" => Some(CognitiveOp::Desire),
            "I" | "INTENDS" => Some(CognitiveOp::Intention),
            "S" | "PERCEIVES" => Some(CognitiveOp::Perception),
            _ => None,
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            CognitiveOp::Belief => "B",
            CognitiveOp::Knowledge => "K",
            CognitiveOp::Desire => "D",
            CognitiveOp::Intention => "I",
            CognitiveOp::Perception => "S",
        }
    }
}

impl fmt::Display for CognitiveOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// A CEC formula
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CecFormula {
    True,
    False,
    Event { predicate: EventPredicate, args: Vec<Term> },
    Predicate { name: String, args: Vec<Term> },
    Not(Arc<CecFormula>),
    And(Arc<CecFormula>, Arc<CecFormula>),
    Or(Arc<CecFormula>, Arc<CecFormula>),
    Implies(Arc<CecFormula>, Arc<CecFormula>),
    Iff(Arc<CecFormula>, Arc<CecFormula>),
    Quantified {
        kind: Quantifier,
        var: String,
        sort: Option<String>,
        body: Arc<CecFormula>,
    },
    Cognitive {
        op: CognitiveOp,
        agent: Term,
        body: Arc<CecFormula>,
    },
}

impl CecFormula {
    pub fn pred(name: impl Into<String>, args: Vec<Term>) -> Self {
        CecFormula::Predicate {
            name: name.into(),
            args,
        }
    }

    pub fn event(predicate: EventPredicate, args: Vec<Term>) -> Self {
        CecFormula::Event { predicate, args }
    }

    pub fn happens(event: Term, time: Term) -> Self {
        Self::event(EventPredicate::Happens, vec![event, time])
    }

    pub fn holds_at(fluent: Term, time: Term) -> Self {
        Self::event(EventPredicate::HoldsAt, vec![fluent, time])
    }

    pub fn initiates(event: Term, fluent: Term, time: Term) -> Self {
        Self::event(EventPredicate::Initiates, vec![event, fluent, time])
    }

    pub fn terminates(event: Term, fluent: Term, time: Term) -> Self {
        Self::event(EventPredicate::Terminates, vec![event, fluent, time])
    }

    pub fn clipped(start: Term, fluent: Term, end: Term) -> Self {
        Self::event(EventPredicate::Clipped, vec![start, fluent, end])
    }

    pub fn not(f: CecFormula) -> Self {
        CecFormula::Not(Arc::new(f))
    }

    pub fn and(l: CecFormula, r: CecFormula) -> Self {
        CecFormula::And(Arc::new(l), Arc::new(r))
    }

    pub fn or(l: CecFormula, r: CecFormula) -> Self {
        CecFormula::Or(Arc::new(l), Arc::new(r))
    }

    pub fn implies(l: CecFormula, r: CecFormula) -> Self {
        CecFormula::Implies(Arc::new(l), Arc::new(r))
    }

    pub fn iff(l: CecFormula, r: CecFormula) -> Self {
        CecFormula::Iff(Arc::new(l), Arc::new(r))
    }

    pub fn forall(var: impl Into<String>, body: CecFormula) -> Self {
        <Self as ProofFormula>::quantified(Quantifier::Forall, var.into(), None, body)
    }

    pub fn cognitive(op: CognitiveOp, agent: Term, body: CecFormula) -> Self {
        CecFormula::Cognitive {
            op,
            agent,
            body: Arc::new(body),
        }
    }

    /// Event atom with this predicate, if any
    pub fn as_event(&self, wanted: EventPredicate) -> Option<&[Term]> {
        match self {
            CecFormula::Event { predicate, args } if *predicate == wanted => Some(args),
            _ => None,
        }
    }

    pub fn as_cognitive(&self) -> Option<(CognitiveOp, &Term, &CecFormula)> {
        match self {
            CecFormula::Cognitive { op, agent, body } => Some((*op, agent, &**body)),
            _ => None,
        }
    }

    pub fn is_cognitive(&self) -> bool {
        self.any_node(&|f| matches!(f, CecFormula::Cognitive { .. }))
    }

    fn any_node(&self, pred: &dyn Fn(&CecFormula) -> bool) -> bool {
        pred(self) || self.children().into_iter().any(|c| c.any_node(pred))
    }

    /// Terms held directly by this node
    fn own_terms(&self) -> Vec<&Term> {
        match self {
            CecFormula::Event { args, .. } | CecFormula::Predicate { args, .. } => args.iter().collect(),
            CecFormula::Cognitive { agent, .. } => vec![agent],
            _ => Vec::new(),
        }
    }

    /// Same node with children and own terms mapped; binders are kept as is
    fn rebuild(&self, sub: &dyn Fn(&CecFormula) -> CecFormula, term: &dyn Fn(&Term) -> Term) -> CecFormula {
        match self {
            CecFormula::True | CecFormula::False => self.clone(),
            CecFormula::Event { predicate, args } => CecFormula::Event {
                predicate: *predicate,
                args: args.iter().map(term).collect(),
            },
            CecFormula::Predicate { name, args } => CecFormula::Predicate {
                name: name.clone(),
                args: args.iter().map(term).collect(),
            },
            CecFormula::Not(a) => CecFormula::not(sub(&**a)),
            CecFormula::And(a, b) => CecFormula::and(sub(&**a), sub(&**b)),
            CecFormula::Or(a, b) => CecFormula::or(sub(&**a), sub(&**b)),
            CecFormula::Implies(a, b) => CecFormula::implies(sub(&**a), sub(&**b)),
            CecFormula::Iff(a, b) => CecFormula::iff(sub(&**a), sub(&**b)),
            CecFormula::Quantified {
                kind,
                var,
                sort,
                body,
            } => CecFormula::Quantified {
                kind: *kind,
                var: var.clone(),
                sort: sort.clone(),
                body: Arc::new(sub(&**body)),
            },
            CecFormula::Cognitive { op, agent, body } => CecFormula::cognitive(*op, term(agent), sub(&**body)),
        }
    }

    fn requantify(
        kind: Quantifier,
        var: &str,
        sort: &Option<String>,
        body: &CecFormula,
        incoming: &[&Term],
        rebuild: impl FnOnce(&CecFormula) -> CecFormula,
    ) -> CecFormula {
        let (var, body) = if incoming.iter().any(|t| t.occurs(var)) {
            let mut taken = body.free_vars();
            for t in incoming {
                t.collect_vars(&mut taken);
            }
            taken.insert(var.to_string());
            let fresh = fresh_name(var, &taken);
            let renamed = body.substitute(var, &Term::Var(fresh.clone()));
            (fresh, rebuild(&renamed))
        } else {
            (var.to_string(), rebuild(body))
        };
        CecFormula::Quantified {
            kind,
            var,
            sort: sort.clone(),
            body: Arc::new(body),
        }
    }

    fn free_vars_into(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        for t in self.own_terms() {
            let mut vars = BTreeSet::new();
            t.collect_vars(&mut vars);
            out.extend(vars.into_iter().filter(|v| !bound.contains(v)));
        }
        if let CecFormula::Quantified { var, body, .. } = self {
            bound.push(var.clone());
            body.free_vars_into(bound, out);
            bound.pop();
            return;
        }
        for c in self.children() {
            c.free_vars_into(bound, out);
        }
    }

    fn higher_order_under(&self, bound: &mut Vec<String>) -> bool {
        fn term_uses(t: &Term, bound: &[String]) -> bool {
            match t {
                Term::Func { name, args } => bound.contains(name) || args.iter().any(|a| term_uses(a, bound)),
                _ => false,
            }
        }
        let here = {
            let view: &[String] = bound;
            matches!(self, CecFormula::Predicate { name, .. } if view.contains(name))
                || self.own_terms().into_iter().any(|t| term_uses(t, view))
        };
        if here {
            return true;
        }
        if let CecFormula::Quantified { var, body, .. } = self {
            bound.push(var.clone());
            let found = body.higher_order_under(bound);
            bound.pop();
            return found;
        }
        self.children().into_iter().any(|c| c.higher_order_under(bound))
    }

    /// Alpha- and commutativity-normal representative
    pub fn canonical(&self) -> CecFormula {
        canon(self, &mut Vec::new())
    }
}

fn flatten<'a>(f: &'a CecFormula, chain: &CecFormula, out: &mut Vec<&'a CecFormula>) {
    match f {
        CecFormula::And(a, b) | CecFormula::Or(a, b) | CecFormula::Iff(a, b)
            if std::mem::discriminant(f) == std::mem::discriminant(chain) =>
        {
            flatten(a, chain, out);
            flatten(b, chain, out);
        }
        _ => out.push(f),
    }
}

fn canon(f: &CecFormula, renames: &mut Vec<(String, String)>) -> CecFormula {
    let chain: Option<fn(CecFormula, CecFormula) -> CecFormula> = match f {
        CecFormula::And(..) => Some(CecFormula::and),
        CecFormula::Or(..) => Some(CecFormula::or),
        CecFormula::Iff(..) => Some(CecFormula::iff),
        _ => None,
    };
    if let Some(build) = chain {
        let mut operands = Vec::new();
        flatten(f, f, &mut operands);
        let mut normalized: Vec<CecFormula> = operands.into_iter().map(|o| canon(o, renames)).collect();
        normalized.sort();
        let mut iter = normalized.into_iter().rev();
        return match iter.next() {
            Some(last) => iter.fold(last, |acc, next| build(next, acc)),
            None => f.clone(),
        };
    }
    match f {
        CecFormula::Quantified {
            kind,
            var,
            sort,
            body,
        } => {
            let name = binder_name(renames.len());
            renames.push((var.clone(), name.clone()));
            let body = canon(body, renames);
            renames.pop();
            CecFormula::Quantified {
                kind: *kind,
                var: name,
                sort: sort.clone(),
                body: Arc::new(body),
            }
        }
        _ => {
            let snapshot = renames.clone();
            f.rebuild(&|c| canon(c, &mut snapshot.clone()), &|t| rename_term(t, &snapshot))
        }
    }
}

impl ProofFormula for CecFormula {
    fn verum() -> Self {
        CecFormula::True
    }

    fn falsum() -> Self {
        CecFormula::False
    }

    fn negation(inner: Self) -> Self {
        CecFormula::not(inner)
    }

    fn conjunction(left: Self, right: Self) -> Self {
        CecFormula::and(left, right)
    }

    fn disjunction(left: Self, right: Self) -> Self {
        CecFormula::or(left, right)
    }

    fn implication(left: Self, right: Self) -> Self {
        CecFormula::implies(left, right)
    }

    fn biconditional(left: Self, right: Self) -> Self {
        CecFormula::iff(left, right)
    }

    fn quantified(kind: Quantifier, var: String, sort: Option<String>, body: Self) -> Self {
        CecFormula::Quantified {
            kind,
            var,
            sort,
            body: Arc::new(body),
        }
    }

    fn is_verum(&self) -> bool {
        matches!(self, CecFormula::True)
    }

    fn is_falsum(&self) -> bool {
        matches!(self, CecFormula::False)
    }

    fn as_not(&self) -> Option<&Self> {
        match self {
            CecFormula::Not(a) => Some(&**a),
            _ => None,
        }
    }

    fn as_and(&self) -> Option<(&Self, &Self)> {
        match self {
            CecFormula::And(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_or(&self) -> Option<(&Self, &Self)> {
        match self {
            CecFormula::Or(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_implies(&self) -> Option<(&Self, &Self)> {
        match self {
            CecFormula::Implies(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_iff(&self) -> Option<(&Self, &Self)> {
        match self {
            CecFormula::Iff(a, b) => Some((&**a, &**b)),
            _ => None,
        }
    }

    fn as_quantified(&self) -> Option<(Quantifier, &str, Option<&str>, &Self)> {
        match self {
            CecFormula::Quantified {
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
            CecFormula::True | CecFormula::False | CecFormula::Event { .. } | CecFormula::Predicate { .. } => {
                Vec::new()
            }
            CecFormula::Not(a) => vec![&**a],
            CecFormula::And(a, b) | CecFormula::Or(a, b) | CecFormula::Implies(a, b) | CecFormula::Iff(a, b) => {
                vec![&**a, &**b]
            }
            CecFormula::Quantified { body, .. } | CecFormula::Cognitive { body, .. } => vec![&**body],
        }
    }

    fn substitute(&self, var: &str, term: &Term) -> Self {
        match self {
            CecFormula::Quantified {
                kind,
                var: bound,
                sort,
                body,
            } => {
                if bound == var || !body.free_vars().contains(var) {
                    return self.clone();
                }
                Self::requantify(*kind, bound, sort, body, &[term], |b| b.substitute(var, term))
            }
            _ => self.rebuild(&|c| c.substitute(var, term), &|t| t.replace_var(var, term)),
        }
    }

    fn apply_subst(&self, subst: &Substitution) -> Self {
        if subst.is_empty() {
            return self.clone();
        }
        match self {
            CecFormula::Quantified {
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
                Self::requantify(*kind, var, sort, body, &incoming, |b| b.apply_subst(&inner))
            }
            _ => self.rebuild(&|c| c.apply_subst(subst), &|t| t.apply(subst)),
        }
    }

    fn unify_with(&self, other: &Self, subst: &mut Substitution, flexible: &Flexible<'_>) -> bool {
        match (self, other) {
            (CecFormula::True, CecFormula::True) | (CecFormula::False, CecFormula::False) => true,
            (
                CecFormula::Event {
                    predicate: p,
                    args: xs,
                },
                CecFormula::Event {
                    predicate: q,
                    args: ys,
                },
            ) => p == q && unify_term_lists(xs, ys, subst, flexible),
            (CecFormula::Predicate { name: p, args: xs }, CecFormula::Predicate { name: q, args: ys }) => {
                p == q && unify_term_lists(xs, ys, subst, flexible)
            }
            (CecFormula::Not(a), CecFormula::Not(b)) => a.unify_with(b, subst, flexible),
            (CecFormula::And(a1, b1), CecFormula::And(a2, b2))
            | (CecFormula::Or(a1, b1), CecFormula::Or(a2, b2))
            | (CecFormula::Implies(a1, b1), CecFormula::Implies(a2, b2))
            | (CecFormula::Iff(a1, b1), CecFormula::Iff(a2, b2)) => {
                a1.unify_with(a2, subst, flexible) && b1.unify_with(b2, subst, flexible)
            }
            (
                CecFormula::Quantified {
                    kind: k1,
                    var: v1,
                    sort: s1,
                    body: b1,
                },
                CecFormula::Quantified {
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
            (
                CecFormula::Cognitive {
                    op: o1,
                    agent: a1,
                    body: b1,
                },
                CecFormula::Cognitive {
                    op: o2,
                    agent: a2,
                    body: b2,
                },
            ) => o1 == o2 && unify_terms(a1, a2, subst, flexible) && b1.unify_with(b2, subst, flexible),
            _ => false,
        }
    }

    fn size(&self) -> usize {
        1 + self.own_terms().iter().map(|t| t.size()).sum::<usize>()
            + self.children().into_iter().map(|c| c.size()).sum::<usize>()
    }

    fn depth(&self) -> usize {
        1 + self.children().into_iter().map(|c| c.depth()).max().unwrap_or(0)
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
        self.own_terms().into_iter().for_each(|t| add(t, out));
        self.children().into_iter().for_each(|c| c.collect_terms(out));
    }

    fn collect_timepoints(&self, out: &mut IndexSet<Term>) {
        if let CecFormula::Event { predicate, args } = self {
            for &i in predicate.time_positions() {
                if let Some(t) = args.get(i).filter(|t| t.is_ground()) {
                    out.insert(t.clone());
                }
            }
        }
        self.children().into_iter().for_each(|c| c.collect_timepoints(out));
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        if let CecFormula::Predicate { name, .. } = self {
            out.insert(name.clone());
        }
        self.own_terms().into_iter().for_each(|t| t.collect_symbols(out));
        self.children().into_iter().for_each(|c| c.collect_symbols(out));
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
        Fingerprint::of_canonical(CEC_DOMAIN, &self.canonical().to_string())
    }
}

fn write_binary(
    l: &CecFormula,
    op: &str,
    r: &CecFormula,
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

fn write_formula(formula: &CecFormula, f: &mut fmt::Formatter<'_>, bound: &mut Vec<String>, operand: bool) -> fmt::Result {
    match formula {
        CecFormula::True => write!(f, "⊤"),
        CecFormula::False => write!(f, "⊥"),
        CecFormula::Event { predicate, args } => {
            write!(f, "{}", predicate.name())?;
            write_term_list(args, f, bound)
        }
        CecFormula::Predicate { name, args } => {
            write_predicate_name(name, EVENT_PREDICATE_NAMES, f)?;
            if !args.is_empty() {
                write_term_list(args, f, bound)?;
            }
            Ok(())
        }
        CecFormula::Not(a) => {
            write!(f, "¬")?;
            write_formula(a, f, bound, true)
        }
        CecFormula::And(a, b) => write_binary(a, "∧", b, f, bound, operand),
        CecFormula::Or(a, b) => write_binary(a, "∨", b, f, bound, operand),
        CecFormula::Implies(a, b) => write_binary(a, "→", b, f, bound, operand),
        CecFormula::Iff(a, b) => write_binary(a, "↔", b, f, bound, operand),
        CecFormula::Quantified {
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
        CecFormula::Cognitive { op, agent, body } => {
            write!(f, "{}[{}](", op.short(), agent.scoped(bound))?;
            write_formula(body, f, bound, false)?;
            write!(f, ")")
        }
    }
}

impl fmt::Display for CecFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_formula(self, f, &mut Vec::new(), false)
    }
}
