// SPDX-License-Identifier: PMPL-1.0-or-later

//! Inference rule engine
//!
//! Every rule is an independent value implementing [`InferenceRule`]. The
//! [`RuleRegistry`] groups rules by category through index tables and fixes
//! the order in which the search tries them: size-reducing rules first, then
//! declaration order.
//!
//! Rules that can grow formulas only fire when the conclusion is relevant,
//! i.e. a subformula of the goal or of an axiom (see [`RuleContext`]). That
//! keeps forward chaining finite.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::formula::{Formula, ProofFormula, Term};

pub mod basic;
pub mod combined;
pub mod deontic;
pub mod state;
pub mod temporal;

pub use state::{AppliedRule, ProofState};

/// Rule family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleCategory {
    Basic,
    Temporal,
    Deontic,
    Combined,
    Cognitive,
    EventCalculus,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleCategory::Basic => "basic",
            RuleCategory::Temporal => "temporal",
            RuleCategory::Deontic => "deontic",
            RuleCategory::Combined => "combined",
            RuleCategory::Cognitive => "cognitive",
            RuleCategory::EventCalculus => "event-calculus",
        };
        write!(f, "{}", s)
    }
}

/// What a rule may draw on besides its premises
#[derive(Debug, Clone)]
pub struct RuleContext<F> {
    relevant: IndexSet<F>,
    terms: IndexSet<Term>,
    timepoints: IndexSet<Term>,
}

impl<F: ProofFormula> Default for RuleContext<F> {
    fn default() -> Self {
        RuleContext {
            relevant: IndexSet::new(),
            terms: IndexSet::new(),
            timepoints: IndexSet::new(),
        }
    }
}

impl<F: ProofFormula> RuleContext<F> {
    /// Context for a search: subformulas of the goal, its negation and the axioms
    pub fn for_problem(goal: &F, axioms: &[F]) -> Self {
        let mut ctx = Self::default();
        ctx.add_source(goal);
        ctx.add_source(&goal.negate());
        for axiom in axioms {
            ctx.add_source(axiom);
        }
        ctx.relevant.insert(F::falsum());
        ctx
    }

    /// Context for replaying one step: the conclusion is the only relevant target
    pub fn for_check(premises: &[&F], conclusion: &F) -> Self {
        let mut ctx = Self::default();
        ctx.add_source(conclusion);
        for p in premises {
            p.collect_terms(&mut ctx.terms);
            p.collect_timepoints(&mut ctx.timepoints);
        }
        ctx
    }

    /// Register a formula whose subformulas become relevant
    pub fn add_source(&mut self, formula: &F) {
        for sub in formula.subformulas() {
            self.relevant.insert(sub);
        }
        formula.collect_terms(&mut self.terms);
        formula.collect_timepoints(&mut self.timepoints);
    }

    pub fn add_term(&mut self, term: Term) {
        self.terms.insert(term);
    }

    pub fn is_relevant(&self, formula: &F) -> bool {
        self.relevant.contains(formula)
    }

    pub fn relevant(&self) -> impl Iterator<Item = &F> {
        self.relevant.iter()
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn timepoints(&self) -> impl Iterator<Item = &Term> {
        self.timepoints.iter()
    }

    /// Integer timepoints in ascending order
    pub fn numeric_timepoints(&self) -> Vec<i64> {
        let mut points: Vec<i64> = self.timepoints.iter().filter_map(Term::as_num).collect();
        points.sort_unstable();
        points.dedup();
        points
    }
}

/// A single inference rule
pub trait InferenceRule<F: ProofFormula>: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    fn description(&self) -> &'static str;

    /// Number of premises
    fn arity(&self) -> usize;

    /// False for rules whose conclusions may be larger than their premises
    fn size_reducing(&self) -> bool {
        true
    }

    /// All conclusions for these premises, in premise order
    fn apply(&self, premises: &[&F], ctx: &RuleContext<F>) -> Vec<F>;

    /// Re-check a recorded step independently of any search context
    fn check(&self, premises: &[&F], conclusion: &F) -> bool {
        if premises.len() != self.arity() {
            return false;
        }
        let ctx = RuleContext::for_check(premises, conclusion);
        self.apply(premises, &ctx).iter().any(|c| c == conclusion)
    }

    /// True when some premise tuple drawn from the state yields a new fact
    fn applicable(&self, state: &ProofState<F>, ctx: &RuleContext<F>) -> bool {
        !derive(self, &state.facts, 0, ctx).is_empty()
    }

    /// Successor state with every new conclusion added, or `None`
    fn apply_to_state(&self, state: &ProofState<F>, ctx: &RuleContext<F>) -> Option<ProofState<F>> {
        let derived = derive(self, &state.facts, 0, ctx);
        if derived.is_empty() {
            return None;
        }
        let mut next = state.clone();
        next.depth += 1;
        for (premises, conclusion) in derived {
            next.record(self.name(), premises, conclusion);
        }
        Some(next)
    }
}

/// Premise tuples over `facts` with at least one premise at index `new_from` or later
///
/// Returns new conclusions only (not already in `facts`), filtered through the
/// relevance gate for rules that are not size-reducing.
pub fn derive<F, R>(rule: &R, facts: &IndexSet<F>, new_from: usize, ctx: &RuleContext<F>) -> Vec<(Vec<F>, F)>
where
    F: ProofFormula,
    R: InferenceRule<F> + ?Sized,
{
    let arity = rule.arity();
    let n = facts.len();
    let mut out: Vec<(Vec<F>, F)> = Vec::new();
    let mut seen: IndexSet<F> = IndexSet::new();

    let mut emit = |premises: &[&F], out: &mut Vec<(Vec<F>, F)>| {
        for c in rule.apply(premises, ctx) {
            if facts.contains(&c) || seen.contains(&c) {
                continue;
            }
            if !rule.size_reducing() && !ctx.is_relevant(&c) {
                continue;
            }
            seen.insert(c.clone());
            out.push((premises.iter().map(|p| (*p).clone()).collect(), c));
        }
    };

    if arity == 0 {
        if new_from == 0 {
            emit(&[], &mut out);
        }
        return out;
    }

    let mut indices = vec![0usize; arity];
    loop {
        if indices.iter().any(|&i| i >= new_from) {
            let premises: Vec<&F> = indices.iter().filter_map(|&i| facts.get_index(i)).collect();
            if premises.len() == arity {
                emit(&premises, &mut out);
            }
        }
        // odometer increment
        let mut pos = arity;
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            indices[pos] += 1;
            if indices[pos] < n {
                break;
            }
            indices[pos] = 0;
        }
        if n == 0 {
            return out;
        }
    }
}

type ApplyFn<F> = fn(&[&F], &RuleContext<F>) -> Vec<F>;

/// A rule defined by a plain function
pub struct FnRule<F> {
    pub name: &'static str,
    pub category: RuleCategory,
    pub description: &'static str,
    pub arity: usize,
    pub size_reducing: bool,
    pub apply: ApplyFn<F>,
}

impl<F> FnRule<F> {
    pub fn new(
        name: &'static str,
        category: RuleCategory,
        description: &'static str,
        arity: usize,
        size_reducing: bool,
        apply: ApplyFn<F>,
    ) -> Self {
        FnRule {
            name,
            category,
            description,
            arity,
            size_reducing,
            apply,
        }
    }
}

impl<F: ProofFormula> InferenceRule<F> for FnRule<F> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> RuleCategory {
        self.category
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn size_reducing(&self) -> bool {
        self.size_reducing
    }

    fn apply(&self, premises: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
        if premises.len() != self.arity {
            return Vec::new();
        }
        (self.apply)(premises, ctx)
    }
}

/// Rules indexed by name and category
pub struct RuleRegistry<F: ProofFormula> {
    rules: Vec<Arc<dyn InferenceRule<F>>>,
    by_name: HashMap<&'static str, usize>,
    by_category: HashMap<RuleCategory, Vec<usize>>,
}

impl<F: ProofFormula> Default for RuleRegistry<F> {
    fn default() -> Self {
        RuleRegistry {
            rules: Vec::new(),
            by_name: HashMap::new(),
            by_category: HashMap::new(),
        }
    }
}

impl<F: ProofFormula> RuleRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the logic-agnostic rules only
    pub fn with_basic_rules() -> Self {
        let mut registry = Self::new();
        registry.extend(basic::rules::<F>());
        registry
    }

    /// Add a rule; a rule with the same name replaces the earlier one
    pub fn register(&mut self, rule: Arc<dyn InferenceRule<F>>) {
        if let Some(&idx) = self.by_name.get(rule.name()) {
            let old_category = self.rules[idx].category();
            if let Some(list) = self.by_category.get_mut(&old_category) {
                list.retain(|&i| i != idx);
            }
            self.by_category.entry(rule.category()).or_default().push(idx);
            self.rules[idx] = rule;
            return;
        }
        let idx = self.rules.len();
        self.by_name.insert(rule.name(), idx);
        self.by_category.entry(rule.category()).or_default().push(idx);
        self.rules.push(rule);
    }

    pub fn extend<R>(&mut self, rules: impl IntoIterator<Item = R>)
    where
        R: InferenceRule<F> + 'static,
    {
        for rule in rules {
            self.register(Arc::new(rule));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn InferenceRule<F>>> {
        self.by_name.get(name).map(|&i| &self.rules[i])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in declaration order
    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn InferenceRule<F>>> {
        self.rules.iter()
    }

    pub fn in_category(&self, category: RuleCategory) -> Vec<&Arc<dyn InferenceRule<F>>> {
        self.by_category
            .get(&category)
            .map(|idx| idx.iter().map(|&i| &self.rules[i]).collect())
            .unwrap_or_default()
    }

    /// Search order: size-reducing rules first, then declaration order
    pub fn search_order(&self) -> Vec<&Arc<dyn InferenceRule<F>>> {
        let mut ordered: Vec<&Arc<dyn InferenceRule<F>>> = self.rules.iter().collect();
        ordered.sort_by_key(|r| !r.size_reducing());
        ordered
    }

    /// Zero-premise rules, used for trivial closure
    pub fn tautology_rules(&self) -> impl Iterator<Item = &Arc<dyn InferenceRule<F>>> {
        self.rules.iter().filter(|r| r.arity() == 0)
    }

    /// Name of a zero-premise rule that proves `formula` outright
    pub fn tautology_for(&self, formula: &F) -> Option<&'static str> {
        self.tautology_rules()
            .find(|r| r.check(&[], formula))
            .map(|r| r.name())
    }
}

impl RuleRegistry<Formula> {
    /// Every TDFOL rule: basic, temporal, deontic and combined
    pub fn tdfol() -> Self {
        let mut registry = Self::with_basic_rules();
        registry.extend(temporal::rules());
        registry.extend(deontic::rules());
        registry.extend(combined::rules());
        registry
    }
}

impl<F: ProofFormula> fmt::Debug for RuleRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

// Shared helpers for rule bodies

/// Numeric value of a timepoint
pub(crate) fn num(t: &Term) -> Option<i64> {
    t.as_num()
}

/// `a ≤ b` for timepoints: numerically, or by identity
pub(crate) fn time_le(a: &Term, b: &Term) -> bool {
    match (a.as_num(), b.as_num()) {
        (Some(x), Some(y)) => x <= y,
        _ => a == b,
    }
}

/// Closed numeric windows `[a, b]` and `[c, d]` share at least one point
pub(crate) fn windows_overlap(a: &Term, b: &Term, c: &Term, d: &Term) -> bool {
    match (num(a), num(b), num(c), num(d)) {
        (Some(a), Some(b), Some(c), Some(d)) => a.max(c) <= b.min(d),
        _ => a == c && b == d,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn f(s: &str) -> Formula {
        parse(s).unwrap()
    }

    #[test]
    fn test_registry_indices() {
        let registry = RuleRegistry::tdfol();
        assert!(registry.len() >= 40);
        assert!(registry.get("modus_ponens").is_some());
        assert!(!registry.in_category(RuleCategory::Temporal).is_empty());
        assert!(!registry.in_category(RuleCategory::Deontic).is_empty());
        assert!(!registry.in_category(RuleCategory::Combined).is_empty());
        let order = registry.search_order();
        let first_gated = order.iter().position(|r| !r.size_reducing()).unwrap();
        assert!(order[first_gated..].iter().all(|r| !r.size_reducing()));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = RuleRegistry::<Formula>::with_basic_rules();
        let before = registry.len();
        registry.extend(basic::rules::<Formula>().into_iter().take(1));
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_apply_to_state_adds_conclusions() {
        let registry = RuleRegistry::tdfol();
        let mp = registry.get("modus_ponens").unwrap();
        let state = ProofState::from_facts(vec![f("p"), f("p → q")]);
        let ctx = RuleContext::for_problem(&f("q"), &[f("p"), f("p → q")]);
        assert!(mp.applicable(&state, &ctx));
        let next = mp.apply_to_state(&state, &ctx).unwrap();
        assert!(next.facts.contains(&f("q")));
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.depth, 1);
        assert!(mp.apply_to_state(&next, &ctx).is_none());
    }

    #[test]
    fn test_relevance_gate_blocks_unrelated_growth() {
        let registry = RuleRegistry::tdfol();
        let intro = registry.get("conjunction_intro").unwrap();
        let facts: IndexSet<Formula> = [f("p"), f("q")].into_iter().collect();
        let unrelated = RuleContext::for_problem(&f("r"), &[f("p"), f("q")]);
        assert!(derive(&**intro, &facts, 0, &unrelated).is_empty());
        let related = RuleContext::for_problem(&f("p ∧ q"), &[f("p"), f("q")]);
        let derived = derive(&**intro, &facts, 0, &related);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].1, f("p ∧ q"));
    }

    #[test]
    fn test_semi_naive_skips_old_tuples() {
        let registry = RuleRegistry::tdfol();
        let mp = registry.get("modus_ponens").unwrap();
        let facts: IndexSet<Formula> = [f("p"), f("p → q"), f("r")].into_iter().collect();
        let ctx = RuleContext::for_problem(&f("q"), &[]);
        assert!(derive(&**mp, &facts, 2, &ctx).is_empty());
        assert_eq!(derive(&**mp, &facts, 1, &ctx).len(), 1);
    }
}
