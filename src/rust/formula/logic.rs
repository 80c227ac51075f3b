// SPDX-License-Identifier: PMPL-1.0-or-later

//! The logic-agnostic view of a formula
//!
//! Generic inference rules, the search orchestrator and certificates are
//! written once against [`ProofFormula`]. Both the TDFOL [`super::Formula`]
//! and the CEC formula implement it.

use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;

use super::normalize::Fingerprint;
use super::term::{Substitution, Term};

/// Quantifier kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quantifier {
    Forall,
    Exists,
}

impl Quantifier {
    pub fn symbol(&self) -> &'static str {
        match self {
            Quantifier::Forall => "∀",
            Quantifier::Exists => "∃",
        }
    }
}

/// Flexibility predicate passed to unification
pub type Flexible<'a> = dyn Fn(&str) -> bool + 'a;

pub trait ProofFormula:
    Clone
    + Eq
    + Hash
    + Ord
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    fn verum() -> Self;
    fn falsum() -> Self;
    fn negation(inner: Self) -> Self;
    fn conjunction(left: Self, right: Self) -> Self;
    fn disjunction(left: Self, right: Self) -> Self;
    fn implication(left: Self, right: Self) -> Self;
    fn biconditional(left: Self, right: Self) -> Self;
    fn quantified(kind: Quantifier, var: String, sort: Option<String>, body: Self) -> Self;

    fn is_verum(&self) -> bool;
    fn is_falsum(&self) -> bool;
    fn as_not(&self) -> Option<&Self>;
    fn as_and(&self) -> Option<(&Self, &Self)>;
    fn as_or(&self) -> Option<(&Self, &Self)>;
    fn as_implies(&self) -> Option<(&Self, &Self)>;
    fn as_iff(&self) -> Option<(&Self, &Self)>;
    fn as_quantified(&self) -> Option<(Quantifier, &str, Option<&str>, &Self)>;

    /// Immediate subformulas
    fn children(&self) -> Vec<&Self>;

    /// Capture-avoiding replacement of the free occurrences of `var`
    fn substitute(&self, var: &str, term: &Term) -> Self;

    /// Capture-avoiding simultaneous substitution of free variables
    fn apply_subst(&self, subst: &Substitution) -> Self;

    /// Structural unification; only `flexible` variables may be bound
    fn unify_with(&self, other: &Self, subst: &mut Substitution, flexible: &Flexible<'_>) -> bool;

    /// Node count, terms included
    fn size(&self) -> usize;

    /// Nesting depth of connectives and operators
    fn depth(&self) -> usize;

    /// Ground terms occurring in atoms, subterms included
    fn collect_terms(&self, out: &mut IndexSet<Term>);

    /// Timepoints mentioned by temporal operators or event atoms
    fn collect_timepoints(&self, _out: &mut IndexSet<Term>) {}

    /// Constant and function symbols, used to pick fresh eigen-constants
    fn collect_symbols(&self, out: &mut BTreeSet<String>);

    fn free_vars(&self) -> BTreeSet<String>;

    /// A bound variable used as a predicate or function symbol
    fn is_higher_order(&self) -> bool;

    /// Alpha- and commutativity-invariant content hash
    fn fingerprint(&self) -> Fingerprint;

    fn negate(&self) -> Self {
        Self::negation(self.clone())
    }

    /// This formula and all of its subformulas, parents first
    fn subformulas(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            out.push(f.clone());
            let children = f.children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Strip a prefix of universal quantifiers
    fn strip_foralls(&self) -> (Vec<String>, &Self) {
        let mut vars = Vec::new();
        let mut current = self;
        while let Some((Quantifier::Forall, var, _, body)) = current.as_quantified() {
            vars.push(var.to_string());
            current = body;
        }
        (vars, current)
    }

    /// Equality up to bound-variable renaming and commutative reordering
    fn alpha_eq(&self, other: &Self) -> bool {
        self == other || self.fingerprint() == other.fingerprint()
    }
}
