// SPDX-License-Identifier: PMPL-1.0-or-later

//! Proof state threaded through rule application

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::formula::ProofFormula;

/// One rule firing recorded in a proof state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: serde::de::DeserializeOwned"))]
pub struct AppliedRule<F> {
    pub rule: String,
    pub premises: Vec<F>,
    pub conclusion: F,
}

/// Known facts plus the history that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofState<F: ProofFormula> {
    pub facts: IndexSet<F>,
    pub history: Vec<AppliedRule<F>>,
    pub depth: usize,
    /// Open assumptions, innermost last
    pub assumptions: Vec<F>,
}

impl<F: ProofFormula> Default for ProofState<F> {
    fn default() -> Self {
        ProofState {
            facts: IndexSet::new(),
            history: Vec::new(),
            depth: 0,
            assumptions: Vec::new(),
        }
    }
}

impl<F: ProofFormula> ProofState<F> {
    pub fn from_facts(facts: impl IntoIterator<Item = F>) -> Self {
        ProofState {
            facts: facts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn knows(&self, formula: &F) -> bool {
        self.facts.contains(formula)
    }

    /// Add an assumption as a fact; returns false when it was already known
    pub fn assume(&mut self, formula: F) -> bool {
        self.assumptions.push(formula.clone());
        self.facts.insert(formula)
    }

    /// Add a derived fact and record the step; known facts are not re-recorded
    pub fn record(&mut self, rule: &str, premises: Vec<F>, conclusion: F) -> bool {
        if self.facts.contains(&conclusion) {
            return false;
        }
        self.facts.insert(conclusion.clone());
        self.history.push(AppliedRule {
            rule: rule.to_string(),
            premises,
            conclusion,
        });
        true
    }

    pub fn is_closed(&self) -> bool {
        self.facts.iter().any(ProofFormula::is_falsum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;

    #[test]
    fn test_record_skips_known_facts() {
        let mut state = ProofState::from_facts(vec![Formula::atom("p")]);
        assert!(!state.record("identity", vec![], Formula::atom("p")));
        assert!(state.record("modus_ponens", vec![], Formula::atom("q")));
        assert_eq!(state.history.len(), 1);
        assert!(state.knows(&Formula::atom("q")));
    }

    #[test]
    fn test_closed_on_falsum() {
        let mut state = ProofState::<Formula>::default();
        assert!(!state.is_closed());
        state.assume(Formula::False);
        assert!(state.is_closed());
        assert_eq!(state.assumptions.len(), 1);
    }
}
