// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cognitive Event Calculus
//!
//! A second logic on the same machinery: [`CecFormula`] implements
//! [`ProofFormula`](crate::formula::ProofFormula), [`CecDialect`] plugs into
//! the shared grammar and [`RuleRegistry::cec`] extends the basic rules with
//! mental-state and event-calculus rules. Proofs come from the generic
//! [`NativeProver`] and their certificates replay against the CEC registry.

use std::sync::Arc;

use crate::prover::{NativeProver, ProverBudget};
use crate::rules::RuleRegistry;

pub mod formula;
pub mod parser;
pub mod rules;

pub use formula::{CecFormula, CognitiveOp, EventPredicate};
pub use parser::{parse_cec, CecDialect, CecParser};

impl NativeProver<CecFormula> {
    /// Prover over the CEC rule set
    pub fn cec(budget: ProverBudget) -> Self {
        NativeProver::new(Arc::new(RuleRegistry::cec()), budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prover::ProofStatus;
    use pretty_assertions::assert_eq;

    fn prove(goal: &str, axioms: &[&str]) -> (crate::prover::ProofResult<CecFormula>, Vec<CecFormula>) {
        let axioms: Vec<CecFormula> = axioms.iter().map(|a| parse_cec(a).unwrap()).collect();
        let prover = NativeProver::cec(ProverBudget::default());
        (prover.prove(&parse_cec(goal).unwrap(), &axioms), axioms)
    }

    #[test]
    fn test_fluent_persists_by_inertia() {
        let (result, axioms) = prove(
            "HoldsAt(DoorOpen, 6)",
            &[
                "Happens(Open, 3)",
                "Initiates(Open, DoorOpen, 3)",
                "¬Clipped(4, DoorOpen, 6)",
            ],
        );
        assert_eq!(result.status, ProofStatus::Proved);
        let cert = result.certificate.unwrap();
        assert_eq!(cert.rules_used(), vec!["ec_initiation", "ec_inertia"]);
        cert.verify(&axioms, &RuleRegistry::cec()).unwrap();
    }

    #[test]
    fn test_perception_grounds_action() {
        let (result, axioms) = prove(
            "Prepared(Alice)",
            &["S[Alice](Raining)", "K[Alice](Raining) → Prepared(Alice)"],
        );
        assert_eq!(result.status, ProofStatus::Proved);
        result
            .certificate
            .unwrap()
            .verify(&axioms, &RuleRegistry::cec())
            .unwrap();
    }

    #[test]
    fn test_termination_disproves() {
        let (result, _) = prove(
            "HoldsAt(Lit, 8)",
            &["Happens(Blow, 7)", "Terminates(Blow, Lit, 7)"],
        );
        assert_eq!(result.status, ProofStatus::Disproved);
    }

    #[test]
    fn test_unrelated_goal_is_unknown() {
        let (result, _) = prove("K[Bob](Raining)", &["S[Alice](Raining)"]);
        assert_eq!(result.status, ProofStatus::Unknown);
    }
}
