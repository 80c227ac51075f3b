// SPDX-License-Identifier: PMPL-1.0-or-later

//! Property-based tests for TDFOL invariants

mod common;

use common::generators::{formula, ground_term, propositional};
use proptest::prelude::*;
use tdfol::formula::{context_fingerprint, ProofFormula};
use tdfol::{parse, Formula, NativeProver, ProofStatus, ProverBudget, RuleRegistry, Term, TokenBucket};

fn rename_binders(f: &Formula, suffix: &str) -> Formula {
    match f {
        Formula::Quantified { kind, var, sort, body } => {
            let fresh = format!("{}{}", var, suffix);
            let renamed = body.substitute(var, &Term::var(fresh.clone()));
            Formula::Quantified {
                kind: *kind,
                var: fresh,
                sort: sort.clone(),
                body: std::sync::Arc::new(rename_binders(&renamed, suffix)),
            }
        }
        Formula::Not(a) => Formula::not(rename_binders(a, suffix)),
        Formula::And(a, b) => Formula::and(rename_binders(a, suffix), rename_binders(b, suffix)),
        Formula::Or(a, b) => Formula::or(rename_binders(a, suffix), rename_binders(b, suffix)),
        Formula::Implies(a, b) => Formula::implies(rename_binders(a, suffix), rename_binders(b, suffix)),
        Formula::Iff(a, b) => Formula::iff(rename_binders(a, suffix), rename_binders(b, suffix)),
        Formula::Temporal { op, body } => Formula::temporal(op.clone(), rename_binders(body, suffix)),
        Formula::Deontic { op, agent, body } => Formula::deontic(*op, agent.clone(), rename_binders(body, suffix)),
        Formula::True | Formula::False | Formula::Predicate { .. } => f.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // Property: printing then parsing gives back the same tree
    #[test]
    fn printed_formulas_parse_back(f in formula()) {
        let printed = f.to_string();
        let reparsed = parse(&printed);
        prop_assert!(reparsed.is_ok(), "{} failed to parse: {:?}", printed, reparsed);
        prop_assert_eq!(reparsed.unwrap(), f);
    }

    // Property: fingerprints ignore binder names
    #[test]
    fn fingerprint_invariant_under_renaming(f in formula()) {
        let renamed = rename_binders(&f, "_r");
        prop_assert!(f.alpha_eq(&renamed));
        prop_assert_eq!(f.fingerprint(), renamed.fingerprint());
    }

    // Property: conjunction and disjunction operands commute under the fingerprint
    #[test]
    fn fingerprint_invariant_under_commutation(a in formula(), b in formula()) {
        prop_assert_eq!(Formula::and(a.clone(), b.clone()).fingerprint(), Formula::and(b.clone(), a.clone()).fingerprint());
        prop_assert_eq!(Formula::or(a.clone(), b.clone()).fingerprint(), Formula::or(b, a).fingerprint());
    }

    // Property: the axiom context is a set
    #[test]
    fn context_fingerprint_ignores_order(mut axioms in prop::collection::vec(formula(), 0..5)) {
        let forward = context_fingerprint(&axioms);
        axioms.reverse();
        prop_assert_eq!(forward, context_fingerprint(&axioms));
    }

    // Property: substitution never captures a free variable
    #[test]
    fn substitution_avoids_capture(t in ground_term()) {
        let f = parse("∀y. Likes(?x, y)").unwrap();
        let captured = f.substitute("x", &Term::var("y"));
        prop_assert!(captured.free_vars().contains("y"));
        let ground = f.substitute("x", &t);
        prop_assert!(ground.free_vars().is_empty());
    }

    // Property: an axiom is its own proof, with a certificate that replays
    #[test]
    fn axioms_prove_themselves(f in formula()) {
        let prover = NativeProver::tdfol(ProverBudget::default());
        let axioms = vec![f.clone()];
        let result = prover.prove(&f, &axioms);
        prop_assert_eq!(result.status, ProofStatus::Proved);
        let cert = result.certificate.unwrap();
        prop_assert!(cert.verify(&axioms, &RuleRegistry::tdfol()).is_ok());
    }

    // Property: φ → φ closes for every φ, even on a one-level budget
    #[test]
    fn identity_is_always_proved(f in propositional()) {
        let budget = ProverBudget { max_depth: 1, max_nodes: 1, ..ProverBudget::default() };
        let prover = NativeProver::tdfol(budget);
        let goal = Formula::implies(f.clone(), f);
        let result = prover.prove(&goal, &[]);
        prop_assert_eq!(result.status, ProofStatus::Proved);
        let cert = result.certificate.unwrap();
        prop_assert!(cert.verify(&[], &RuleRegistry::tdfol()).is_ok());
    }

    // Property: every Proved propositional result carries a replayable certificate
    #[test]
    fn proofs_replay(goal in propositional(), axioms in prop::collection::vec(propositional(), 1..4)) {
        let budget = ProverBudget { max_nodes: 2_000, timeout_ms: 2_000, ..ProverBudget::default() };
        let result = NativeProver::tdfol(budget).prove(&goal, &axioms);
        if result.status == ProofStatus::Proved {
            let cert = result.certificate.unwrap();
            prop_assert!(cert.verify(&axioms, &RuleRegistry::tdfol()).is_ok(), "{:#?}", cert.steps);
        }
    }

    // Property: a bucket never grants more than its capacity without refill
    #[test]
    fn bucket_never_exceeds_capacity(capacity in 1u32..20) {
        let bucket = TokenBucket::new(capacity, 1e-9);
        let granted = (0..capacity * 2).filter(|_| bucket.acquire().is_ok()).count();
        prop_assert_eq!(granted, capacity as usize);
    }
}
