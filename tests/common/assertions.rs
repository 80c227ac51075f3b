// SPDX-License-Identifier: PMPL-1.0-or-later

//! Custom assertions for TDFOL tests

use tdfol::formula::ProofFormula;
use tdfol::{Formula, ProofResult, ProofStatus, RuleRegistry};

/// Assert that two formulas are equal up to bound-variable renaming
pub fn assert_alpha_equivalent(left: &Formula, right: &Formula) {
    assert!(
        left.alpha_eq(right),
        "Formulas are not alpha-equivalent:\nLeft:  {}\nRight: {}",
        left,
        right
    );
}

/// Assert a native proof whose certificate replays against `axioms`
pub fn assert_proved_with_certificate(result: &ProofResult, axioms: &[Formula]) {
    assert_eq!(
        result.status,
        ProofStatus::Proved,
        "expected a proof, got {} ({:?})",
        result.status,
        result.message
    );
    let cert = result
        .certificate
        .as_ref()
        .unwrap_or_else(|| panic!("proof by {} has no certificate", result.prover));
    if let Err(e) = cert.verify(axioms, &RuleRegistry::tdfol()) {
        panic!("certificate does not replay: {}\n{:#?}", e, cert.steps);
    }
}

/// Assert the attempts were made by exactly these provers, in order
pub fn assert_attempts(result: &ProofResult, expected: &[(&str, ProofStatus)]) {
    let actual: Vec<(&str, ProofStatus)> = result
        .attempts
        .iter()
        .map(|a| (a.prover.as_str(), a.status))
        .collect();
    pretty_assertions::assert_eq!(actual, expected.to_vec());
}
