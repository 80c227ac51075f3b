// SPDX-License-Identifier: PMPL-1.0-or-later

//! Native prover and proof results
//!
//! [`NativeProver`] drives the rule registry and produces [`ProofResult`]s
//! carrying replayable [`Certificate`]s. It is generic over the formula
//! language, so the TDFOL and CEC dialects share one search.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span};

use crate::error::{Result, TdfolError};
use crate::formula::{Formula, ProofFormula};
use crate::rules::RuleRegistry;

pub mod certificate;
mod search;

pub use crate::rules::{AppliedRule, ProofState};
pub use certificate::{Certificate, CertificateStep};

/// Name under which native results are reported
pub const NATIVE_PROVER: &str = "native";

/// Outcome of a proof attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofStatus {
    Proved,
    Disproved,
    Unknown,
    Timeout,
    /// The formula uses constructs this prover does not handle
    Unsupported,
    ProverUnavailable,
    RateLimited,
}

impl ProofStatus {
    /// `Proved` or `Disproved`
    pub fn is_conclusive(&self) -> bool {
        matches!(self, ProofStatus::Proved | ProofStatus::Disproved)
    }

    /// True when another prover may still settle the question
    pub fn should_escalate(&self) -> bool {
        matches!(
            self,
            ProofStatus::Unknown | ProofStatus::Timeout | ProofStatus::Unsupported
        )
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProofStatus::Proved => "proved",
            ProofStatus::Disproved => "disproved",
            ProofStatus::Unknown => "unknown",
            ProofStatus::Timeout => "timeout",
            ProofStatus::Unsupported => "unsupported",
            ProofStatus::ProverUnavailable => "prover-unavailable",
            ProofStatus::RateLimited => "rate-limited",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ProofStatus {
    type Err = TdfolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "proved" => Ok(ProofStatus::Proved),
            "disproved" => Ok(ProofStatus::Disproved),
            "unknown" => Ok(ProofStatus::Unknown),
            "timeout" => Ok(ProofStatus::Timeout),
            "unsupported" => Ok(ProofStatus::Unsupported),
            "prover-unavailable" => Ok(ProofStatus::ProverUnavailable),
            "rate-limited" => Ok(ProofStatus::RateLimited),
            _ => Err(TdfolError::config(format!("unknown proof status: {}", s))),
        }
    }
}

/// One prover consulted while answering a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverAttempt {
    pub prover: String,
    pub status: ProofStatus,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProverAttempt {
    pub fn new(prover: impl Into<String>, status: ProofStatus, elapsed_ms: u64) -> Self {
        ProverAttempt {
            prover: prover.into(),
            status,
            elapsed_ms,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Result of proving a goal from a set of axioms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: DeserializeOwned"))]
pub struct ProofResult<F = Formula> {
    pub status: ProofStatus,
    #[serde(default = "Option::default")]
    pub certificate: Option<Certificate<F>>,
    /// Prover that produced the status
    pub prover: String,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub attempts: Vec<ProverAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<F> ProofResult<F> {
    /// A result with no certificate and a single attempt
    pub fn bare(prover: impl Into<String>, status: ProofStatus, elapsed_ms: u64) -> Self {
        let prover = prover.into();
        ProofResult {
            status,
            certificate: None,
            attempts: vec![ProverAttempt::new(prover.clone(), status, elapsed_ms)],
            prover,
            elapsed_ms,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_proved(&self) -> bool {
        self.status == ProofStatus::Proved
    }

    pub fn is_conclusive(&self) -> bool {
        self.status.is_conclusive()
    }
}

/// Limits on a single native search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverBudget {
    /// Forward-chaining levels per phase
    pub max_depth: usize,
    /// Derived facts across the whole search
    pub max_nodes: usize,
    /// Wall-clock limit in milliseconds
    pub timeout_ms: u64,
    /// Derived formulas larger than this are discarded
    pub max_formula_size: usize,
}

impl Default for ProverBudget {
    fn default() -> Self {
        ProverBudget {
            max_depth: 12,
            max_nodes: 20_000,
            timeout_ms: 5_000,
            max_formula_size: 256,
        }
    }
}

impl ProverBudget {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(TdfolError::config("prover.max_depth must be at least 1"));
        }
        if self.max_nodes == 0 {
            return Err(TdfolError::config("prover.max_nodes must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(TdfolError::config("prover.timeout_ms must be positive"));
        }
        if self.max_formula_size == 0 {
            return Err(TdfolError::config("prover.max_formula_size must be at least 1"));
        }
        Ok(())
    }
}

/// Rule-based forward-chaining prover
pub struct NativeProver<F: ProofFormula = Formula> {
    registry: Arc<RuleRegistry<F>>,
    budget: ProverBudget,
}

impl<F: ProofFormula> Clone for NativeProver<F> {
    fn clone(&self) -> Self {
        NativeProver {
            registry: Arc::clone(&self.registry),
            budget: self.budget.clone(),
        }
    }
}

impl NativeProver<Formula> {
    /// Prover over the full TDFOL rule set
    pub fn tdfol(budget: ProverBudget) -> Self {
        NativeProver::new(Arc::new(RuleRegistry::tdfol()), budget)
    }
}

impl<F: ProofFormula> NativeProver<F> {
    pub fn new(registry: Arc<RuleRegistry<F>>, budget: ProverBudget) -> Self {
        NativeProver { registry, budget }
    }

    pub fn registry(&self) -> &Arc<RuleRegistry<F>> {
        &self.registry
    }

    pub fn budget(&self) -> &ProverBudget {
        &self.budget
    }

    pub fn prove(&self, goal: &F, axioms: &[F]) -> ProofResult<F> {
        self.prove_with_budget(goal, axioms, &self.budget)
    }

    pub fn prove_with_budget(&self, goal: &F, axioms: &[F], budget: &ProverBudget) -> ProofResult<F> {
        let span = info_span!("native_prove", goal = %goal, axioms = axioms.len());
        let _guard = span.enter();
        let start = Instant::now();

        if goal.is_higher_order() || axioms.iter().any(ProofFormula::is_higher_order) {
            debug!("higher-order input, declining");
            return ProofResult::bare(NATIVE_PROVER, ProofStatus::Unsupported, 0)
                .with_message("bound variable used as a predicate or function symbol");
        }

        let outcome = search::Search::new(&self.registry, budget).run(goal, axioms);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            status = %outcome.status,
            nodes = outcome.nodes,
            steps = outcome.certificate.as_ref().map(|c| c.len()).unwrap_or(0),
            elapsed_ms,
            "native search finished"
        );

        let attempt = ProverAttempt::new(NATIVE_PROVER, outcome.status, elapsed_ms)
            .with_reason(outcome.message.clone());
        ProofResult {
            status: outcome.status,
            certificate: outcome.certificate,
            prover: NATIVE_PROVER.to_string(),
            elapsed_ms,
            attempts: vec![attempt],
            message: Some(outcome.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn f(s: &str) -> Formula {
        parse(s).unwrap()
    }

    fn prover() -> NativeProver {
        NativeProver::tdfol(ProverBudget::default())
    }

    fn prove(goal: &str, axioms: &[&str]) -> (ProofResult, Vec<Formula>) {
        let axioms: Vec<Formula> = axioms.iter().map(|a| f(a)).collect();
        (prover().prove(&f(goal), &axioms), axioms)
    }

    fn assert_verified(result: &ProofResult, axioms: &[Formula]) {
        let cert = result.certificate.as_ref().expect("certificate");
        cert.verify(axioms, &RuleRegistry::tdfol()).unwrap();
    }

    #[test]
    fn test_socrates() {
        let (result, axioms) = prove(
            "Mortal(Socrates)",
            &["∀x. Human(x) → Mortal(x)", "Human(Socrates)"],
        );
        assert_eq!(result.status, ProofStatus::Proved);
        assert_eq!(result.prover, NATIVE_PROVER);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_trivial_closure_ignores_budget() {
        let budget = ProverBudget {
            max_depth: 1,
            max_nodes: 1,
            timeout_ms: 1,
            max_formula_size: 1,
        };
        let p = prover();
        let result = p.prove_with_budget(&f("p ∨ ¬p"), &[], &budget);
        assert_eq!(result.status, ProofStatus::Proved);
        let result = p.prove_with_budget(&f("⊤"), &[], &budget);
        assert_eq!(result.status, ProofStatus::Proved);
        let result = p.prove_with_budget(&f("q"), &[f("q")], &budget);
        assert_eq!(result.status, ProofStatus::Proved);
        assert!(result.certificate.unwrap().is_empty());
    }

    #[test]
    fn test_implication_goal_uses_assumption() {
        let (result, axioms) = prove("p → r", &["p → q", "q → r"]);
        assert_eq!(result.status, ProofStatus::Proved);
        let cert = result.certificate.as_ref().unwrap();
        assert_eq!(cert.steps.first().map(|s| s.rule.as_str()), Some("assume"));
        assert_eq!(cert.steps.last().map(|s| s.rule.as_str()), Some("implication_intro"));
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_universal_goal_uses_eigen_constant() {
        let (result, axioms) = prove("∀y. Mortal(y)", &["∀x. Human(x) → Mortal(x)", "∀x. Human(x)"]);
        assert_eq!(result.status, ProofStatus::Proved);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_reductio_via_modus_tollens() {
        let (result, axioms) = prove("¬p", &["p → q", "¬q"]);
        assert_eq!(result.status, ProofStatus::Proved);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_disproved_when_negation_follows() {
        let (result, axioms) = prove("q", &["p", "p → ¬q"]);
        assert_eq!(result.status, ProofStatus::Disproved);
        let cert = result.certificate.as_ref().unwrap();
        assert_eq!(cert.goal, f("¬q"));
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_unknown_when_not_entailed() {
        let (result, _) = prove("r", &["p", "p → q"]);
        assert_eq!(result.status, ProofStatus::Unknown);
        assert!(result.certificate.is_none());
    }

    #[test]
    fn test_deontic_conflict_proves_anything() {
        let (result, axioms) = prove("r", &["O[A](pay)", "F[A](pay)"]);
        assert_eq!(result.status, ProofStatus::Proved);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_temporal_goal() {
        let (result, axioms) = prove(
            "DURING[1, 10](Open(Door))",
            &["DURING[1, 10](Unlocked(Door))", "Unlocked(Door) → Open(Door)"],
        );
        assert_eq!(result.status, ProofStatus::Proved);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_windowed_obligation_to_permission() {
        let (result, axioms) = prove("DURING[3, 5](P[A](pay))", &["DURING[1, 10](O[A](pay))"]);
        assert_eq!(result.status, ProofStatus::Proved);
        assert_verified(&result, &axioms);
    }

    #[test]
    fn test_higher_order_is_unsupported() {
        let (result, _) = prove("∀p. p(Socrates)", &[]);
        assert_eq!(result.status, ProofStatus::Unsupported);
    }

    #[test]
    fn test_node_budget_yields_unknown() {
        let budget = ProverBudget {
            max_nodes: 2,
            ..ProverBudget::default()
        };
        let axioms = vec![f("p"), f("p → q"), f("q → r"), f("r → s"), f("s → t")];
        let result = prover().prove_with_budget(&f("t"), &axioms, &budget);
        assert_eq!(result.status, ProofStatus::Unknown);
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            ProofStatus::Proved,
            ProofStatus::ProverUnavailable,
            ProofStatus::RateLimited,
        ] {
            assert_eq!(status.to_string().parse::<ProofStatus>().unwrap(), status);
        }
        assert!(ProofStatus::Timeout.should_escalate());
        assert!(!ProofStatus::Proved.should_escalate());
    }
}
