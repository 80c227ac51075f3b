// SPDX-License-Identifier: PMPL-1.0-or-later

//! TDFOL: a Temporal Deontic First-Order Logic reasoning core
//!
//! Formulas are parsed into an immutable tree, proved by a forward-chaining
//! rule engine that emits replayable certificates, cached under a
//! content-addressed key and, when the native search is inconclusive, handed
//! to external SMT, TPTP, Coq or LLM backends. A Cognitive Event Calculus
//! variant reuses the same parser, rule engine and prover.
//!
//! ```no_run
//! # async fn demo() -> tdfol::Result<()> {
//! use tdfol::{TdfolConfig, TdfolEngine};
//!
//! let engine = TdfolEngine::new(TdfolConfig::offline())?;
//! let result = engine
//!     .prove_text("Mortal(Socrates)", &["∀x. Human(x) → Mortal(x)", "Human(Socrates)"])
//!     .await?;
//! assert!(result.is_proved());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod cec;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod formula;
pub mod parser;
pub mod prover;
pub mod rules;

pub use bridge::{AdapterKind, ProverAdapter, ProverBridge, TokenBucket};
pub use cache::{CacheConfig, CacheStats, ProofCache};
pub use cec::{parse_cec, CecFormula};
pub use config::TdfolConfig;
pub use conflict::{detect_conflicts, Conflict, ConflictDetector, ConflictKind};
pub use engine::{TdfolEngine, TdfolEngineBuilder};
pub use error::{Result, TdfolError};
pub use formula::{Fingerprint, Formula, ProofFormula, Term};
pub use parser::{parse, Parser, ParserConfig};
pub use prover::{Certificate, NativeProver, ProofResult, ProofStatus, ProverBudget};
pub use rules::{InferenceRule, RuleCategory, RuleRegistry};
