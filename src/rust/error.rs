// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error taxonomy for the TDFOL core
//!
//! Only malformed input and configuration problems surface as errors.
//! "Could not prove" outcomes (timeout, unknown, unsupported, unavailable,
//! rate limited) are carried in [`crate::prover::ProofStatus`] instead.

use thiserror::Error;

use crate::conflict::Conflict;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, TdfolError>;

/// Errors raised by the parser, configuration layer, cache store and engine
#[derive(Debug, Error)]
pub enum TdfolError {
    /// Malformed formula text
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    /// Input rejected before proving because it is too large or too deep
    #[error("complexity limit exceeded: {limit} (limit {max}, got {actual})")]
    ComplexityLimitExceeded {
        limit: ComplexityLimit,
        max: usize,
        actual: usize,
    },

    /// Construct outside the fragment a component handles
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An external prover adapter is missing or failed its probe
    #[error("prover unavailable: {0}")]
    ProverUnavailable(String),

    /// The LLM prover token bucket is empty
    #[error("rate limited: retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    /// The axioms contain deontic conflicts
    #[error("inconsistent axioms: {} conflict(s) detected", .0.len())]
    InconsistentAxioms(Vec<Conflict>),

    /// Malformed or contradictory configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistent cache store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// A certificate step did not replay
    #[error("certificate rejected at step {step}: {reason}")]
    Certificate { step: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which complexity budget a rejected input exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityLimit {
    InputLength,
    NestingDepth,
    NodeCount,
}

impl std::fmt::Display for ComplexityLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplexityLimit::InputLength => write!(f, "input length"),
            ComplexityLimit::NestingDepth => write!(f, "nesting depth"),
            ComplexityLimit::NodeCount => write!(f, "node count"),
        }
    }
}

impl TdfolError {
    pub fn parse(message: impl Into<String>, line: usize, column: usize) -> Self {
        TdfolError::Parse {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        TdfolError::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        TdfolError::Storage(message.into())
    }

    pub fn certificate(step: usize, reason: impl Into<String>) -> Self {
        TdfolError::Certificate {
            step,
            reason: reason.into(),
        }
    }

    /// True for errors the caller can fix by changing the input text
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TdfolError::Parse { .. } | TdfolError::ComplexityLimitExceeded { .. }
        )
    }

    /// True for errors that should abort start-up
    pub fn is_fatal(&self) -> bool {
        matches!(self, TdfolError::Config(_))
    }
}

impl From<sled::Error> for TdfolError {
    fn from(e: sled::Error) -> Self {
        TdfolError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for TdfolError {
    fn from(e: serde_json::Error) -> Self {
        TdfolError::Storage(format!("serialization: {}", e))
    }
}
