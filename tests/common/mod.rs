// SPDX-License-Identifier: PMPL-1.0-or-later

//! Common test utilities for the TDFOL test suite

#![allow(dead_code)]

use std::sync::Once;
use tdfol::bridge::AdapterKind;
use tdfol::{parse, Formula};

pub mod assertions;
pub mod generators;
pub mod mock_prover;

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn f(text: &str) -> Formula {
    parse(text).unwrap_or_else(|e| panic!("fixture {:?} does not parse: {}", text, e))
}

pub fn kb(texts: &[&str]) -> Vec<Formula> {
    texts.iter().map(|t| f(t)).collect()
}

/// Classic syllogism: goal and axioms
pub fn socrates() -> (Formula, Vec<Formula>) {
    (
        f("Mortal(Socrates)"),
        kb(&["∀x. Human(x) → Mortal(x)", "Human(Socrates)"]),
    )
}

/// Obligation that persists through a window
pub fn tax_obligation() -> (Formula, Vec<Formula>) {
    (
        f("DURING[1, 12](O[Alice](PayTax))"),
        kb(&["Resident(Alice)", "Resident(Alice) → DURING[1, 12](O[Alice](PayTax))"]),
    )
}

/// Executable name for a backend kind, as configured by default
pub fn default_executable(kind: AdapterKind) -> &'static str {
    match kind {
        AdapterKind::Smt => "z3",
        AdapterKind::Atp => "eprover",
        AdapterKind::Interactive => "coqc",
        AdapterKind::Llm => "",
    }
}

pub fn is_executable_available(name: &str) -> bool {
    !name.is_empty() && which::which(name).is_ok()
}

/// Skip the test when a prover binary is not installed
#[macro_export]
macro_rules! require_executable {
    ($name:expr) => {
        if !$crate::common::is_executable_available($name) {
            eprintln!("Skipping test: {} not available", $name);
            return;
        }
    };
}
