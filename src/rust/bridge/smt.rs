// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMT-LIB 2 adapter for Z3 and CVC5
//!
//! The problem `axioms ⊢ goal` is checked as the satisfiability of
//! `axioms ∧ ¬goal` over one uninterpreted sort `U`. Symbols are prefixed by
//! role (`p_` predicates, `f_` functions, `c_` constants, `v_` variables,
//! `m_` abstracted modalities) so they cannot clash with SMT-LIB keywords.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use super::encode::{plain, Encoder, Syntax};
use super::{
    resolve_executable, run_process, AdapterConfig, AdapterKind, Capabilities, ProverAdapter, ProverDescriptor,
    RawOutput, Translation,
};
use crate::formula::{Formula, Quantifier};
use crate::prover::ProofStatus;

/// Command-line dialect of the solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtSolver {
    Z3,
    Cvc5,
}

impl SmtSolver {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("cvc") {
            SmtSolver::Cvc5
        } else {
            SmtSolver::Z3
        }
    }

    fn base_args(&self, timeout: Duration) -> Vec<String> {
        match self {
            SmtSolver::Z3 => vec!["-in".into(), "-smt2".into(), format!("-T:{}", timeout.as_secs().max(1))],
            SmtSolver::Cvc5 => vec![
                "--lang=smt2".into(),
                "--incremental".into(),
                format!("--tlimit={}", timeout.as_millis().max(1)),
                "-".into(),
            ],
        }
    }
}

struct SmtLib;

fn symbol(prefix: &str, name: &str) -> String {
    let raw = format!("{}{}", prefix, name);
    if plain(name) {
        raw
    } else {
        format!("|{}|", raw.replace(['|', '\\'], "_"))
    }
}

impl Syntax for SmtLib {
    fn truth(&self, value: bool) -> String {
        (if value { "true" } else { "false" }).to_string()
    }

    fn not(&self, inner: String) -> String {
        format!("(not {})", inner)
    }

    fn and(&self, l: String, r: String) -> String {
        format!("(and {} {})", l, r)
    }

    fn or(&self, l: String, r: String) -> String {
        format!("(or {} {})", l, r)
    }

    fn implies(&self, l: String, r: String) -> String {
        format!("(=> {} {})", l, r)
    }

    fn iff(&self, l: String, r: String) -> String {
        format!("(= {} {})", l, r)
    }

    fn quantifier(&self, kind: Quantifier, var: &str, body: String) -> String {
        let q = match kind {
            Quantifier::Forall => "forall",
            Quantifier::Exists => "exists",
        };
        format!("({} (({} U)) {})", q, var, body)
    }

    fn apply(&self, head: &str, args: Vec<String>) -> String {
        if args.is_empty() {
            head.to_string()
        } else {
            format!("({} {})", head, args.join(" "))
        }
    }

    fn variable(&self, name: &str) -> String {
        symbol("v_", name)
    }

    fn predicate(&self, name: &str) -> String {
        symbol("p_", name)
    }

    fn function(&self, name: &str) -> String {
        symbol("f_", name)
    }

    fn constant(&self, name: &str) -> String {
        symbol("c_", name)
    }

    fn number(&self, n: i64) -> String {
        if n < 0 {
            format!("n_m{}", n.unsigned_abs())
        } else {
            format!("n_{}", n)
        }
    }

    fn modal(&self, index: usize) -> String {
        format!("m_{}", index)
    }
}

/// Render `axioms ∧ ¬goal` as an SMT-LIB script
pub fn to_smtlib(goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
    let syntax = SmtLib;
    let mut enc = Encoder::new(&syntax);
    let encoded_axioms = axioms.iter().map(|a| enc.encode(a)).collect::<anyhow::Result<Vec<_>>>()?;
    let encoded_goal = enc.encode(goal)?;

    let mut out = String::new();
    writeln!(out, "(set-logic ALL)")?;
    writeln!(out, "(declare-sort U 0)")?;
    for c in &enc.signature.constants {
        writeln!(out, "(declare-const {} U)", c)?;
    }
    for (f, arity) in &enc.signature.functions {
        writeln!(out, "(declare-fun {} ({}) U)", f, vec!["U"; *arity].join(" "))?;
    }
    for (p, arity) in &enc.signature.predicates {
        writeln!(out, "(declare-fun {} ({}) Bool)", p, vec!["U"; *arity].join(" "))?;
    }
    for a in &encoded_axioms {
        writeln!(out, "(assert {})", a)?;
    }
    writeln!(out, "(assert (not {}))", encoded_goal)?;
    writeln!(out, "(check-sat)")?;
    writeln!(out, "(exit)")?;
    Ok(Translation {
        text: out,
        lossy: enc.is_lossy(),
    })
}

/// Verdict from the first `sat`/`unsat`/`unknown` line
pub fn parse_verdict(stdout: &str, lossy: bool) -> ProofStatus {
    for line in stdout.lines().map(str::trim) {
        match line {
            "unsat" => return ProofStatus::Proved,
            "sat" if lossy => return ProofStatus::Unknown,
            "sat" => return ProofStatus::Disproved,
            "unknown" => return ProofStatus::Unknown,
            "timeout" => return ProofStatus::Timeout,
            _ => {}
        }
    }
    ProofStatus::Unknown
}

/// Z3 or CVC5 over stdin
pub struct SmtAdapter {
    name: String,
    solver: SmtSolver,
    executable: PathBuf,
    args: Vec<String>,
}

impl SmtAdapter {
    pub fn new(name: impl Into<String>, solver: SmtSolver, executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        SmtAdapter {
            name: name.into(),
            solver,
            executable: executable.into(),
            args: solver.base_args(timeout),
        }
    }

    pub fn from_config(spec: &AdapterConfig, timeout: Duration) -> Self {
        let solver = SmtSolver::from_name(spec.executable());
        let mut adapter = Self::new(&spec.name, solver, resolve_executable(spec), timeout);
        adapter.args.extend(spec.args.iter().cloned());
        adapter
    }

    pub fn solver(&self) -> SmtSolver {
        self.solver
    }
}

#[async_trait]
impl ProverAdapter for SmtAdapter {
    fn descriptor(&self) -> ProverDescriptor {
        ProverDescriptor {
            name: self.name.clone(),
            kind: AdapterKind::Smt,
            capabilities: Capabilities::classical(),
            priority: AdapterKind::Smt.default_priority(),
            available: None,
        }
    }

    async fn probe(&self) -> bool {
        which::which(&self.executable).is_ok()
    }

    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
        to_smtlib(goal, axioms)
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput> {
        run_process(&self.executable, &self.args, Some(input), None).await
    }

    fn translate_out(&self, raw: &RawOutput, translation: &Translation) -> ProofStatus {
        parse_verdict(&raw.stdout, translation.lossy)
    }
}
