// SPDX-License-Identifier: PMPL-1.0-or-later

//! TPTP adapter for first-order ATPs (Vampire, E)
//!
//! Problems are written as `fof` formulas to a scratch file and the verdict
//! is read from the prover's SZS status line.

use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use super::encode::{plain, Encoder, Syntax};
use super::{
    resolve_executable, run_process, AdapterConfig, AdapterKind, Capabilities, ProverAdapter, ProverDescriptor,
    RawOutput, Translation,
};
use crate::formula::{Formula, Quantifier};
use crate::prover::ProofStatus;

/// Which ATP command line to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtpSystem {
    Vampire,
    E,
}

impl AtpSystem {
    pub fn from_name(name: &str) -> Self {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name).to_lowercase();
        if base == "eprover" || base == "e" || base.starts_with("eprover") {
            AtpSystem::E
        } else {
            AtpSystem::Vampire
        }
    }

    fn base_args(&self, timeout: Duration) -> Vec<String> {
        let secs = timeout.as_secs().max(1);
        match self {
            AtpSystem::Vampire => vec!["--mode".into(), "casc".into(), "-t".into(), secs.to_string()],
            AtpSystem::E => vec![
                "--auto".into(),
                "--tstp-format".into(),
                "-s".into(),
                format!("--cpu-limit={}", secs),
            ],
        }
    }
}

struct Tptp;

fn lower(prefix: &str, name: &str) -> String {
    if plain(name) {
        format!("{}{}", prefix, name)
    } else {
        format!("'{}{}'", prefix, name.replace(['\'', '\\'], "_"))
    }
}

impl Syntax for Tptp {
    fn truth(&self, value: bool) -> String {
        (if value { "$true" } else { "$false" }).to_string()
    }

    fn not(&self, inner: String) -> String {
        format!("~ ({})", inner)
    }

    fn and(&self, l: String, r: String) -> String {
        format!("({} & {})", l, r)
    }

    fn or(&self, l: String, r: String) -> String {
        format!("({} | {})", l, r)
    }

    fn implies(&self, l: String, r: String) -> String {
        format!("({} => {})", l, r)
    }

    fn iff(&self, l: String, r: String) -> String {
        format!("({} <=> {})", l, r)
    }

    fn quantifier(&self, kind: Quantifier, var: &str, body: String) -> String {
        let q = match kind {
            Quantifier::Forall => "!",
            Quantifier::Exists => "?",
        };
        format!("({} [{}] : {})", q, var, body)
    }

    fn apply(&self, head: &str, args: Vec<String>) -> String {
        if args.is_empty() {
            head.to_string()
        } else {
            format!("{}({})", head, args.join(", "))
        }
    }

    fn variable(&self, name: &str) -> String {
        format!("V_{}", super::encode::sanitize(name))
    }

    fn predicate(&self, name: &str) -> String {
        lower("p_", name)
    }

    fn function(&self, name: &str) -> String {
        lower("f_", name)
    }

    fn constant(&self, name: &str) -> String {
        lower("c_", name)
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

/// Render the problem as TPTP `fof` statements
pub fn to_tptp(goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
    let syntax = Tptp;
    let mut enc = Encoder::new(&syntax);
    let mut out = String::new();
    for (i, axiom) in axioms.iter().enumerate() {
        writeln!(out, "fof(ax{}, axiom, {}).", i, enc.encode(axiom)?)?;
    }
    writeln!(out, "fof(goal, conjecture, {}).", enc.encode(goal)?)?;
    Ok(Translation {
        text: out,
        lossy: enc.is_lossy(),
    })
}

/// Verdict from an SZS status line
pub fn parse_szs(stdout: &str, lossy: bool) -> ProofStatus {
    let Some(status) = stdout
        .lines()
        .find_map(|l| l.split("SZS status ").nth(1))
        .and_then(|rest| rest.split_whitespace().next())
    else {
        return ProofStatus::Unknown;
    };
    match status {
        "Theorem" | "Unsatisfiable" | "ContradictoryAxioms" => ProofStatus::Proved,
        "CounterSatisfiable" | "Satisfiable" if !lossy => ProofStatus::Disproved,
        "Timeout" | "ResourceOut" => ProofStatus::Timeout,
        _ => ProofStatus::Unknown,
    }
}

/// Vampire or E on a scratch problem file
pub struct TptpAdapter {
    name: String,
    system: AtpSystem,
    executable: PathBuf,
    args: Vec<String>,
}

impl TptpAdapter {
    pub fn new(name: impl Into<String>, system: AtpSystem, executable: impl Into<PathBuf>, timeout: Duration) -> Self {
        TptpAdapter {
            name: name.into(),
            system,
            executable: executable.into(),
            args: system.base_args(timeout),
        }
    }

    pub fn from_config(spec: &AdapterConfig, timeout: Duration) -> Self {
        let system = AtpSystem::from_name(spec.executable());
        let mut adapter = Self::new(&spec.name, system, resolve_executable(spec), timeout);
        adapter.args.extend(spec.args.iter().cloned());
        adapter
    }

    pub fn system(&self) -> AtpSystem {
        self.system
    }
}

#[async_trait]
impl ProverAdapter for TptpAdapter {
    fn descriptor(&self) -> ProverDescriptor {
        ProverDescriptor {
            name: self.name.clone(),
            kind: AdapterKind::Atp,
            capabilities: Capabilities::classical(),
            priority: AdapterKind::Atp.default_priority(),
            available: None,
        }
    }

    async fn probe(&self) -> bool {
        which::which(&self.executable).is_ok()
    }

    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
        to_tptp(goal, axioms)
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("tdfol_")
            .suffix(".p")
            .tempfile()
            .context("failed to create TPTP problem file")?;
        file.write_all(input.as_bytes())?;
        file.flush()?;
        let mut args = self.args.clone();
        args.push(file.path().display().to_string());
        run_process(&self.executable, &args, None, None).await
    }

    fn translate_out(&self, raw: &RawOutput, translation: &Translation) -> ProofStatus {
        parse_szs(&raw.stdout, translation.lossy)
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

    #[test]
    fn test_fof_problem() {
        let t = to_tptp(
            &f("Mortal(Socrates)"),
            &[f("∀x. Human(x) → Mortal(x)"), f("Human(Socrates)")],
        )
        .unwrap();
        let lines: Vec<&str> = t.text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "fof(ax0, axiom, (! [V_x] : (p_Human(V_x) => p_Mortal(V_x)))).",
                "fof(ax1, axiom, p_Human(c_Socrates)).",
                "fof(goal, conjecture, p_Mortal(c_Socrates)).",
            ]
        );
    }

    #[test]
    fn test_szs_status() {
        assert_eq!(parse_szs("% SZS status Theorem for problem\n", false), ProofStatus::Proved);
        assert_eq!(parse_szs("# SZS status CounterSatisfiable\n", false), ProofStatus::Disproved);
        assert_eq!(parse_szs("# SZS status CounterSatisfiable\n", true), ProofStatus::Unknown);
        assert_eq!(parse_szs("% SZS status Timeout for x\n", false), ProofStatus::Timeout);
        assert_eq!(parse_szs("no status here", false), ProofStatus::Unknown);
    }

    #[test]
    fn test_system_from_name() {
        assert_eq!(AtpSystem::from_name("/opt/bin/eprover"), AtpSystem::E);
        assert_eq!(AtpSystem::from_name("vampire_rel"), AtpSystem::Vampire);
    }
}
