// SPDX-License-Identifier: PMPL-1.0-or-later

//! Coq adapter
//!
//! The problem becomes a section with one variable per symbol, one
//! hypothesis per axiom and a goal closed by `firstorder`. `coqc` compiles
//! the file in a scratch directory; a clean exit means the goal is proved.
//! Coq cannot refute, so a failed tactic is `Unknown`.

use anyhow::Context as AnyhowContext;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::PathBuf;

use super::encode::{sanitize, Encoder, Syntax};
use super::{
    resolve_executable, run_process, AdapterConfig, AdapterKind, Capabilities, ProverAdapter, ProverDescriptor,
    RawOutput, Translation,
};
use crate::formula::{Formula, Quantifier};
use crate::prover::ProofStatus;

const SCRIPT: &str = "Goal.v";

struct Gallina;

impl Syntax for Gallina {
    fn truth(&self, value: bool) -> String {
        (if value { "True" } else { "False" }).to_string()
    }

    fn not(&self, inner: String) -> String {
        format!("~ ({})", inner)
    }

    fn and(&self, l: String, r: String) -> String {
        format!("({} /\\ {})", l, r)
    }

    fn or(&self, l: String, r: String) -> String {
        format!("({} \\/ {})", l, r)
    }

    fn implies(&self, l: String, r: String) -> String {
        format!("({} -> {})", l, r)
    }

    fn iff(&self, l: String, r: String) -> String {
        format!("({} <-> {})", l, r)
    }

    fn quantifier(&self, kind: Quantifier, var: &str, body: String) -> String {
        match kind {
            Quantifier::Forall => format!("(forall {} : U, {})", var, body),
            Quantifier::Exists => format!("(exists {} : U, {})", var, body),
        }
    }

    fn apply(&self, head: &str, args: Vec<String>) -> String {
        if args.is_empty() {
            head.to_string()
        } else {
            format!("({} {})", head, args.join(" "))
        }
    }

    fn variable(&self, name: &str) -> String {
        format!("v_{}", sanitize(name))
    }

    fn predicate(&self, name: &str) -> String {
        format!("p_{}", sanitize(name))
    }

    fn function(&self, name: &str) -> String {
        format!("f_{}", sanitize(name))
    }

    fn constant(&self, name: &str) -> String {
        format!("c_{}", sanitize(name))
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

fn arrow(arity: usize, result: &str) -> String {
    let mut parts = vec!["U"; arity];
    parts.push(result);
    parts.join(" -> ")
}

/// Render the problem as a Coq script
pub fn to_coq(goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
    let syntax = Gallina;
    let mut enc = Encoder::new(&syntax);
    let encoded_axioms = axioms.iter().map(|a| enc.encode(a)).collect::<anyhow::Result<Vec<_>>>()?;
    let encoded_goal = enc.encode(goal)?;

    let mut out = String::new();
    writeln!(out, "Section Problem.")?;
    writeln!(out, "Variable U : Type.")?;
    // a non-empty domain, as in classical first-order logic
    writeln!(out, "Variable inhabitant : U.")?;
    for c in &enc.signature.constants {
        writeln!(out, "Variable {} : U.", c)?;
    }
    for (f, arity) in &enc.signature.functions {
        writeln!(out, "Variable {} : {}.", f, arrow(*arity, "U"))?;
    }
    for (p, arity) in &enc.signature.predicates {
        writeln!(out, "Variable {} : {}.", p, arrow(*arity, "Prop"))?;
    }
    for (i, a) in encoded_axioms.iter().enumerate() {
        writeln!(out, "Hypothesis ax{} : {}.", i, a)?;
    }
    writeln!(out, "Theorem goal : {}.", encoded_goal)?;
    writeln!(out, "Proof. firstorder. Qed.")?;
    writeln!(out, "End Problem.")?;
    Ok(Translation {
        text: out,
        lossy: enc.is_lossy(),
    })
}

/// `coqc` on a scratch script
pub struct CoqAdapter {
    name: String,
    executable: PathBuf,
    args: Vec<String>,
}

impl CoqAdapter {
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        CoqAdapter {
            name: name.into(),
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn from_config(spec: &AdapterConfig) -> Self {
        let mut adapter = Self::new(&spec.name, resolve_executable(spec));
        adapter.args.extend(spec.args.iter().cloned());
        adapter
    }
}

#[async_trait]
impl ProverAdapter for CoqAdapter {
    fn descriptor(&self) -> ProverDescriptor {
        ProverDescriptor {
            name: self.name.clone(),
            kind: AdapterKind::Interactive,
            capabilities: Capabilities {
                induction: true,
                ..Capabilities::classical()
            },
            priority: AdapterKind::Interactive.default_priority(),
            available: None,
        }
    }

    async fn probe(&self) -> bool {
        which::which(&self.executable).is_ok()
    }

    fn translate_in(&self, goal: &Formula, axioms: &[Formula]) -> anyhow::Result<Translation> {
        to_coq(goal, axioms)
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<RawOutput> {
        let dir = tempfile::tempdir().context("failed to create Coq scratch directory")?;
        let script = dir.path().join(SCRIPT);
        tokio::fs::write(&script, input)
            .await
            .with_context(|| format!("failed to write {}", script.display()))?;
        let mut args = self.args.clone();
        args.push(SCRIPT.to_string());
        run_process(&self.executable, &args, None, Some(dir.path())).await
    }

    fn translate_out(&self, raw: &RawOutput, _translation: &Translation) -> ProofStatus {
        if raw.exit_code == Some(0) && !raw.stderr.contains("Error") {
            ProofStatus::Proved
        } else {
            ProofStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_shape() {
        let t = to_coq(
            &parse("Mortal(Socrates)").unwrap(),
            &[parse("∀x. Human(x) → Mortal(x)").unwrap(), parse("Human(Socrates)").unwrap()],
        )
        .unwrap();
        assert!(t.text.starts_with("Section Problem.\nVariable U : Type.\n"));
        assert!(t.text.contains("Variable c_Socrates : U."));
        assert!(t.text.contains("Variable p_Human : U -> Prop."));
        assert!(t.text.contains("Hypothesis ax0 : (forall v_x : U, ((p_Human v_x) -> (p_Mortal v_x)))."));
        assert!(t.text.contains("Theorem goal : (p_Mortal c_Socrates)."));
        assert!(t.text.contains("Proof. firstorder. Qed."));
    }

    #[test]
    fn test_propositional_symbols() {
        let t = to_coq(&parse("q").unwrap(), &[parse("p ∧ (p → q)").unwrap()]).unwrap();
        assert!(t.text.contains("Variable p_p : Prop."));
        assert!(t.text.contains("Hypothesis ax0 : (p_p /\\ (p_p -> p_q))."));
    }

    #[test]
    fn test_exit_code_decides() {
        let adapter = CoqAdapter::new("coqc", "coqc");
        let t = Translation {
            text: String::new(),
            lossy: false,
        };
        let ok = RawOutput {
            exit_code: Some(0),
            ..RawOutput::default()
        };
        let failed = RawOutput {
            exit_code: Some(1),
            stderr: "Error: Tactic failure".into(),
            ..RawOutput::default()
        };
        assert_eq!(adapter.translate_out(&ok, &t), ProofStatus::Proved);
        assert_eq!(adapter.translate_out(&failed, &t), ProofStatus::Unknown);
    }
}
