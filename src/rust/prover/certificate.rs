// SPDX-License-Identifier: PMPL-1.0-or-later

//! Replayable proof certificates
//!
//! A certificate is the ordered list of rule applications that proves its
//! goal. Verification replays every step against the named rule's `check`,
//! independently of the search that produced it. Four structural steps
//! manage hypotheses:
//!
//! - `assume` opens a scope with a hypothesis
//! - `implication_intro` discharges the innermost hypothesis `φ` and turns
//!   the premise `ψ` into `φ → ψ`
//! - `reductio` discharges the innermost hypothesis `¬φ` given `⊥` and
//!   concludes `φ`
//! - `forall_intro` generalizes over an eigen-constant that occurs in
//!   neither the axioms nor an open hypothesis

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, TdfolError};
use crate::formula::{ProofFormula, Quantifier, Term};
use crate::rules::RuleRegistry;

pub const ASSUME: &str = "assume";
pub const IMPLICATION_INTRO: &str = "implication_intro";
pub const REDUCTIO: &str = "reductio";
pub const FORALL_INTRO: &str = "forall_intro";

const HASH_DOMAIN: &str = "tdfol-cert-v1:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: DeserializeOwned"))]
pub struct CertificateStep<F> {
    pub index: usize,
    pub rule: String,
    pub premises: Vec<F>,
    pub conclusion: F,
    /// Open hypotheses once the step is applied
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "F: Serialize", deserialize = "F: DeserializeOwned"))]
pub struct Certificate<F> {
    pub goal: F,
    pub steps: Vec<CertificateStep<F>>,
    /// BLAKE3 over goal and steps, hex
    pub hash: String,
}

impl<F: ProofFormula> Certificate<F> {
    /// Build a certificate, numbering the steps in order
    pub fn new(goal: F, mut steps: Vec<CertificateStep<F>>) -> Self {
        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
        }
        let hash = Self::content_hash(&goal, &steps);
        Certificate { goal, steps, hash }
    }

    pub fn content_hash(goal: &F, steps: &[CertificateStep<F>]) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN.as_bytes());
        hasher.update(goal.to_string().as_bytes());
        for step in steps {
            hasher.update(format!("\n{}|{}|{}|", step.index, step.rule, step.depth).as_bytes());
            for premise in &step.premises {
                hasher.update(premise.to_string().as_bytes());
                hasher.update(b";");
            }
            hasher.update(b"=>");
            hasher.update(step.conclusion.to_string().as_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct rule names in order of first use
    pub fn rules_used(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for step in &self.steps {
            if !seen.contains(&step.rule.as_str()) {
                seen.push(step.rule.as_str());
            }
        }
        seen
    }

    /// Replay every step; fails at the first step that does not re-check
    pub fn verify(&self, axioms: &[F], registry: &RuleRegistry<F>) -> Result<()> {
        let mut replay = Replay::new(axioms);
        for (i, step) in self.steps.iter().enumerate() {
            let fail = |reason: String| TdfolError::certificate(i, reason);
            if step.index != i {
                return Err(fail(format!("step numbered {}", step.index)));
            }
            for premise in &step.premises {
                if !replay.knows(premise) {
                    return Err(fail(format!("premise {} is not available", premise)));
                }
            }
            match step.rule.as_str() {
                ASSUME => {
                    if !step.premises.is_empty() {
                        return Err(fail("assume takes no premises".to_string()));
                    }
                    replay.open(step.conclusion.clone());
                }
                IMPLICATION_INTRO => {
                    let premise = single(&step.premises).ok_or_else(|| fail("expected one premise".into()))?;
                    let hypothesis = replay.close().ok_or_else(|| fail("no open hypothesis".into()))?;
                    let expected = F::implication(hypothesis, premise.clone());
                    if expected != step.conclusion {
                        return Err(fail(format!("expected {}", expected)));
                    }
                    replay.add(step.conclusion.clone());
                }
                REDUCTIO => {
                    let premise = single(&step.premises).ok_or_else(|| fail("expected one premise".into()))?;
                    if !premise.is_falsum() {
                        return Err(fail("reductio needs ⊥".to_string()));
                    }
                    let hypothesis = replay.close().ok_or_else(|| fail("no open hypothesis".into()))?;
                    if hypothesis != step.conclusion.negate() {
                        return Err(fail(format!("hypothesis {} is not the negated conclusion", hypothesis)));
                    }
                    replay.add(step.conclusion.clone());
                }
                FORALL_INTRO => {
                    let premise = single(&step.premises).ok_or_else(|| fail("expected one premise".into()))?;
                    replay.check_generalization(premise, &step.conclusion).map_err(|reason| fail(reason))?;
                    replay.add(step.conclusion.clone());
                }
                name => {
                    let rule = registry
                        .get(name)
                        .ok_or_else(|| fail(format!("unknown rule '{}'", name)))?;
                    let premises: Vec<&F> = step.premises.iter().collect();
                    if !rule.check(&premises, &step.conclusion) {
                        return Err(fail(format!("{} does not yield {}", name, step.conclusion)));
                    }
                    replay.add(step.conclusion.clone());
                }
            }
            if replay.depth() != step.depth {
                return Err(fail(format!(
                    "recorded depth {} but {} hypotheses are open",
                    step.depth,
                    replay.depth()
                )));
            }
        }
        if replay.depth() != 0 {
            return Err(TdfolError::certificate(
                self.steps.len(),
                format!("{} hypotheses left open", replay.depth()),
            ));
        }
        if !replay.knows(&self.goal) {
            return Err(TdfolError::certificate(
                self.steps.len(),
                format!("goal {} was not established", self.goal),
            ));
        }
        if Self::content_hash(&self.goal, &self.steps) != self.hash {
            return Err(TdfolError::certificate(self.steps.len(), "content hash mismatch"));
        }
        Ok(())
    }
}

fn single<F>(premises: &[F]) -> Option<&F> {
    match premises {
        [only] => Some(only),
        _ => None,
    }
}

/// Scoped fact store used during replay
struct Replay<F> {
    axiom_symbols: BTreeSet<String>,
    /// Scope 0 holds the axioms; each hypothesis opens a new scope
    scopes: Vec<(Option<F>, Vec<F>)>,
}

impl<F: ProofFormula> Replay<F> {
    fn new(axioms: &[F]) -> Self {
        let mut axiom_symbols = BTreeSet::new();
        for axiom in axioms {
            axiom.collect_symbols(&mut axiom_symbols);
        }
        Replay {
            axiom_symbols,
            scopes: vec![(None, axioms.to_vec())],
        }
    }

    fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    fn knows(&self, formula: &F) -> bool {
        self.scopes.iter().any(|(hyp, facts)| {
            hyp.as_ref() == Some(formula) || facts.contains(formula)
        })
    }

    fn add(&mut self, formula: F) {
        if let Some((_, facts)) = self.scopes.last_mut() {
            facts.push(formula);
        }
    }

    fn open(&mut self, hypothesis: F) {
        self.scopes.push((Some(hypothesis), Vec::new()));
    }

    fn close(&mut self) -> Option<F> {
        if self.scopes.len() <= 1 {
            return None;
        }
        self.scopes.pop().and_then(|(hyp, _)| hyp)
    }

    fn check_generalization(&self, premise: &F, conclusion: &F) -> std::result::Result<(), String> {
        let Some((Quantifier::Forall, var, _, body)) = conclusion.as_quantified() else {
            return Err(format!("{} is not universally quantified", conclusion));
        };
        if body == premise && !body.free_vars().contains(var) {
            return Ok(());
        }
        let mut premise_symbols = BTreeSet::new();
        premise.collect_symbols(&mut premise_symbols);
        let mut conclusion_symbols = BTreeSet::new();
        conclusion.collect_symbols(&mut conclusion_symbols);
        let mut hypothesis_symbols = BTreeSet::new();
        for (hyp, _) in &self.scopes {
            if let Some(h) = hyp {
                h.collect_symbols(&mut hypothesis_symbols);
            }
        }
        let eigen = premise_symbols.difference(&conclusion_symbols).find(|c| {
            body.substitute(var, &Term::Const((*c).clone())) == *premise
        });
        match eigen {
            None => Err(format!("{} is not an instance of {}", premise, conclusion)),
            Some(c) if self.axiom_symbols.contains(c) => {
                Err(format!("eigen-constant {} occurs in the axioms", c))
            }
            Some(c) if hypothesis_symbols.contains(c) => {
                Err(format!("eigen-constant {} occurs in an open hypothesis", c))
            }
            Some(_) => Ok(()),
        }
    }
}
