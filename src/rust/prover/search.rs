// SPDX-License-Identifier: PMPL-1.0-or-later

//! Forward-chaining search with goal decomposition and reductio
//!
//! The goal is first decomposed: each implication antecedent is assumed and
//! each universal is instantiated with a fresh eigen-constant. The remaining
//! target is then searched for level by level (semi-naive: every level only
//! tries premise tuples that involve a fact from the previous level). When
//! plain saturation does not reach the target, `¬target` is assumed and the
//! search continues until `⊥` appears.

use indexmap::IndexSet;
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use tracing::{debug, trace};

use crate::formula::{fresh_name, ProofFormula, Quantifier, Term};
use crate::rules::{derive, RuleContext, RuleRegistry};

use super::certificate::{
    Certificate, CertificateStep, ASSUME, FORALL_INTRO, IMPLICATION_INTRO, REDUCTIO,
};
use super::{ProofStatus, ProverBudget};

/// How a fact entered the search
#[derive(Debug, Clone)]
enum Origin<F> {
    Given,
    Assumed,
    Derived { rule: &'static str, premises: Vec<F> },
}

/// A decomposition step taken on the goal
#[derive(Debug, Clone)]
enum Frame<F> {
    /// `whole = antecedent → rest`
    Implication { antecedent: F, whole: F },
    /// `whole = ∀var. body`, proved for `instance = body[var := eigen]`
    Forall { instance: F, whole: F },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Found,
    Fixpoint,
    DepthExhausted,
    NodesExhausted,
    Deadline,
}

/// Outcome of one search, before it is wrapped into a result
#[derive(Debug)]
pub(crate) struct Outcome<F> {
    pub status: ProofStatus,
    pub certificate: Option<Certificate<F>>,
    pub message: String,
    pub nodes: usize,
}

impl<F> Outcome<F> {
    fn open(status: ProofStatus, message: impl Into<String>, nodes: usize) -> Self {
        Outcome {
            status,
            certificate: None,
            message: message.into(),
            nodes,
        }
    }
}

pub(crate) struct Search<'a, F: ProofFormula> {
    registry: &'a RuleRegistry<F>,
    budget: &'a ProverBudget,
    started: Instant,
    nodes: usize,
    /// First fact whose premise tuples have not all been tried
    frontier: usize,
    facts: IndexSet<F>,
    origins: HashMap<F, Origin<F>>,
    ctx: RuleContext<F>,
}

impl<'a, F: ProofFormula> Search<'a, F> {
    pub fn new(registry: &'a RuleRegistry<F>, budget: &'a ProverBudget) -> Self {
        Search {
            registry,
            budget,
            started: Instant::now(),
            nodes: 0,
            frontier: 0,
            facts: IndexSet::new(),
            origins: HashMap::new(),
            ctx: RuleContext::default(),
        }
    }

    pub fn run(mut self, goal: &F, axioms: &[F]) -> Outcome<F> {
        if let Some(outcome) = self.trivial(goal, axioms) {
            return outcome;
        }

        let (frames, target) = decompose(goal, axioms);
        debug!(frames = frames.len(), target = %target, "goal decomposed");

        self.ctx = RuleContext::for_problem(&target, axioms);
        self.ctx.add_source(goal);
        for axiom in axioms {
            self.insert(axiom.clone(), Origin::Given);
        }
        for frame in &frames {
            if let Frame::Implication { antecedent, .. } = frame {
                self.ctx.add_source(antecedent);
                self.insert(antecedent.clone(), Origin::Assumed);
            }
        }

        let negated = target.negate();
        let can_disprove = frames.is_empty();

        let stop = self.saturate(0, &|f: &F| *f == target || f.is_falsum());
        match stop {
            Stop::Found if self.facts.contains(&target) => {
                let steps = self.direct_steps(&frames, &target);
                return self.proved(goal, steps, "target derived by forward chaining");
            }
            Stop::Deadline => return self.timed_out(),
            Stop::NodesExhausted => return self.exhausted(),
            Stop::Fixpoint | Stop::DepthExhausted if can_disprove && self.facts.contains(&negated) => {
                let steps = self.derivation_steps(&negated, 0);
                return Outcome {
                    status: ProofStatus::Disproved,
                    certificate: Some(Certificate::new(negated.clone(), steps)),
                    message: "negation of the goal follows from the axioms".to_string(),
                    nodes: self.nodes,
                };
            }
            _ => {}
        }

        // reductio: assume the negated target and look for ⊥
        let from = self.frontier.min(self.facts.len());
        self.insert(negated.clone(), Origin::Assumed);
        match self.saturate(from, &|f: &F| f.is_falsum()) {
            Stop::Found => {
                let steps = self.reductio_steps(&frames, &target, &negated);
                self.proved(goal, steps, "refutation of the negated target")
            }
            Stop::Deadline => self.timed_out(),
            Stop::NodesExhausted => self.exhausted(),
            Stop::Fixpoint => Outcome::open(
                ProofStatus::Unknown,
                "saturated without reaching the goal",
                self.nodes,
            ),
            Stop::DepthExhausted => Outcome::open(
                ProofStatus::Unknown,
                format!("depth budget of {} exhausted", self.budget.max_depth),
                self.nodes,
            ),
        }
    }

    /// `⊤`, an axiom, or a zero-premise tautology
    fn trivial(&self, goal: &F, axioms: &[F]) -> Option<Outcome<F>> {
        let steps = if axioms.contains(goal) {
            Vec::new()
        } else if let Some(rule) = self.registry.tautology_for(goal) {
            vec![CertificateStep {
                index: 0,
                rule: rule.to_string(),
                premises: Vec::new(),
                conclusion: goal.clone(),
                depth: 0,
            }]
        } else {
            return None;
        };
        Some(Outcome {
            status: ProofStatus::Proved,
            certificate: Some(Certificate::new(goal.clone(), steps)),
            message: "trivially closed".to_string(),
            nodes: 0,
        })
    }

    fn insert(&mut self, fact: F, origin: Origin<F>) -> bool {
        if self.facts.contains(&fact) {
            return false;
        }
        if let Some((ante, _)) = fact.as_implies() {
            self.ctx.add_source(ante);
        }
        self.origins.insert(fact.clone(), origin);
        self.facts.insert(fact);
        true
    }

    fn deadline_passed(&self) -> bool {
        self.started.elapsed().as_millis() as u64 >= self.budget.timeout_ms
    }

    fn saturate(&mut self, mut new_from: usize, stop_at: &dyn Fn(&F) -> bool) -> Stop {
        self.frontier = new_from;
        if self.facts.iter().any(stop_at) {
            return Stop::Found;
        }
        let registry = self.registry;
        let order = registry.search_order();
        for level in 0..self.budget.max_depth {
            let before = self.facts.len();
            for rule in order.iter().copied() {
                if self.deadline_passed() {
                    return Stop::Deadline;
                }
                let derived = derive(&**rule, &self.facts, new_from, &self.ctx);
                for (premises, conclusion) in derived {
                    if conclusion.size() > self.budget.max_formula_size {
                        continue;
                    }
                    let hit = stop_at(&conclusion);
                    let origin = Origin::Derived {
                        rule: rule.name(),
                        premises,
                    };
                    if !self.insert(conclusion, origin) {
                        continue;
                    }
                    self.nodes += 1;
                    if hit {
                        trace!(level, rule = rule.name(), "stop condition reached");
                        return Stop::Found;
                    }
                    if self.nodes >= self.budget.max_nodes {
                        return Stop::NodesExhausted;
                    }
                }
            }
            if self.facts.len() == before {
                self.frontier = self.facts.len();
                return Stop::Fixpoint;
            }
            trace!(level, facts = self.facts.len(), "level complete");
            new_from = before;
            self.frontier = new_from;
        }
        Stop::DepthExhausted
    }

    /// Derived steps behind `fact`, in the order the facts were found
    fn derivation_steps(&self, fact: &F, depth: usize) -> Vec<CertificateStep<F>> {
        let mut needed: BTreeSet<usize> = BTreeSet::new();
        let mut stack = vec![fact.clone()];
        while let Some(current) = stack.pop() {
            let Some(index) = self.facts.get_index_of(&current) else {
                continue;
            };
            if !needed.insert(index) {
                continue;
            }
            if let Some(Origin::Derived { premises, .. }) = self.origins.get(&current) {
                stack.extend(premises.iter().cloned());
            }
        }
        needed
            .into_iter()
            .filter_map(|index| {
                let conclusion = self.facts.get_index(index)?;
                match self.origins.get(conclusion)? {
                    Origin::Derived { rule, premises } => Some(CertificateStep {
                        index: 0,
                        rule: rule.to_string(),
                        premises: premises.clone(),
                        conclusion: conclusion.clone(),
                        depth,
                    }),
                    Origin::Given | Origin::Assumed => None,
                }
            })
            .collect()
    }

    fn direct_steps(&self, frames: &[Frame<F>], target: &F) -> Vec<CertificateStep<F>> {
        let mut steps = open_frames(frames);
        let depth = assumption_depth(frames);
        steps.extend(self.derivation_steps(target, depth));
        steps.extend(close_frames(frames, target.clone()));
        steps
    }

    fn reductio_steps(&self, frames: &[Frame<F>], target: &F, negated: &F) -> Vec<CertificateStep<F>> {
        let mut steps = open_frames(frames);
        let depth = assumption_depth(frames);
        steps.push(step(ASSUME, Vec::new(), negated.clone(), depth + 1));
        steps.extend(self.derivation_steps(&F::falsum(), depth + 1));
        steps.push(step(REDUCTIO, vec![F::falsum()], target.clone(), depth));
        steps.extend(close_frames(frames, target.clone()));
        steps
    }

    fn proved(&self, goal: &F, steps: Vec<CertificateStep<F>>, message: &str) -> Outcome<F> {
        Outcome {
            status: ProofStatus::Proved,
            certificate: Some(Certificate::new(goal.clone(), steps)),
            message: message.to_string(),
            nodes: self.nodes,
        }
    }

    fn timed_out(&self) -> Outcome<F> {
        Outcome::open(
            ProofStatus::Timeout,
            format!("deadline of {} ms exceeded", self.budget.timeout_ms),
            self.nodes,
        )
    }

    fn exhausted(&self) -> Outcome<F> {
        Outcome::open(
            ProofStatus::Unknown,
            format!("node budget of {} exhausted", self.budget.max_nodes),
            self.nodes,
        )
    }
}

fn step<F>(rule: &str, premises: Vec<F>, conclusion: F, depth: usize) -> CertificateStep<F> {
    CertificateStep {
        index: 0,
        rule: rule.to_string(),
        premises,
        conclusion,
        depth,
    }
}

fn assumption_depth<F>(frames: &[Frame<F>]) -> usize {
    frames
        .iter()
        .filter(|f| matches!(f, Frame::Implication { .. }))
        .count()
}

/// Split the goal into decomposition frames and the remaining target
fn decompose<F: ProofFormula>(goal: &F, axioms: &[F]) -> (Vec<Frame<F>>, F) {
    let mut taken = BTreeSet::new();
    goal.collect_symbols(&mut taken);
    for axiom in axioms {
        axiom.collect_symbols(&mut taken);
    }
    let mut frames = Vec::new();
    let mut current = goal.clone();
    loop {
        if let Some((ante, rest)) = current.as_implies() {
            let (antecedent, rest) = (ante.clone(), rest.clone());
            frames.push(Frame::Implication {
                antecedent,
                whole: current,
            });
            current = rest;
        } else if let Some((Quantifier::Forall, var, _, body)) = current.as_quantified() {
            let eigen = fresh_name("C", &taken);
            taken.insert(eigen.clone());
            let instance = body.substitute(var, &Term::Const(eigen));
            frames.push(Frame::Forall {
                instance: instance.clone(),
                whole: current,
            });
            current = instance;
        } else {
            return (frames, current);
        }
    }
}

fn open_frames<F: ProofFormula>(frames: &[Frame<F>]) -> Vec<CertificateStep<F>> {
    let mut depth = 0;
    let mut steps = Vec::new();
    for frame in frames {
        if let Frame::Implication { antecedent, .. } = frame {
            depth += 1;
            steps.push(step(ASSUME, Vec::new(), antecedent.clone(), depth));
        }
    }
    steps
}

/// Discharge frames innermost first; `proved` is the innermost target
fn close_frames<F: ProofFormula>(frames: &[Frame<F>], mut proved: F) -> Vec<CertificateStep<F>> {
    let mut depth = assumption_depth(frames);
    let mut steps = Vec::new();
    for frame in frames.iter().rev() {
        match frame {
            Frame::Implication { whole, .. } => {
                depth -= 1;
                steps.push(step(IMPLICATION_INTRO, vec![proved], whole.clone(), depth));
                proved = whole.clone();
            }
            Frame::Forall { instance, whole } => {
                debug_assert!(*instance == proved);
                steps.push(step(FORALL_INTRO, vec![proved], whole.clone(), depth));
                proved = whole.clone();
            }
        }
    }
    steps
}
