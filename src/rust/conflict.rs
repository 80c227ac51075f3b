// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deontic conflict detection
//!
//! Each formula of a knowledge base is read as a norm: an optional guard,
//! an optional `DURING` window, a deontic operator, an agent and a body.
//! Two norms conflict when they address the same agent, have alpha-equivalent
//! bodies and opposing operators (`O`/`F`, `P`/`F`; `O(¬φ)` counts as `F(φ)`).
//! Resolution strategies are advisory only.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::formula::{DeonticOp, Formula, ProofFormula, TemporalOp, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Unconditional obligation against prohibition
    Direct,
    /// Permission against prohibition
    Permission,
    /// Opposing norms under the same guard
    Conditional,
    /// Opposing norms whose windows overlap
    Temporal,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::Direct => "direct",
            ConflictKind::Permission => "permission",
            ConflictKind::Conditional => "conditional",
            ConflictKind::Temporal => "temporal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// One level down, saturating at `Low`
    pub fn lowered(self) -> Severity {
        match self {
            Severity::High => Severity::Medium,
            Severity::Medium | Severity::Low => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// Advisory way of resolving a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// The norm from the higher authority prevails
    LexSuperior,
    /// The later norm prevails
    LexPosterior,
    /// The more specific norm prevails
    LexSpecialis,
    /// Split the overlapping window between the norms
    TemporalPartition,
    /// Establish which agent each norm addresses
    AgentClarification,
    HumanReview,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionStrategy::LexSuperior => "lex superior",
            ResolutionStrategy::LexPosterior => "lex posterior",
            ResolutionStrategy::LexSpecialis => "lex specialis",
            ResolutionStrategy::TemporalPartition => "temporal partition",
            ResolutionStrategy::AgentClarification => "agent clarification",
            ResolutionStrategy::HumanReview => "human review",
        };
        write!(f, "{}", s)
    }
}

/// A pair of opposing norms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    /// Positions of the two formulas in the checked knowledge base
    pub indices: (usize, usize),
    pub formulas: (Formula, Formula),
    pub agent: Option<Term>,
    /// Shared window for temporal conflicts
    pub overlap: Option<(Term, Term)>,
    pub strategies: Vec<ResolutionStrategy>,
    pub description: String,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] #{} vs #{}: {}",
            self.kind, self.severity, self.indices.0, self.indices.1, self.description
        )
    }
}

/// A formula read as a norm
#[derive(Debug, Clone)]
struct Norm {
    guard: Option<Formula>,
    window: Option<(Term, Term)>,
    op: DeonticOp,
    agent: Option<Term>,
    body: Formula,
}

impl Norm {
    fn extract(formula: &Formula) -> Option<Norm> {
        let (_, mut current) = formula.strip_foralls();
        let mut guard = None;
        let mut window = None;

        if let Formula::Implies(g, rest) = current {
            guard = Some((**g).clone());
            current = &**rest;
        }
        if let Formula::Temporal {
            op: TemporalOp::During(a, b),
            body,
        } = current
        {
            window = Some((a.clone(), b.clone()));
            current = &**body;
        }
        let Formula::Deontic { op, agent, body } = current else {
            return None;
        };
        let mut body = &**body;
        if window.is_none() {
            if let Formula::Temporal {
                op: TemporalOp::During(a, b),
                body: inner,
            } = body
            {
                window = Some((a.clone(), b.clone()));
                body = &**inner;
            }
        }
        let (op, body) = match (op, body) {
            (DeonticOp::Obligation, Formula::Not(inner)) => (DeonticOp::Prohibition, (**inner).clone()),
            (op, body) => (*op, body.clone()),
        };
        Some(Norm {
            guard,
            window,
            op,
            agent: agent.clone(),
            body,
        })
    }
}

/// Closed integer window length, `None` for symbolic bounds
fn window_len(window: &(Term, Term)) -> Option<i64> {
    Some(window.1.as_num()? - window.0.as_num()? + 1)
}

/// Intersection of two windows; symbolic windows only meet when identical
fn intersect(x: &(Term, Term), y: &(Term, Term)) -> Option<(Term, Term)> {
    match (x.0.as_num(), x.1.as_num(), y.0.as_num(), y.1.as_num()) {
        (Some(a), Some(b), Some(c), Some(d)) => {
            let (lo, hi) = (a.max(c), b.min(d));
            (lo <= hi).then(|| (Term::Num(lo), Term::Num(hi)))
        }
        _ => (x == y).then(|| x.clone()),
    }
}

/// Pairwise conflict detector over a knowledge base
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    /// Also flag norms where only one side carries a guard
    pub flag_one_sided_guards: bool,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        ConflictDetector {
            flag_one_sided_guards: true,
        }
    }
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&self, formulas: &[Formula]) -> Vec<Conflict> {
        let norms: Vec<(usize, Norm)> = formulas
            .iter()
            .enumerate()
            .filter_map(|(i, f)| Norm::extract(f).map(|n| (i, n)))
            .collect();
        debug!(formulas = formulas.len(), norms = norms.len(), "checking norms");

        let mut conflicts = Vec::new();
        for (a, (i, left)) in norms.iter().enumerate() {
            for (j, right) in norms.iter().skip(a + 1) {
                if let Some(conflict) = self.compare(left, right) {
                    conflicts.push(Conflict {
                        indices: (*i, *j),
                        formulas: (formulas[*i].clone(), formulas[*j].clone()),
                        ..conflict
                    });
                }
            }
        }
        conflicts
    }

    fn compare(&self, x: &Norm, y: &Norm) -> Option<Conflict> {
        if x.agent != y.agent || !x.body.alpha_eq(&y.body) {
            return None;
        }
        let (kind, mut severity) = match (x.op, y.op) {
            (DeonticOp::Obligation, DeonticOp::Prohibition) | (DeonticOp::Prohibition, DeonticOp::Obligation) => {
                (ConflictKind::Direct, Severity::High)
            }
            (DeonticOp::Permission, DeonticOp::Prohibition) | (DeonticOp::Prohibition, DeonticOp::Permission) => {
                (ConflictKind::Permission, Severity::Medium)
            }
            _ => return None,
        };
        let base = kind;

        let overlap = match (&x.window, &y.window) {
            (Some(wx), Some(wy)) => Some(intersect(wx, wy)?),
            (Some(w), None) | (None, Some(w)) => Some(w.clone()),
            (None, None) => None,
        };

        let guarded = match (&x.guard, &y.guard) {
            (Some(gx), Some(gy)) => {
                if !gx.alpha_eq(gy) {
                    return None;
                }
                true
            }
            (Some(_), None) | (None, Some(_)) => {
                if !self.flag_one_sided_guards {
                    return None;
                }
                true
            }
            (None, None) => false,
        };

        let kind = if guarded {
            severity = severity.lowered();
            ConflictKind::Conditional
        } else if let Some(shared) = &overlap {
            let shorter = [&x.window, &y.window]
                .into_iter()
                .flatten()
                .filter_map(window_len)
                .min();
            if let (Some(shorter), Some(shared_len)) = (shorter, window_len(shared)) {
                if shared_len * 2 < shorter {
                    severity = severity.lowered();
                }
            }
            ConflictKind::Temporal
        } else {
            kind
        };

        let mut strategies = match kind {
            ConflictKind::Direct => vec![
                ResolutionStrategy::LexSuperior,
                ResolutionStrategy::LexPosterior,
                ResolutionStrategy::LexSpecialis,
            ],
            ConflictKind::Permission => vec![ResolutionStrategy::LexSpecialis, ResolutionStrategy::LexPosterior],
            ConflictKind::Conditional => vec![ResolutionStrategy::LexSpecialis, ResolutionStrategy::LexSuperior],
            ConflictKind::Temporal => vec![ResolutionStrategy::TemporalPartition, ResolutionStrategy::LexPosterior],
        };
        if x.agent.is_none() {
            strategies.push(ResolutionStrategy::AgentClarification);
        }
        if severity == Severity::High {
            strategies.push(ResolutionStrategy::HumanReview);
        }

        let who = x
            .agent
            .as_ref()
            .map(|a| format!(" for {}", a))
            .unwrap_or_default();
        let what = match base {
            ConflictKind::Permission => "permitted and forbidden",
            _ => "obligatory and forbidden",
        };
        let mut description = format!("{} is {}{}", x.body, what, who);
        if let Some((lo, hi)) = &overlap {
            description.push_str(&format!(" during [{}, {}]", lo, hi));
        }
        if let Some(g) = x.guard.as_ref().or(y.guard.as_ref()) {
            description.push_str(&format!(" when {}", g));
        }

        Some(Conflict {
            kind,
            severity,
            indices: (0, 0),
            formulas: (Formula::True, Formula::True),
            agent: x.agent.clone(),
            overlap: if kind == ConflictKind::Temporal { overlap } else { None },
            strategies,
            description,
        })
    }
}

/// Conflicts in `formulas` with the default detector settings
pub fn detect_conflicts(formulas: &[Formula]) -> Vec<Conflict> {
    ConflictDetector::new().detect(formulas)
}
