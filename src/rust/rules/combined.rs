// SPDX-License-Identifier: PMPL-1.0-or-later

//! Rules mixing temporal windows with deontic modalities

use crate::formula::{DeonticOp, Formula, TemporalOp, Term};

use super::deontic::as_deontic;
use super::temporal::as_during;
use super::{num, windows_overlap, FnRule, RuleCategory, RuleContext};

type Ctx = RuleContext<Formula>;

pub fn rules() -> Vec<FnRule<Formula>> {
    use RuleCategory::Combined;
    vec![
        FnRule::new(
            "windowed_d_axiom",
            Combined,
            "DURING[a, b](O(φ)) ⊢ DURING[a, b](P(φ))",
            1,
            true,
            windowed_d_axiom,
        ),
        FnRule::new(
            "windowed_obligation_conflict",
            Combined,
            "DURING[a, b](O(φ)), DURING[c, d](F(φ)) ⊢ ⊥ when the windows overlap",
            2,
            true,
            windowed_obligation_conflict,
        ),
        FnRule::new(
            "windowed_permission_conflict",
            Combined,
            "DURING[a, b](P(φ)), DURING[c, d](F(φ)) ⊢ ⊥ when the windows overlap",
            2,
            true,
            windowed_permission_conflict,
        ),
        FnRule::new(
            "obligation_window_commute",
            Combined,
            "DURING[a, b](O(φ)) ⊣⊢ O(DURING[a, b](φ))",
            1,
            false,
            obligation_window_commute,
        ),
        FnRule::new(
            "deadline_weakening",
            Combined,
            "O(BEFORE[d](φ)) ⊢ O(BEFORE[d'](φ)) for d' ≥ d",
            1,
            true,
            deadline_weakening,
        ),
        FnRule::new(
            "deadline_conflict",
            Combined,
            "O(BEFORE[d](φ)), F(φ) ⊢ ⊥",
            2,
            true,
            deadline_conflict,
        ),
        FnRule::new(
            "windowed_obligation_mp",
            Combined,
            "DURING[a, b](O(φ)), DURING[a, b](O(φ → ψ)) ⊢ DURING[a, b](O(ψ))",
            2,
            true,
            windowed_obligation_mp,
        ),
    ]
}

/// `DURING[a, b](op[agent](body))`
fn windowed_norm(f: &Formula) -> Option<(&Term, &Term, DeonticOp, &Option<Term>, &Formula)> {
    let (a, b, inner) = as_during(f)?;
    let (op, agent, body) = as_deontic(inner)?;
    Some((a, b, op, agent, body))
}

fn windowed_d_axiom(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match windowed_norm(p[0]) {
        Some((a, b, DeonticOp::Obligation, agent, body)) => vec![Formula::during(
            a.clone(),
            b.clone(),
            Formula::permission(agent.clone(), body.clone()),
        )],
        _ => Vec::new(),
    }
}

fn windowed_conflict(p: &[&Formula], first: DeonticOp) -> Vec<Formula> {
    match (windowed_norm(p[0]), windowed_norm(p[1])) {
        (Some((a, b, op1, x1, b1)), Some((c, d, DeonticOp::Prohibition, x2, b2)))
            if op1 == first && x1 == x2 && b1 == b2 && windows_overlap(a, b, c, d) =>
        {
            vec![Formula::False]
        }
        _ => Vec::new(),
    }
}

fn windowed_obligation_conflict(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    windowed_conflict(p, DeonticOp::Obligation)
}

fn windowed_permission_conflict(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    windowed_conflict(p, DeonticOp::Permission)
}

fn obligation_window_commute(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    if let Some((a, b, DeonticOp::Obligation, agent, body)) = windowed_norm(p[0]) {
        return vec![Formula::obligation(
            agent.clone(),
            Formula::during(a.clone(), b.clone(), body.clone()),
        )];
    }
    match as_deontic(p[0]) {
        Some((DeonticOp::Obligation, agent, inner)) => match as_during(inner) {
            Some((a, b, body)) => vec![Formula::during(
                a.clone(),
                b.clone(),
                Formula::obligation(agent.clone(), body.clone()),
            )],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `O[agent](BEFORE[d](body))`
fn deadline(f: &Formula) -> Option<(&Option<Term>, &Term, &Formula)> {
    match as_deontic(f)? {
        (
            DeonticOp::Obligation,
            agent,
            Formula::Temporal {
                op: TemporalOp::Before(d),
                body,
            },
        ) => Some((agent, d, &**body)),
        _ => None,
    }
}

fn deadline_weakening(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((agent, d, body)) = deadline(p[0]) else {
        return Vec::new();
    };
    let Some(d) = num(d) else {
        return Vec::new();
    };
    ctx.numeric_timepoints()
        .into_iter()
        .filter(|&later| later > d)
        .map(|later| {
            Formula::obligation(agent.clone(), Formula::before(Term::Num(later), body.clone()))
        })
        .collect()
}

fn deadline_conflict(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match (deadline(p[0]), as_deontic(p[1])) {
        (Some((x1, _, body)), Some((DeonticOp::Prohibition, x2, forbidden)))
            if x1 == x2 && body == forbidden =>
        {
            vec![Formula::False]
        }
        _ => Vec::new(),
    }
}

fn windowed_obligation_mp(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let Some((a, b, DeonticOp::Obligation, agent, fact)) = windowed_norm(p[0]) else {
        return Vec::new();
    };
    // the conditional obligation may be windowed the same way or timeless
    let rule = match windowed_norm(p[1]) {
        Some((c, d, DeonticOp::Obligation, x, body)) if c == a && d == b => Some((x, body)),
        Some(_) => None,
        None => match as_deontic(p[1]) {
            Some((DeonticOp::Obligation, x, body)) => Some((x, body)),
            _ => None,
        },
    };
    match rule {
        Some((x, Formula::Implies(ante, cons))) if x == agent && **ante == *fact => {
            vec![Formula::during(
                a.clone(),
                b.clone(),
                Formula::obligation(agent.clone(), (**cons).clone()),
            )]
        }
        _ => Vec::new(),
    }
}
