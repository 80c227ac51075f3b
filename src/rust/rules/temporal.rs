// SPDX-License-Identifier: PMPL-1.0-or-later

//! Temporal rules
//!
//! Timepoints are absolute. `BEFORE[t](φ)` holds when φ holds at some point
//! strictly before `t`, `AFTER[t](φ)` at some point strictly after `t`, and
//! `DURING[a, b](φ)` at every point of the closed interval. Rules that move a
//! bound only use integer timepoints taken from the rule context.

use crate::formula::{Formula, TemporalOp, Term};

use super::{num, time_le, FnRule, RuleCategory, RuleContext};

type Ctx = RuleContext<Formula>;

pub fn rules() -> Vec<FnRule<Formula>> {
    use RuleCategory::Temporal;
    vec![
        FnRule::new(
            "before_weakening",
            Temporal,
            "BEFORE[t](φ) ⊢ BEFORE[t'](φ) for t' ≥ t",
            1,
            true,
            before_weakening,
        ),
        FnRule::new(
            "after_weakening",
            Temporal,
            "AFTER[t](φ) ⊢ AFTER[t'](φ) for t' ≤ t",
            1,
            true,
            after_weakening,
        ),
        FnRule::new(
            "before_transitivity",
            Temporal,
            "BEFORE[t1](BEFORE[t2](φ)) ⊢ BEFORE[max(t1, t2)](φ)",
            1,
            true,
            before_transitivity,
        ),
        FnRule::new(
            "after_transitivity",
            Temporal,
            "AFTER[t1](AFTER[t2](φ)) ⊢ AFTER[min(t1, t2)](φ)",
            1,
            true,
            after_transitivity,
        ),
        FnRule::new(
            "during_subinterval",
            Temporal,
            "DURING[a, b](φ) ⊢ DURING[c, d](φ) for a ≤ c ≤ d ≤ b",
            1,
            true,
            during_subinterval,
        ),
        FnRule::new(
            "during_merge",
            Temporal,
            "DURING[a, b](φ), DURING[c, d](φ) ⊢ DURING[a, max(b, d)](φ) for a ≤ c ≤ b + 1",
            2,
            true,
            during_merge,
        ),
        FnRule::new(
            "during_distribution",
            Temporal,
            "DURING[a, b](φ ∧ ψ) ⊢ DURING[a, b](φ), DURING[a, b](ψ)",
            1,
            true,
            during_distribution,
        ),
        FnRule::new(
            "during_conjunction",
            Temporal,
            "DURING[a, b](φ), DURING[a, b](ψ) ⊢ DURING[a, b](φ ∧ ψ)",
            2,
            false,
            during_conjunction,
        ),
        FnRule::new(
            "temporal_modus_ponens",
            Temporal,
            "DURING[a, b](φ), DURING[a, b](φ → ψ) ⊢ DURING[a, b](ψ)",
            2,
            true,
            temporal_modus_ponens,
        ),
        FnRule::new(
            "during_to_before",
            Temporal,
            "DURING[a, b](φ) ⊢ BEFORE[t](φ) for t > a",
            1,
            true,
            during_to_before,
        ),
        FnRule::new(
            "during_to_after",
            Temporal,
            "DURING[a, b](φ) ⊢ AFTER[t](φ) for t < b",
            1,
            true,
            during_to_after,
        ),
    ]
}

fn as_temporal(f: &Formula) -> Option<(&TemporalOp, &Formula)> {
    match f {
        Formula::Temporal { op, body } => Some((op, &**body)),
        _ => None,
    }
}

fn as_before(f: &Formula) -> Option<(&Term, &Formula)> {
    match as_temporal(f)? {
        (TemporalOp::Before(t), body) => Some((t, body)),
        _ => None,
    }
}

fn as_after(f: &Formula) -> Option<(&Term, &Formula)> {
    match as_temporal(f)? {
        (TemporalOp::After(t), body) => Some((t, body)),
        _ => None,
    }
}

pub(crate) fn as_during(f: &Formula) -> Option<(&Term, &Term, &Formula)> {
    match as_temporal(f)? {
        (TemporalOp::During(a, b), body) => Some((a, b, body)),
        _ => None,
    }
}

fn before_weakening(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((t, body)) = as_before(p[0]) else {
        return Vec::new();
    };
    let Some(t) = num(t) else {
        return Vec::new();
    };
    ctx.numeric_timepoints()
        .into_iter()
        .filter(|&u| u > t)
        .map(|u| Formula::before(Term::Num(u), body.clone()))
        .collect()
}

fn after_weakening(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((t, body)) = as_after(p[0]) else {
        return Vec::new();
    };
    let Some(t) = num(t) else {
        return Vec::new();
    };
    ctx.numeric_timepoints()
        .into_iter()
        .filter(|&u| u < t)
        .map(|u| Formula::after(Term::Num(u), body.clone()))
        .collect()
}

fn before_transitivity(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let Some((outer, mid)) = as_before(p[0]) else {
        return Vec::new();
    };
    let Some((inner, body)) = as_before(mid) else {
        return Vec::new();
    };
    let bound = if time_le(outer, inner) {
        inner
    } else if time_le(inner, outer) {
        outer
    } else {
        return Vec::new();
    };
    vec![Formula::before(bound.clone(), body.clone())]
}

fn after_transitivity(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let Some((outer, mid)) = as_after(p[0]) else {
        return Vec::new();
    };
    let Some((inner, body)) = as_after(mid) else {
        return Vec::new();
    };
    let bound = if time_le(outer, inner) {
        outer
    } else if time_le(inner, outer) {
        inner
    } else {
        return Vec::new();
    };
    vec![Formula::after(bound.clone(), body.clone())]
}

fn during_subinterval(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((a, b, body)) = as_during(p[0]) else {
        return Vec::new();
    };
    let (Some(a), Some(b)) = (num(a), num(b)) else {
        return Vec::new();
    };
    let points: Vec<i64> = ctx
        .numeric_timepoints()
        .into_iter()
        .chain([a, b])
        .filter(|&t| a <= t && t <= b)
        .collect();
    let mut out = Vec::new();
    for &c in &points {
        for &d in &points {
            if c <= d && (c, d) != (a, b) {
                let f = Formula::during(Term::Num(c), Term::Num(d), body.clone());
                if !out.contains(&f) {
                    out.push(f);
                }
            }
        }
    }
    out
}

fn during_merge(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let (Some((a, b, left)), Some((c, d, right))) = (as_during(p[0]), as_during(p[1])) else {
        return Vec::new();
    };
    if left != right {
        return Vec::new();
    }
    let (Some(a), Some(b), Some(c), Some(d)) = (num(a), num(b), num(c), num(d)) else {
        return Vec::new();
    };
    if a <= c && c <= b.saturating_add(1) && d > b {
        vec![Formula::during(Term::Num(a), Term::Num(d), left.clone())]
    } else {
        Vec::new()
    }
}

fn during_distribution(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let Some((a, b, body)) = as_during(p[0]) else {
        return Vec::new();
    };
    match body {
        Formula::And(l, r) => vec![
            Formula::during(a.clone(), b.clone(), (**l).clone()),
            Formula::during(a.clone(), b.clone(), (**r).clone()),
        ],
        _ => Vec::new(),
    }
}

fn during_conjunction(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match (as_during(p[0]), as_during(p[1])) {
        (Some((a, b, l)), Some((c, d, r))) if a == c && b == d => {
            vec![Formula::during(a.clone(), b.clone(), Formula::and(l.clone(), r.clone()))]
        }
        _ => Vec::new(),
    }
}

fn temporal_modus_ponens(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    let Some((a, b, fact)) = as_during(p[0]) else {
        return Vec::new();
    };
    // a timeless implication applies at every point of the window
    let rule = match as_during(p[1]) {
        Some((c, d, inner)) if c == a && d == b => inner,
        Some(_) => return Vec::new(),
        None => p[1],
    };
    match rule {
        Formula::Implies(ante, cons) if **ante == *fact => {
            vec![Formula::during(a.clone(), b.clone(), (**cons).clone())]
        }
        _ => Vec::new(),
    }
}

fn during_to_before(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((a, b, body)) = as_during(p[0]) else {
        return Vec::new();
    };
    let (Some(a), Some(b)) = (num(a), num(b)) else {
        return Vec::new();
    };
    if a > b {
        return Vec::new();
    }
    ctx.numeric_timepoints()
        .into_iter()
        .filter(|&t| t > a)
        .map(|t| Formula::before(Term::Num(t), body.clone()))
        .collect()
}

fn during_to_after(p: &[&Formula], ctx: &Ctx) -> Vec<Formula> {
    let Some((a, b, body)) = as_during(p[0]) else {
        return Vec::new();
    };
    let (Some(a), Some(b)) = (num(a), num(b)) else {
        return Vec::new();
    };
    if a > b {
        return Vec::new();
    }
    ctx.numeric_timepoints()
        .into_iter()
        .filter(|&t| t < b)
        .map(|t| Formula::after(Term::Num(t), body.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::rules::{InferenceRule, RuleRegistry};

    fn check(rule: &str, premises: &[&str], conclusion: &str) -> bool {
        let reg = RuleRegistry::tdfol();
        let premises: Vec<Formula> = premises.iter().map(|p| parse(p).unwrap()).collect();
        let refs: Vec<&Formula> = premises.iter().collect();
        reg.get(rule).unwrap().check(&refs, &parse(conclusion).unwrap())
    }

    #[test]
    fn test_weakening_moves_bounds_outward() {
        assert!(check("before_weakening", &["BEFORE[5](p)"], "BEFORE[9](p)"));
        assert!(!check("before_weakening", &["BEFORE[5](p)"], "BEFORE[3](p)"));
        assert!(check("after_weakening", &["AFTER[5](p)"], "AFTER[2](p)"));
        assert!(!check("after_weakening", &["AFTER[5](p)"], "AFTER[8](p)"));
    }

    #[test]
    fn test_nested_transitivity() {
        assert!(check("before_transitivity", &["BEFORE[3](BEFORE[7](p))"], "BEFORE[7](p)"));
        assert!(check("after_transitivity", &["AFTER[3](AFTER[7](p))"], "AFTER[3](p)"));
        assert!(check("before_transitivity", &["BEFORE[T](BEFORE[T](p))"], "BEFORE[T](p)"));
        assert!(!check("before_transitivity", &["BEFORE[T](BEFORE[U](p))"], "BEFORE[U](p)"));
    }

    #[test]
    fn test_window_rules() {
        assert!(check("during_subinterval", &["DURING[1, 10](p)"], "DURING[3, 4](p)"));
        assert!(!check("during_subinterval", &["DURING[1, 10](p)"], "DURING[0, 4](p)"));
        assert!(check(
            "during_merge",
            &["DURING[1, 5](p)", "DURING[6, 9](p)"],
            "DURING[1, 9](p)"
        ));
        assert!(!check(
            "during_merge",
            &["DURING[1, 5](p)", "DURING[7, 9](p)"],
            "DURING[1, 9](p)"
        ));
        assert!(check("during_distribution", &["DURING[1, 5](p ∧ q)"], "DURING[1, 5](q)"));
        assert!(check(
            "during_conjunction",
            &["DURING[1, 5](p)", "DURING[1, 5](q)"],
            "DURING[1, 5](p ∧ q)"
        ));
    }

    #[test]
    fn test_temporal_modus_ponens() {
        assert!(check(
            "temporal_modus_ponens",
            &["DURING[1, 5](p)", "DURING[1, 5](p → q)"],
            "DURING[1, 5](q)"
        ));
        assert!(check(
            "temporal_modus_ponens",
            &["DURING[1, 5](p)", "p → q"],
            "DURING[1, 5](q)"
        ));
        assert!(!check(
            "temporal_modus_ponens",
            &["DURING[1, 5](p)", "DURING[2, 5](p → q)"],
            "DURING[1, 5](q)"
        ));
    }

    #[test]
    fn test_window_to_point_operators() {
        assert!(check("during_to_before", &["DURING[2, 6](p)"], "BEFORE[3](p)"));
        assert!(!check("during_to_before", &["DURING[2, 6](p)"], "BEFORE[2](p)"));
        assert!(check("during_to_after", &["DURING[2, 6](p)"], "AFTER[5](p)"));
        assert!(!check("during_to_after", &["DURING[2, 6](p)"], "AFTER[6](p)"));
    }
}
