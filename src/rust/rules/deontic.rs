// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deontic rules (standard deontic logic, agent-indexed)
//!
//! Two modalities interact only when they name the same agent, or both name
//! no agent.

use crate::formula::{DeonticOp, Formula, Term};

use super::{FnRule, RuleCategory, RuleContext};

type Ctx = RuleContext<Formula>;

pub fn rules() -> Vec<FnRule<Formula>> {
    use RuleCategory::Deontic;
    vec![
        FnRule::new("d_axiom", Deontic, "O(φ) ⊢ P(φ)", 1, true, d_axiom),
        FnRule::new(
            "obligation_prohibition_conflict",
            Deontic,
            "O(φ), F(φ) ⊢ ⊥",
            2,
            true,
            obligation_prohibition_conflict,
        ),
        FnRule::new(
            "permission_prohibition_conflict",
            Deontic,
            "P(φ), F(φ) ⊢ ⊥",
            2,
            true,
            permission_prohibition_conflict,
        ),
        FnRule::new(
            "prohibition_as_negated_permission",
            Deontic,
            "F(φ) ⊣⊢ ¬P(φ)",
            1,
            false,
            prohibition_as_negated_permission,
        ),
        FnRule::new(
            "obligation_negation_to_prohibition",
            Deontic,
            "O(¬φ) ⊢ F(φ)",
            1,
            true,
            obligation_negation_to_prohibition,
        ),
        FnRule::new(
            "prohibition_to_obligation_negation",
            Deontic,
            "F(φ) ⊢ O(¬φ)",
            1,
            false,
            prohibition_to_obligation_negation,
        ),
        FnRule::new(
            "obligation_conjunction_elim",
            Deontic,
            "O(φ ∧ ψ) ⊢ O(φ), O(ψ)",
            1,
            true,
            obligation_conjunction_elim,
        ),
        FnRule::new("obligation_k", Deontic, "O(φ), O(φ → ψ) ⊢ O(ψ)", 2, true, obligation_k),
        FnRule::new(
            "obligation_conjunction_intro",
            Deontic,
            "O(φ), O(ψ) ⊢ O(φ ∧ ψ)",
            2,
            false,
            obligation_conjunction_intro,
        ),
        FnRule::new(
            "permission_weakening",
            Deontic,
            "P(φ ∧ ψ) ⊢ P(φ), P(ψ)",
            1,
            true,
            permission_weakening,
        ),
    ]
}

pub(crate) fn as_deontic(f: &Formula) -> Option<(DeonticOp, &Option<Term>, &Formula)> {
    match f {
        Formula::Deontic { op, agent, body } => Some((*op, agent, &**body)),
        _ => None,
    }
}

fn as_op(f: &Formula, wanted: DeonticOp) -> Option<(&Option<Term>, &Formula)> {
    match as_deontic(f)? {
        (op, agent, body) if op == wanted => Some((agent, body)),
        _ => None,
    }
}

fn d_axiom(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match as_op(p[0], DeonticOp::Obligation) {
        Some((agent, body)) => vec![Formula::permission(agent.clone(), body.clone())],
        None => Vec::new(),
    }
}

fn opposed(p: &[&Formula], first: DeonticOp) -> Vec<Formula> {
    match (as_op(p[0], first), as_op(p[1], DeonticOp::Prohibition)) {
        (Some((a1, b1)), Some((a2, b2))) if a1 == a2 && b1 == b2 => vec![Formula::False],
        _ => Vec::new(),
    }
}

fn obligation_prohibition_conflict(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    opposed(p, DeonticOp::Obligation)
}

fn permission_prohibition_conflict(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    opposed(p, DeonticOp::Permission)
}

fn prohibition_as_negated_permission(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    if let Some((agent, body)) = as_op(p[0], DeonticOp::Prohibition) {
        return vec![Formula::not(Formula::permission(agent.clone(), body.clone()))];
    }
    match p[0] {
        Formula::Not(inner) => match as_op(inner, DeonticOp::Permission) {
            Some((agent, body)) => vec![Formula::prohibition(agent.clone(), body.clone())],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn obligation_negation_to_prohibition(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match as_op(p[0], DeonticOp::Obligation) {
        Some((agent, Formula::Not(body))) => {
            vec![Formula::prohibition(agent.clone(), (**body).clone())]
        }
        _ => Vec::new(),
    }
}

fn prohibition_to_obligation_negation(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match as_op(p[0], DeonticOp::Prohibition) {
        Some((agent, body)) => vec![Formula::obligation(agent.clone(), Formula::not(body.clone()))],
        None => Vec::new(),
    }
}

fn obligation_conjunction_elim(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match as_op(p[0], DeonticOp::Obligation) {
        Some((agent, Formula::And(l, r))) => vec![
            Formula::obligation(agent.clone(), (**l).clone()),
            Formula::obligation(agent.clone(), (**r).clone()),
        ],
        _ => Vec::new(),
    }
}

fn obligation_k(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match (as_op(p[0], DeonticOp::Obligation), as_op(p[1], DeonticOp::Obligation)) {
        (Some((a1, fact)), Some((a2, Formula::Implies(ante, cons)))) if a1 == a2 && **ante == *fact => {
            vec![Formula::obligation(a1.clone(), (**cons).clone())]
        }
        _ => Vec::new(),
    }
}

fn obligation_conjunction_intro(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match (as_op(p[0], DeonticOp::Obligation), as_op(p[1], DeonticOp::Obligation)) {
        (Some((a1, l)), Some((a2, r))) if a1 == a2 => {
            vec![Formula::obligation(a1.clone(), Formula::and(l.clone(), r.clone()))]
        }
        _ => Vec::new(),
    }
}

fn permission_weakening(p: &[&Formula], _: &Ctx) -> Vec<Formula> {
    match as_op(p[0], DeonticOp::Permission) {
        Some((agent, Formula::And(l, r))) => vec![
            Formula::permission(agent.clone(), (**l).clone()),
            Formula::permission(agent.clone(), (**r).clone()),
        ],
        _ => Vec::new(),
    }
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
    fn test_d_axiom_keeps_agent() {
        assert!(check("d_axiom", &["O[Alice](pay)"], "P[Alice](pay)"));
        assert!(!check("d_axiom", &["O[Alice](pay)"], "P[Bob](pay)"));
        assert!(check("d_axiom", &["OBLIGATION(pay)"], "PERMISSION(pay)"));
    }

    #[test]
    fn test_conflicts_require_same_agent() {
        assert!(check("obligation_prohibition_conflict", &["O[A](pay)", "F[A](pay)"], "⊥"));
        assert!(!check("obligation_prohibition_conflict", &["O[A](pay)", "F[B](pay)"], "⊥"));
        assert!(check("permission_prohibition_conflict", &["P[A](pay)", "F[A](pay)"], "⊥"));
    }

    #[test]
    fn test_prohibition_equivalences() {
        assert!(check("prohibition_as_negated_permission", &["F[A](smoke)"], "¬P[A](smoke)"));
        assert!(check("prohibition_as_negated_permission", &["¬P[A](smoke)"], "F[A](smoke)"));
        assert!(check("obligation_negation_to_prohibition", &["O[A](¬smoke)"], "F[A](smoke)"));
        assert!(check("prohibition_to_obligation_negation", &["F[A](smoke)"], "O[A](¬smoke)"));
    }

    #[test]
    fn test_obligation_closure() {
        assert!(check("obligation_conjunction_elim", &["O[A](pay ∧ file)"], "O[A](file)"));
        assert!(check("obligation_k", &["O[A](pay)", "O[A](pay → receipt)"], "O[A](receipt)"));
        assert!(!check("obligation_k", &["O[B](pay)", "O[A](pay → receipt)"], "O[A](receipt)"));
        assert!(check(
            "obligation_conjunction_intro",
            &["O[A](pay)", "O[A](file)"],
            "O[A](pay ∧ file)"
        ));
        assert!(check("permission_weakening", &["P[A](walk ∧ talk)"], "P[A](talk)"));
    }
}
