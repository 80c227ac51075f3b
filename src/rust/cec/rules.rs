// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cognitive and event-calculus rules
//!
//! Time is discrete: an event initiating a fluent at `t` makes it hold at
//! `t + 1`. Initiation and termination need a numeric timepoint; inertia
//! accepts any pair of timepoints ordered by [`time_le`].

use crate::formula::{ProofFormula, Term};
use crate::rules::{time_le, FnRule, RuleCategory, RuleContext, RuleRegistry};

use super::formula::{CecFormula, CognitiveOp, EventPredicate};

type Ctx = RuleContext<CecFormula>;

pub fn rules() -> Vec<FnRule<CecFormula>> {
    use RuleCategory::{Cognitive, EventCalculus};
    vec![
        FnRule::new("knowledge_truth", Cognitive, "K[a](φ) ⊢ φ", 1, true, knowledge_truth),
        FnRule::new("knowledge_to_belief", Cognitive, "K[a](φ) ⊢ B[a](φ)", 1, true, knowledge_to_belief),
        FnRule::new(
            "perception_to_knowledge",
            Cognitive,
            "S[a](φ) ⊢ K[a](φ)",
            1,
            true,
            perception_to_knowledge,
        ),
        FnRule::new("belief_k", Cognitive, "B[a](φ), B[a](φ → ψ) ⊢ B[a](ψ)", 2, true, belief_k),
        FnRule::new("knowledge_k", Cognitive, "K[a](φ), K[a](φ → ψ) ⊢ K[a](ψ)", 2, true, knowledge_k),
        FnRule::new(
            "belief_conjunction_elim",
            Cognitive,
            "B[a](φ ∧ ψ) ⊢ B[a](φ), B[a](ψ)",
            1,
            true,
            belief_conjunction_elim,
        ),
        FnRule::new("intention_to_desire", Cognitive, "I[a](φ) ⊢ D[a](φ)", 1, true, intention_to_desire),
        FnRule::new(
            "belief_consistency",
            Cognitive,
            "B[a](φ), B[a](¬φ) ⊢ ⊥",
            2,
            true,
            belief_consistency,
        ),
        FnRule::new(
            "intention_belief_conflict",
            Cognitive,
            "I[a](φ), B[a](¬φ) ⊢ ⊥",
            2,
            true,
            intention_belief_conflict,
        ),
        FnRule::new(
            "positive_introspection",
            Cognitive,
            "K[a](φ) ⊢ K[a](K[a](φ))",
            1,
            false,
            positive_introspection,
        ),
        FnRule::new(
            "ec_initiation",
            EventCalculus,
            "Happens(e, t), Initiates(e, f, t) ⊢ HoldsAt(f, t+1)",
            2,
            true,
            ec_initiation,
        ),
        FnRule::new(
            "ec_termination",
            EventCalculus,
            "Happens(e, t), Terminates(e, f, t) ⊢ ¬HoldsAt(f, t+1)",
            2,
            true,
            ec_termination,
        ),
        FnRule::new(
            "ec_inertia",
            EventCalculus,
            "HoldsAt(f, t1), ¬Clipped(t1, f, t2) ⊢ HoldsAt(f, t2)",
            2,
            true,
            ec_inertia,
        ),
    ]
}

impl RuleRegistry<CecFormula> {
    /// Basic rules plus the cognitive and event-calculus rules
    pub fn cec() -> Self {
        let mut registry = Self::with_basic_rules();
        registry.extend(rules());
        registry
    }
}

fn modal(f: &CecFormula, wanted: CognitiveOp) -> Option<(&Term, &CecFormula)> {
    match f.as_cognitive()? {
        (op, agent, body) if op == wanted => Some((agent, body)),
        _ => None,
    }
}

/// `from[a](φ) ⊢ to[a](φ)`
fn strengthen(p: &CecFormula, from: CognitiveOp, to: CognitiveOp) -> Vec<CecFormula> {
    match modal(p, from) {
        Some((agent, body)) => vec![CecFormula::cognitive(to, agent.clone(), body.clone())],
        None => Vec::new(),
    }
}

fn knowledge_truth(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    modal(p[0], CognitiveOp::Knowledge)
        .map(|(_, body)| vec![body.clone()])
        .unwrap_or_default()
}

fn knowledge_to_belief(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    strengthen(p[0], CognitiveOp::Knowledge, CognitiveOp::Belief)
}

fn perception_to_knowledge(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    strengthen(p[0], CognitiveOp::Perception, CognitiveOp::Knowledge)
}

fn intention_to_desire(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    strengthen(p[0], CognitiveOp::Intention, CognitiveOp::Desire)
}

fn distribution(p: &[&CecFormula], op: CognitiveOp) -> Vec<CecFormula> {
    let (Some((a1, fact)), Some((a2, rule))) = (modal(p[0], op), modal(p[1], op)) else {
        return Vec::new();
    };
    match rule.as_implies() {
        Some((antecedent, consequent)) if a1 == a2 && antecedent == fact => {
            vec![CecFormula::cognitive(op, a1.clone(), consequent.clone())]
        }
        _ => Vec::new(),
    }
}

fn belief_k(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    distribution(p, CognitiveOp::Belief)
}

fn knowledge_k(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    distribution(p, CognitiveOp::Knowledge)
}

fn belief_conjunction_elim(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    match modal(p[0], CognitiveOp::Belief) {
        Some((agent, body)) => match body.as_and() {
            Some((l, r)) => vec![
                CecFormula::cognitive(CognitiveOp::Belief, agent.clone(), l.clone()),
                CecFormula::cognitive(CognitiveOp::Belief, agent.clone(), r.clone()),
            ],
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

/// `first[a](φ), B[a](¬φ) ⊢ ⊥`
fn against_belief(p: &[&CecFormula], first: CognitiveOp) -> Vec<CecFormula> {
    match (modal(p[0], first), modal(p[1], CognitiveOp::Belief)) {
        (Some((a1, body)), Some((a2, negated))) if a1 == a2 && negated.as_not() == Some(body) => vec![CecFormula::False],
        _ => Vec::new(),
    }
}

fn belief_consistency(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    against_belief(p, CognitiveOp::Belief)
}

fn intention_belief_conflict(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    against_belief(p, CognitiveOp::Intention)
}

fn positive_introspection(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    match modal(p[0], CognitiveOp::Knowledge) {
        Some((agent, _)) => vec![CecFormula::cognitive(
            CognitiveOp::Knowledge,
            agent.clone(),
            p[0].clone(),
        )],
        None => Vec::new(),
    }
}

fn successor(t: &Term) -> Option<Term> {
    t.as_num().and_then(|n| n.checked_add(1)).map(Term::Num)
}

/// Fluent and next timepoint for a matching `Happens` / effect pair
fn effect(p: &[&CecFormula], kind: EventPredicate) -> Option<(Term, Term)> {
    let happens = p[0].as_event(EventPredicate::Happens)?;
    let effect = p[1].as_event(kind)?;
    if happens[0] != effect[0] || happens[1] != effect[2] {
        return None;
    }
    Some((effect[1].clone(), successor(&happens[1])?))
}

fn ec_initiation(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    match effect(p, EventPredicate::Initiates) {
        Some((fluent, next)) => vec![CecFormula::holds_at(fluent, next)],
        None => Vec::new(),
    }
}

fn ec_termination(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    match effect(p, EventPredicate::Terminates) {
        Some((fluent, next)) => vec![CecFormula::not(CecFormula::holds_at(fluent, next))],
        None => Vec::new(),
    }
}

fn ec_inertia(p: &[&CecFormula], _: &Ctx) -> Vec<CecFormula> {
    let Some(holds) = p[0].as_event(EventPredicate::HoldsAt) else {
        return Vec::new();
    };
    let Some(clipped) = p[1].as_not().and_then(|c| c.as_event(EventPredicate::Clipped)) else {
        return Vec::new();
    };
    let (fluent, t1) = (&holds[0], &holds[1]);
    if &clipped[0] == t1 && &clipped[1] == fluent && time_le(t1, &clipped[2]) && t1 != &clipped[2] {
        vec![CecFormula::holds_at(fluent.clone(), clipped[2].clone())]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cec::parse_cec;
    use crate::rules::InferenceRule;

    fn check(rule: &str, premises: &[&str], conclusion: &str) -> bool {
        let registry = RuleRegistry::cec();
        let premises: Vec<CecFormula> = premises.iter().map(|p| parse_cec(p).unwrap()).collect();
        let refs: Vec<&CecFormula> = premises.iter().collect();
        registry
            .get(rule)
            .unwrap()
            .check(&refs, &parse_cec(conclusion).unwrap())
    }

    #[test]
    fn test_registry_has_every_family() {
        let registry = RuleRegistry::cec();
        assert_eq!(registry.in_category(RuleCategory::Cognitive).len(), 10);
        assert_eq!(registry.in_category(RuleCategory::EventCalculus).len(), 3);
        assert!(registry.get("modus_ponens").is_some());
    }

    #[test]
    fn test_cognitive_rules() {
        assert!(check("knowledge_truth", &["K[Alice](Safe)"], "Safe"));
        assert!(check("knowledge_to_belief", &["K[Alice](Safe)"], "B[Alice](Safe)"));
        assert!(check("perception_to_knowledge", &["S[Alice](Raining)"], "K[Alice](Raining)"));
        assert!(check("belief_k", &["B[Alice](p)", "B[Alice](p → q)"], "B[Alice](q)"));
        assert!(!check("belief_k", &["B[Alice](p)", "B[Bob](p → q)"], "B[Bob](q)"));
        assert!(check("knowledge_k", &["K[Bob](p)", "K[Bob](p → q)"], "K[Bob](q)"));
        assert!(check("belief_conjunction_elim", &["B[Alice](p ∧ q)"], "B[Alice](q)"));
        assert!(check("intention_to_desire", &["I[Alice](Leave)"], "D[Alice](Leave)"));
        assert!(check("belief_consistency", &["B[Alice](p)", "B[Alice](¬p)"], "⊥"));
        assert!(check("intention_belief_conflict", &["I[Alice](Win)", "B[Alice](¬Win)"], "⊥"));
        assert!(check("positive_introspection", &["K[Alice](p)"], "K[Alice](K[Alice](p))"));
    }

    #[test]
    fn test_event_calculus_rules() {
        assert!(check(
            "ec_initiation",
            &["Happens(Open, 3)", "Initiates(Open, DoorOpen, 3)"],
            "HoldsAt(DoorOpen, 4)"
        ));
        assert!(!check(
            "ec_initiation",
            &["Happens(Open, 3)", "Initiates(Open, DoorOpen, 2)"],
            "HoldsAt(DoorOpen, 4)"
        ));
        assert!(check(
            "ec_termination",
            &["Happens(Close, 5)", "Terminates(Close, DoorOpen, 5)"],
            "¬HoldsAt(DoorOpen, 6)"
        ));
        assert!(check(
            "ec_inertia",
            &["HoldsAt(DoorOpen, 4)", "¬Clipped(4, DoorOpen, 9)"],
            "HoldsAt(DoorOpen, 9)"
        ));
        assert!(!check(
            "ec_inertia",
            &["HoldsAt(DoorOpen, 4)", "¬Clipped(4, DoorOpen, 2)"],
            "HoldsAt(DoorOpen, 2)"
        ));
    }
}
