// SPDX-License-Identifier: PMPL-1.0-or-later

//! Propositional and first-order rules shared by every dialect

use std::collections::BTreeSet;

use crate::formula::{ProofFormula, Quantifier, Substitution, Term};

use super::{FnRule, RuleCategory, RuleContext};

/// The basic rule set, in declaration order
pub fn rules<F: ProofFormula>() -> Vec<FnRule<F>> {
    use RuleCategory::Basic;
    vec![
        FnRule::new("modus_ponens", Basic, "φ, φ → ψ ⊢ ψ", 2, true, modus_ponens::<F>),
        FnRule::new("modus_tollens", Basic, "φ → ψ, ¬ψ ⊢ ¬φ", 2, true, modus_tollens::<F>),
        FnRule::new(
            "hypothetical_syllogism",
            Basic,
            "φ → ψ, ψ → χ ⊢ φ → χ",
            2,
            false,
            hypothetical_syllogism::<F>,
        ),
        FnRule::new("conjunction_intro", Basic, "φ, ψ ⊢ φ ∧ ψ", 2, false, conjunction_intro::<F>),
        FnRule::new("conjunction_elim", Basic, "φ ∧ ψ ⊢ φ, ψ", 1, true, conjunction_elim::<F>),
        FnRule::new("disjunction_intro", Basic, "φ ⊢ φ ∨ ψ", 1, false, disjunction_intro::<F>),
        FnRule::new(
            "disjunctive_syllogism",
            Basic,
            "φ ∨ ψ, ¬φ ⊢ ψ",
            2,
            true,
            disjunctive_syllogism::<F>,
        ),
        FnRule::new("double_negation_elim", Basic, "¬¬φ ⊢ φ", 1, true, double_negation_elim::<F>),
        FnRule::new("de_morgan_and", Basic, "¬(φ ∧ ψ) ⊢ ¬φ ∨ ¬ψ", 1, true, de_morgan_and::<F>),
        FnRule::new("de_morgan_or", Basic, "¬(φ ∨ ψ) ⊢ ¬φ ∧ ¬ψ", 1, true, de_morgan_or::<F>),
        FnRule::new(
            "biconditional_intro",
            Basic,
            "φ → ψ, ψ → φ ⊢ φ ↔ ψ",
            2,
            false,
            biconditional_intro::<F>,
        ),
        FnRule::new(
            "biconditional_elim",
            Basic,
            "φ ↔ ψ ⊢ φ → ψ, ψ → φ",
            1,
            true,
            biconditional_elim::<F>,
        ),
        FnRule::new("contraposition", Basic, "φ → ψ ⊢ ¬ψ → ¬φ", 1, false, contraposition::<F>),
        FnRule::new(
            "material_implication",
            Basic,
            "φ → ψ ⊣⊢ ¬φ ∨ ψ",
            1,
            false,
            material_implication::<F>,
        ),
        FnRule::new("contradiction", Basic, "φ, ¬φ ⊢ ⊥", 2, true, contradiction::<F>),
        FnRule::new(
            "universal_instantiation",
            Basic,
            "∀x. φ ⊢ φ[x := t]",
            1,
            true,
            universal_instantiation::<F>,
        ),
        FnRule::new(
            "universal_modus_ponens",
            Basic,
            "∀x̄. φ → ψ, φσ ⊢ ψσ",
            2,
            true,
            universal_modus_ponens::<F>,
        ),
        FnRule::new(
            "existential_generalization",
            Basic,
            "φ[x := t] ⊢ ∃x. φ",
            1,
            false,
            existential_generalization::<F>,
        ),
        FnRule::new("identity", Basic, "⊢ φ → φ", 0, true, identity::<F>),
        FnRule::new("excluded_middle", Basic, "⊢ φ ∨ ¬φ", 0, true, excluded_middle::<F>),
        FnRule::new(
            "biconditional_reflexivity",
            Basic,
            "⊢ φ ↔ φ",
            0,
            true,
            biconditional_reflexivity::<F>,
        ),
        FnRule::new("verum", Basic, "⊢ ⊤", 0, true, verum::<F>),
    ]
}

fn modus_ponens<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[1].as_implies() {
        Some((ante, cons)) if ante == p[0] => vec![cons.clone()],
        _ => Vec::new(),
    }
}

fn modus_tollens<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match (p[0].as_implies(), p[1].as_not()) {
        (Some((ante, cons)), Some(neg)) if neg == cons => vec![ante.negate()],
        _ => Vec::new(),
    }
}

fn hypothetical_syllogism<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match (p[0].as_implies(), p[1].as_implies()) {
        (Some((a, b)), Some((c, d))) if b == c => vec![F::implication(a.clone(), d.clone())],
        _ => Vec::new(),
    }
}

fn conjunction_intro<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    vec![F::conjunction(p[0].clone(), p[1].clone())]
}

fn conjunction_elim<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_and() {
        Some((a, b)) => vec![a.clone(), b.clone()],
        None => Vec::new(),
    }
}

fn disjunction_intro<F: ProofFormula>(p: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    ctx.relevant()
        .filter(|f| matches!(f.as_or(), Some((a, b)) if a == p[0] || b == p[0]))
        .cloned()
        .collect()
}

fn disjunctive_syllogism<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    let (Some((a, b)), Some(neg)) = (p[0].as_or(), p[1].as_not()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if neg == a {
        out.push(b.clone());
    }
    if neg == b {
        out.push(a.clone());
    }
    out
}

fn double_negation_elim<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_not().and_then(|inner| inner.as_not()) {
        Some(body) => vec![body.clone()],
        None => Vec::new(),
    }
}

fn de_morgan_and<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_not().and_then(|inner| inner.as_and()) {
        Some((a, b)) => vec![F::disjunction(a.negate(), b.negate())],
        None => Vec::new(),
    }
}

fn de_morgan_or<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_not().and_then(|inner| inner.as_or()) {
        Some((a, b)) => vec![F::conjunction(a.negate(), b.negate())],
        None => Vec::new(),
    }
}

fn biconditional_intro<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match (p[0].as_implies(), p[1].as_implies()) {
        (Some((a, b)), Some((c, d))) if a == d && b == c => {
            vec![F::biconditional(a.clone(), b.clone())]
        }
        _ => Vec::new(),
    }
}

fn biconditional_elim<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_iff() {
        Some((a, b)) => vec![
            F::implication(a.clone(), b.clone()),
            F::implication(b.clone(), a.clone()),
        ],
        None => Vec::new(),
    }
}

fn contraposition<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[0].as_implies() {
        Some((a, b)) => vec![F::implication(b.negate(), a.negate())],
        None => Vec::new(),
    }
}

fn material_implication<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    if let Some((a, b)) = p[0].as_implies() {
        return vec![F::disjunction(a.negate(), b.clone())];
    }
    match p[0].as_or() {
        Some((a, b)) => match a.as_not() {
            Some(na) => vec![F::implication(na.clone(), b.clone())],
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

fn contradiction<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    match p[1].as_not() {
        Some(neg) if neg == p[0] => vec![F::falsum()],
        _ => Vec::new(),
    }
}

fn universal_instantiation<F: ProofFormula>(p: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    match p[0].as_quantified() {
        Some((Quantifier::Forall, var, _, body)) => {
            ctx.terms().map(|t| body.substitute(var, t)).collect()
        }
        _ => Vec::new(),
    }
}

/// Rename the quantified variables of a pattern apart from everything else
pub(crate) fn rename_apart<F: ProofFormula>(vars: &[String], body: &F) -> (BTreeSet<String>, F) {
    let mut flexible = BTreeSet::new();
    let mut renamed = body.clone();
    for v in vars {
        let primed = format!("{}'", v);
        renamed = renamed.substitute(v, &Term::Var(primed.clone()));
        flexible.insert(primed);
    }
    (flexible, renamed)
}

fn universal_modus_ponens<F: ProofFormula>(p: &[&F], _: &RuleContext<F>) -> Vec<F> {
    let (vars, body) = p[0].strip_foralls();
    if vars.is_empty() {
        return Vec::new();
    }
    let (flexible, pattern) = rename_apart(&vars, body);
    let Some((ante, cons)) = pattern.as_implies() else {
        return Vec::new();
    };
    let mut subst = Substitution::new();
    let is_flexible = |v: &str| flexible.contains(v);
    if !ante.unify_with(p[1], &mut subst, &is_flexible) {
        return Vec::new();
    }
    let conclusion = cons.apply_subst(&subst);
    if conclusion.free_vars().iter().any(|v| flexible.contains(v)) {
        return Vec::new();
    }
    vec![conclusion]
}

fn existential_generalization<F: ProofFormula>(p: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    ctx.relevant()
        .filter(|candidate| {
            let Some((Quantifier::Exists, var, _, body)) = candidate.as_quantified() else {
                return false;
            };
            let (flexible, pattern) = rename_apart(&[var.to_string()], body);
            let mut subst = Substitution::new();
            let is_flexible = |v: &str| flexible.contains(v);
            pattern.unify_with(p[0], &mut subst, &is_flexible)
        })
        .cloned()
        .collect()
}

fn identity<F: ProofFormula>(_: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    ctx.relevant()
        .filter(|f| matches!(f.as_implies(), Some((a, b)) if a == b))
        .cloned()
        .collect()
}

fn excluded_middle<F: ProofFormula>(_: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    ctx.relevant()
        .filter(|f| match f.as_or() {
            Some((a, b)) => a.as_not() == Some(b) || b.as_not() == Some(a),
            None => false,
        })
        .cloned()
        .collect()
}

fn biconditional_reflexivity<F: ProofFormula>(_: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    ctx.relevant()
        .filter(|f| matches!(f.as_iff(), Some((a, b)) if a == b))
        .cloned()
        .collect()
}

fn verum<F: ProofFormula>(_: &[&F], ctx: &RuleContext<F>) -> Vec<F> {
    if ctx.relevant().any(|f| f.is_verum()) {
        vec![F::verum()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Formula;
    use crate::parser::parse;
    use crate::rules::{InferenceRule, RuleRegistry};
    use pretty_assertions::assert_eq;

    fn f(s: &str) -> Formula {
        parse(s).unwrap()
    }

    fn registry() -> RuleRegistry<Formula> {
        RuleRegistry::with_basic_rules()
    }

    fn check(rule: &str, premises: &[&str], conclusion: &str) -> bool {
        let reg = registry();
        let premises: Vec<Formula> = premises.iter().map(|p| f(p)).collect();
        let refs: Vec<&Formula> = premises.iter().collect();
        reg.get(rule).unwrap().check(&refs, &f(conclusion))
    }

    #[test]
    fn test_propositional_rules() {
        assert!(check("modus_ponens", &["p", "p → q"], "q"));
        assert!(!check("modus_ponens", &["q", "p → q"], "p"));
        assert!(check("modus_tollens", &["p → q", "¬q"], "¬p"));
        assert!(check("hypothetical_syllogism", &["p → q", "q → r"], "p → r"));
        assert!(check("conjunction_intro", &["p", "q"], "p ∧ q"));
        assert!(check("conjunction_elim", &["p ∧ q"], "q"));
        assert!(check("disjunction_intro", &["p"], "r ∨ p"));
        assert!(check("disjunctive_syllogism", &["p ∨ q", "¬p"], "q"));
        assert!(check("double_negation_elim", &["¬¬p"], "p"));
        assert!(check("de_morgan_and", &["¬(p ∧ q)"], "¬p ∨ ¬q"));
        assert!(check("de_morgan_or", &["¬(p ∨ q)"], "¬p ∧ ¬q"));
        assert!(check("biconditional_intro", &["p → q", "q → p"], "p ↔ q"));
        assert!(check("biconditional_elim", &["p ↔ q"], "q → p"));
        assert!(check("contraposition", &["p → q"], "¬q → ¬p"));
        assert!(check("material_implication", &["p → q"], "¬p ∨ q"));
        assert!(check("material_implication", &["¬p ∨ q"], "p → q"));
        assert!(check("contradiction", &["p", "¬p"], "⊥"));
    }

    #[test]
    fn test_tautologies() {
        assert!(check("identity", &[], "p → p"));
        assert!(!check("identity", &[], "p → q"));
        assert!(check("excluded_middle", &[], "p ∨ ¬p"));
        assert!(check("excluded_middle", &[], "¬p ∨ p"));
        assert!(check("biconditional_reflexivity", &[], "p ↔ p"));
        assert!(check("verum", &[], "⊤"));
        assert_eq!(registry().tautology_for(&f("q ∨ ¬q")), Some("excluded_middle"));
    }

    #[test]
    fn test_universal_instantiation_uses_context_terms() {
        assert!(check("universal_instantiation", &["∀x. Human(x)"], "Human(Socrates)"));
        let rule = registry();
        let rule = rule.get("universal_instantiation").unwrap();
        let ctx = RuleContext::for_problem(&f("Mortal(Plato)"), &[f("∀x. Human(x)")]);
        let out = rule.apply(&[&f("∀x. Human(x)")], &ctx);
        assert_eq!(out, vec![f("Human(Plato)")]);
    }

    #[test]
    fn test_universal_modus_ponens_unifies() {
        assert!(check(
            "universal_modus_ponens",
            &["∀x. Human(x) → Mortal(x)", "Human(Socrates)"],
            "Mortal(Socrates)"
        ));
        assert!(check(
            "universal_modus_ponens",
            &["∀x y. Parent(x, y) → Ancestor(x, y)", "Parent(Zeus, Ares)"],
            "Ancestor(Zeus, Ares)"
        ));
        assert!(!check(
            "universal_modus_ponens",
            &["∀x. Human(x) → Mortal(x)", "Robot(R2)"],
            "Mortal(R2)"
        ));
    }

    #[test]
    fn test_universal_modus_ponens_skips_unbound_consequent() {
        let reg = registry();
        let rule = reg.get("universal_modus_ponens").unwrap();
        let ctx = RuleContext::default();
        let out = rule.apply(&[&f("∀x y. P(x) → Q(y)"), &f("P(A)")], &ctx);
        assert!(out.is_empty());
    }

    #[test]
    fn test_free_variables_in_facts_stay_rigid() {
        let reg = registry();
        let rule = reg.get("universal_modus_ponens").unwrap();
        let ctx = RuleContext::default();
        let out = rule.apply(&[&f("∀x. Eq(x, s(x)) → Loop(x)"), &f("Eq(?y, ?y)")], &ctx);
        assert!(out.is_empty());
    }

    #[test]
    fn test_existential_generalization() {
        assert!(check("existential_generalization", &["Human(Socrates)"], "∃x. Human(x)"));
        assert!(!check("existential_generalization", &["Robot(R2)"], "∃x. Human(x)"));
    }
}
