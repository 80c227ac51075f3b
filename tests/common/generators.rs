// SPDX-License-Identifier: PMPL-1.0-or-later

//! Property-based testing generators for TDFOL types

use proptest::prelude::*;
use tdfol::formula::{DeonticOp, TemporalOp};
use tdfol::{Formula, Term};

const PREDICATES: &[&str] = &["Human", "Mortal", "Pays", "Owns", "Resident"];
const CONSTANTS: &[&str] = &["Alice", "Bob", "Socrates", "Tax"];
const ATOMS: &[&str] = &["p", "q", "r", "raining"];
/// Names that only survive printing when quoted
const AWKWARD_NAMES: &[&str] = &["DURING", "OBLIGATION", "FORBIDDEN", "iff", "my pred", "O", "say \"hi\""];
const BINDERS: &[&str] = &["x", "y", "z"];

/// Strategy for constant names
pub fn constant() -> impl Strategy<Value = Term> {
    prop::sample::select(CONSTANTS).prop_map(Term::constant)
}

/// Strategy for timepoints
pub fn timepoint() -> impl Strategy<Value = Term> {
    (0i64..50).prop_map(Term::Num)
}

/// Ground terms: constants, numbers and shallow function applications
pub fn ground_term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![constant(), timepoint()];
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop::collection::vec(inner, 1..3).prop_map(|args| Term::func("f", args))
    })
}

/// Atoms and predicates over ground terms
pub fn atomic() -> impl Strategy<Value = Formula> {
    prop_oneof![
        prop::sample::select(ATOMS).prop_map(Formula::atom),
        (
            prop::sample::select(PREDICATES),
            prop::collection::vec(ground_term(), 1..3)
        )
            .prop_map(|(name, args)| Formula::pred(name, args)),
        (
            prop::sample::select(AWKWARD_NAMES),
            prop::collection::vec(ground_term(), 0..2)
        )
            .prop_map(|(name, args)| Formula::pred(name, args)),
    ]
}

fn deontic_op() -> impl Strategy<Value = DeonticOp> {
    prop_oneof![
        Just(DeonticOp::Obligation),
        Just(DeonticOp::Permission),
        Just(DeonticOp::Prohibition),
    ]
}

fn temporal_op() -> impl Strategy<Value = TemporalOp> {
    prop_oneof![
        timepoint().prop_map(TemporalOp::Before),
        timepoint().prop_map(TemporalOp::After),
        (0i64..20, 0i64..20).prop_map(|(a, len)| TemporalOp::During(Term::Num(a), Term::Num(a + len))),
    ]
}

/// Closed formulas of bounded depth over every connective and operator
pub fn formula() -> impl Strategy<Value = Formula> {
    atomic().prop_recursive(4, 48, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(Formula::not),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::and(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::or(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::implies(a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::iff(a, b)),
            (prop::sample::select(BINDERS), prop::sample::select(PREDICATES), inner.clone()).prop_map(
                |(v, p, body)| Formula::forall(v, Formula::and(Formula::pred(p, vec![Term::var(v)]), body))
            ),
            (prop::sample::select(BINDERS), prop::sample::select(PREDICATES)).prop_map(|(v, p)| {
                Formula::exists(v, Formula::pred(p, vec![Term::var(v)]))
            }),
            (temporal_op(), inner.clone()).prop_map(|(op, body)| Formula::temporal(op, body)),
            (deontic_op(), prop::option::of(constant()), inner).prop_map(|(op, agent, body)| {
                Formula::deontic(op, agent, body)
            }),
        ]
    })
}

/// Propositional formulas over a handful of atoms
pub fn propositional() -> impl Strategy<Value = Formula> {
    prop::sample::select(ATOMS)
        .prop_map(Formula::atom)
        .prop_recursive(3, 24, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(Formula::not),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::and(a, b)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| Formula::or(a, b)),
                (inner.clone(), inner).prop_map(|(a, b)| Formula::implies(a, b)),
            ]
        })
}
