// SPDX-License-Identifier: PMPL-1.0-or-later

//! Canonical forms and content fingerprints
//!
//! Two formulas that differ only in bound-variable names or in the order of
//! the operands of a commutative chain (`∧`, `∨`, `↔`) normalize to the same
//! canonical formula and therefore share one fingerprint.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::logic::ProofFormula;
use super::term::Term;
use super::Formula;

const FORMULA_DOMAIN: &str = "tdfol-v1:";
const CONTEXT_DOMAIN: &str = "tdfol-ctx-v1:";
const KEY_DOMAIN: &str = "tdfol-key-v1:";

/// BLAKE3 digest of a canonical formula
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hash a canonical serialization under a domain tag
    pub fn of_canonical(domain: &str, canonical: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(canonical.as_bytes());
        Fingerprint(*hasher.finalize().as_bytes())
    }

    pub fn of_formula(formula: &Formula) -> Self {
        Self::of_canonical(FORMULA_DOMAIN, &canonical(formula).to_string())
    }

    /// Combine two fingerprints into a cache key
    pub fn combine(goal: &Fingerprint, context: &Fingerprint) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN.as_bytes());
        hasher.update(&goal.0);
        hasher.update(&context.0);
        Fingerprint(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Fingerprint(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 64-character hex string
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk).ok()?;
            bytes[i] = u8::from_str_radix(s, 16).ok()?;
        }
        Some(Fingerprint(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}…)", &self.to_hex()[..12])
    }
}

/// Order-insensitive fingerprint of an axiom set
pub fn context_fingerprint<F: ProofFormula>(axioms: &[F]) -> Fingerprint {
    let mut prints: Vec<Fingerprint> = axioms.iter().map(|a| a.fingerprint()).collect();
    prints.sort();
    prints.dedup();
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONTEXT_DOMAIN.as_bytes());
    for p in &prints {
        hasher.update(&p.0);
    }
    Fingerprint(*hasher.finalize().as_bytes())
}

/// Canonical representative of a formula's equivalence class
pub fn canonical(formula: &Formula) -> Formula {
    canon(formula, &mut Vec::new())
}

/// Name given to the binder at nesting depth `depth`
pub(crate) fn binder_name(depth: usize) -> String {
    format!("#{}", depth)
}

/// Rename a variable term according to the innermost matching binder
pub(crate) fn rename_term(term: &Term, renames: &[(String, String)]) -> Term {
    match term {
        Term::Var(v) => renames
            .iter()
            .rev()
            .find(|(from, _)| from == v)
            .map(|(_, to)| Term::Var(to.clone()))
            .unwrap_or_else(|| term.clone()),
        Term::Const(_) | Term::Num(_) => term.clone(),
        Term::Func { name, args } => Term::Func {
            name: name.clone(),
            args: args.iter().map(|a| rename_term(a, renames)).collect(),
        },
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Chain {
    And,
    Or,
    Iff,
}

fn chain_kind(f: &Formula) -> Option<Chain> {
    match f {
        Formula::And(_, _) => Some(Chain::And),
        Formula::Or(_, _) => Some(Chain::Or),
        Formula::Iff(_, _) => Some(Chain::Iff),
        _ => None,
    }
}

fn flatten<'a>(f: &'a Formula, kind: Chain, out: &mut Vec<&'a Formula>) {
    match (f, kind) {
        (Formula::And(a, b), Chain::And)
        | (Formula::Or(a, b), Chain::Or)
        | (Formula::Iff(a, b), Chain::Iff) => {
            flatten(a, kind, out);
            flatten(b, kind, out);
        }
        _ => out.push(f),
    }
}

fn canon(f: &Formula, renames: &mut Vec<(String, String)>) -> Formula {
    if let Some(kind) = chain_kind(f) {
        let mut operands = Vec::new();
        flatten(f, kind, &mut operands);
        let mut normalized: Vec<Formula> = operands.into_iter().map(|o| canon(o, renames)).collect();
        normalized.sort();
        let mut iter = normalized.into_iter().rev();
        let last = match iter.next() {
            Some(last) => last,
            None => return f.clone(),
        };
        return iter.fold(last, |acc, next| match kind {
            Chain::And => Formula::and(next, acc),
            Chain::Or => Formula::or(next, acc),
            Chain::Iff => Formula::iff(next, acc),
        });
    }
    match f {
        Formula::True | Formula::False => f.clone(),
        Formula::Predicate { name, args } => Formula::Predicate {
            name: name.clone(),
            args: args.iter().map(|a| rename_term(a, renames)).collect(),
        },
        Formula::Not(a) => Formula::not(canon(a, renames)),
        Formula::Implies(a, b) => Formula::implies(canon(a, renames), canon(b, renames)),
        Formula::Quantified {
            kind,
            var,
            sort,
            body,
        } => {
            let name = binder_name(renames.len());
            renames.push((var.clone(), name.clone()));
            let body = canon(body, renames);
            renames.pop();
            Formula::Quantified {
                kind: *kind,
                var: name,
                sort: sort.clone(),
                body: Arc::new(body),
            }
        }
        Formula::Temporal { op, body } => Formula::temporal(
            op.map_terms(|t| rename_term(t, renames)),
            canon(body, renames),
        ),
        Formula::Deontic { op, agent, body } => Formula::deontic(
            *op,
            agent.as_ref().map(|a| rename_term(a, renames)),
            canon(body, renames),
        ),
        Formula::And(_, _) | Formula::Or(_, _) | Formula::Iff(_, _) => f.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(name: &str) -> Formula {
        Formula::atom(name)
    }

    #[test]
    fn test_alpha_renaming_shares_fingerprint() {
        let a = Formula::forall("x", Formula::pred("Human", vec![Term::var("x")]));
        let b = Formula::forall("y", Formula::pred("Human", vec![Term::var("y")]));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_commutative_reordering_shares_fingerprint() {
        let a = Formula::and(p("a"), Formula::and(p("b"), p("c")));
        let b = Formula::and(Formula::and(p("c"), p("a")), p("b"));
        assert_eq!(canonical(&a), canonical(&b));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_implication_is_not_commutative() {
        let a = Formula::implies(p("a"), p("b"));
        let b = Formula::implies(p("b"), p("a"));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_free_and_bound_variables_differ() {
        let free = Formula::pred("Human", vec![Term::var("x")]);
        let bound = Formula::forall("x", free.clone());
        assert_ne!(free.fingerprint(), bound.fingerprint());
    }

    #[test]
    fn test_context_fingerprint_is_order_insensitive() {
        let a = vec![p("a"), p("b")];
        let b = vec![p("b"), p("a"), p("a")];
        assert_eq!(context_fingerprint(&a), context_fingerprint(&b));
        assert_ne!(context_fingerprint(&a), context_fingerprint(&[p("a")]));
    }

    #[test]
    fn test_hex_round_trip() {
        let fp = p("a").fingerprint();
        assert_eq!(Fingerprint::from_hex(&fp.to_hex()), Some(fp));
        assert_eq!(Fingerprint::from_hex("zz"), None);
    }
}
