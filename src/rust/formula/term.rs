// SPDX-License-Identifier: PMPL-1.0-or-later

//! First-order terms, substitutions and Robinson unification

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A first-order term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// Variable (bound by a quantifier, or free when written `?x`)
    Var(String),
    /// Named constant
    Const(String),
    /// Integer literal, also used for timepoints
    Num(i64),
    /// Function application
    Func { name: String, args: Vec<Term> },
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Term::Const(name.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Func {
            name: name.into(),
            args,
        }
    }

    pub fn as_num(&self) -> Option<i64> {
        match self {
            Term::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Number of nodes in the term tree
    pub fn size(&self) -> usize {
        match self {
            Term::Var(_) | Term::Const(_) | Term::Num(_) => 1,
            Term::Func { args, .. } => 1 + args.iter().map(Term::size).sum::<usize>(),
        }
    }

    /// True when no variable occurs in the term
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::Const(_) | Term::Num(_) => true,
            Term::Func { args, .. } => args.iter().all(Term::is_ground),
        }
    }

    /// True when `var` occurs anywhere in the term
    pub fn occurs(&self, var: &str) -> bool {
        match self {
            Term::Var(v) => v == var,
            Term::Const(_) | Term::Num(_) => false,
            Term::Func { args, .. } => args.iter().any(|a| a.occurs(var)),
        }
    }

    /// True when the constant or function symbol `name` occurs in the term
    pub fn mentions_symbol(&self, name: &str) -> bool {
        match self {
            Term::Const(c) => c == name,
            Term::Var(_) | Term::Num(_) => false,
            Term::Func { name: f, args } => f == name || args.iter().any(|a| a.mentions_symbol(name)),
        }
    }

    pub fn collect_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::Const(_) | Term::Num(_) => {}
            Term::Func { args, .. } => args.iter().for_each(|a| a.collect_vars(out)),
        }
    }

    /// Collect every symbol name (constants and functions) into `out`
    pub fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Const(c) => {
                out.insert(c.clone());
            }
            Term::Var(_) | Term::Num(_) => {}
            Term::Func { name, args } => {
                out.insert(name.clone());
                args.iter().for_each(|a| a.collect_symbols(out));
            }
        }
    }

    /// Replace every occurrence of variable `var` by `replacement`
    pub fn replace_var(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Var(v) if v == var => replacement.clone(),
            Term::Var(_) | Term::Const(_) | Term::Num(_) => self.clone(),
            Term::Func { name, args } => Term::Func {
                name: name.clone(),
                args: args.iter().map(|a| a.replace_var(var, replacement)).collect(),
            },
        }
    }

    /// Apply a substitution, resolving chains of bindings
    pub fn apply(&self, subst: &Substitution) -> Term {
        match self {
            Term::Var(v) => match subst.get(v) {
                Some(t) if t != self => t.apply(subst),
                _ => self.clone(),
            },
            Term::Const(_) | Term::Num(_) => self.clone(),
            Term::Func { name, args } => Term::Func {
                name: name.clone(),
                args: args.iter().map(|a| a.apply(subst)).collect(),
            },
        }
    }

    /// Display the term with knowledge of which variables are bound
    pub fn scoped<'a>(&'a self, bound: &'a [String]) -> ScopedTerm<'a> {
        ScopedTerm { term: self, bound }
    }
}

/// Variable-to-term bindings, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    bindings: IndexMap<String, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(var: impl Into<String>, term: Term) -> Self {
        let mut s = Self::new();
        s.bind(var, term);
        s
    }

    pub fn bind(&mut self, var: impl Into<String>, term: Term) {
        self.bindings.insert(var.into(), term);
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    /// Copy of this substitution with `var` unbound
    pub fn without(&self, var: &str) -> Substitution {
        let mut bindings = self.bindings.clone();
        bindings.shift_remove(var);
        Substitution { bindings }
    }

    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.bindings.iter()
    }

    /// Follow variable bindings until an unbound variable or non-variable term
    pub fn walk<'a>(&'a self, term: &'a Term) -> &'a Term {
        let mut current = term;
        while let Term::Var(v) = current {
            match self.bindings.get(v) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    /// Fully resolve the binding of `var`, if any
    pub fn resolve(&self, var: &str) -> Option<Term> {
        self.bindings.get(var).map(|t| t.apply(self))
    }
}

/// Unify two terms, extending `subst`
///
/// Only variables accepted by `flexible` may be bound; every other variable
/// is treated as a rigid symbol. Binding a variable to a term that contains
/// it fails the occurs-check. On failure `subst` may hold partial bindings,
/// so callers unify against a clone.
pub fn unify_terms<P>(a: &Term, b: &Term, subst: &mut Substitution, flexible: &P) -> bool
where
    P: Fn(&str) -> bool + ?Sized,
{
    let a = subst.walk(a).clone();
    let b = subst.walk(b).clone();
    if a == b {
        return true;
    }
    match (&a, &b) {
        (Term::Var(v), other) if flexible(v) => bind_var(v, other, subst),
        (other, Term::Var(v)) if flexible(v) => bind_var(v, other, subst),
        (
            Term::Func { name: f, args: xs },
            Term::Func { name: g, args: ys },
        ) => {
            f == g
                && xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| unify_terms(x, y, subst, flexible))
        }
        _ => false,
    }
}

fn bind_var(var: &str, term: &Term, subst: &mut Substitution) -> bool {
    if term.apply(subst).occurs(var) {
        return false;
    }
    subst.bind(var, term.clone());
    true
}

/// Unify two term lists pairwise
pub fn unify_term_lists<P>(xs: &[Term], ys: &[Term], subst: &mut Substitution, flexible: &P) -> bool
where
    P: Fn(&str) -> bool + ?Sized,
{
    xs.len() == ys.len()
        && xs
            .iter()
            .zip(ys.iter())
            .all(|(x, y)| unify_terms(x, y, subst, flexible))
}

/// Pick a name based on `base` that is not in `taken`
pub fn fresh_name(base: &str, taken: &BTreeSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{}{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub(crate) const RESERVED_WORDS: &[&str] = &[
    "not", "and", "or", "implies", "iff", "forall", "exists", "true", "false",
];

/// True for `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A constant the parser reads back as a constant without quotes
pub(crate) fn is_bare_constant(name: &str, bound: &[String]) -> bool {
    is_identifier(name)
        && name.starts_with(|c: char| c.is_ascii_uppercase())
        && !bound.iter().any(|b| b == name)
        && !RESERVED_WORDS.contains(&name)
}

/// A predicate name the parser reads back without quotes
///
/// `keywords` are the dialect's operator words, which would otherwise be read
/// as the start of an operator.
pub(crate) fn is_bare_predicate(name: &str, keywords: &[&str]) -> bool {
    is_identifier(name) && !RESERVED_WORDS.contains(&name) && !keywords.contains(&name)
}

/// Predicate name, quoted when it is not a plain identifier of the dialect
pub(crate) fn write_predicate_name(name: &str, keywords: &[&str], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if is_bare_predicate(name, keywords) {
        write!(f, "{}", name)
    } else {
        write_quoted(name, f)
    }
}

/// Double-quoted string literal with `\"`, `\\` and `\n` escaped
pub(crate) fn write_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            other => write!(f, "{}", other)?,
        }
    }
    write!(f, "\"")
}

/// Borrowed term plus the binder names in scope, for printing
pub struct ScopedTerm<'a> {
    term: &'a Term,
    bound: &'a [String],
}

impl fmt::Display for ScopedTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term {
            Term::Var(v) => {
                if self.bound.iter().any(|b| b == v) {
                    write!(f, "{}", v)
                } else {
                    write!(f, "?{}", v)
                }
            }
            Term::Const(c) => {
                if is_bare_constant(c, self.bound) {
                    write!(f, "{}", c)
                } else {
                    write_quoted(c, f)
                }
            }
            Term::Num(n) => write!(f, "{}", n),
            Term::Func { name, args } => {
                write_predicate_name(name, &[], f)?;
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a.scoped(self.bound))?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scoped(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_var(_: &str) -> bool {
        true
    }

    #[test]
    fn test_unify_binds_variable() {
        let mut s = Substitution::new();
        let a = Term::func("f", vec![Term::var("x")]);
        let b = Term::func("f", vec![Term::constant("A")]);
        assert!(unify_terms(&a, &b, &mut s, &any_var));
        assert_eq!(s.resolve("x"), Some(Term::constant("A")));
    }

    #[test]
    fn test_unify_occurs_check() {
        let mut s = Substitution::new();
        let a = Term::var("x");
        let b = Term::func("f", vec![Term::var("x")]);
        assert!(!unify_terms(&a, &b, &mut s, &any_var));
    }

    #[test]
    fn test_unify_transitive_bindings() {
        let mut s = Substitution::new();
        let a = Term::func("g", vec![Term::var("x"), Term::var("y")]);
        let b = Term::func("g", vec![Term::var("y"), Term::Num(3)]);
        assert!(unify_terms(&a, &b, &mut s, &any_var));
        assert_eq!(Term::var("x").apply(&s), Term::Num(3));
    }

    #[test]
    fn test_rigid_variables_do_not_bind() {
        let mut s = Substitution::new();
        let flexible = |v: &str| v == "x";
        assert!(!unify_terms(&Term::var("y"), &Term::constant("A"), &mut s, &flexible));
        assert!(unify_terms(&Term::var("x"), &Term::var("y"), &mut s, &flexible));
    }

    #[test]
    fn test_symbol_clash() {
        let mut s = Substitution::new();
        let a = Term::func("f", vec![Term::Num(1)]);
        let b = Term::func("g", vec![Term::Num(1)]);
        assert!(!unify_terms(&a, &b, &mut s, &any_var));
    }

    #[test]
    fn test_scoped_display() {
        let bound = vec!["x".to_string()];
        assert_eq!(Term::var("x").scoped(&bound).to_string(), "x");
        assert_eq!(Term::var("y").scoped(&bound).to_string(), "?y");
        assert_eq!(Term::constant("Alice").to_string(), "Alice");
        assert_eq!(Term::constant("bob").to_string(), "\"bob\"");
        assert_eq!(Term::constant("x").scoped(&bound).to_string(), "\"x\"");
    }

    #[test]
    fn test_fresh_name_skips_taken() {
        let taken: BTreeSet<String> = ["c".to_string(), "c1".to_string()].into_iter().collect();
        assert_eq!(fresh_name("c", &taken), "c2");
        assert_eq!(fresh_name("d", &taken), "d");
    }
}
