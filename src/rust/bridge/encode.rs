// SPDX-License-Identifier: PMPL-1.0-or-later

//! Classical encoding shared by the solver adapters
//!
//! Classical provers know nothing about time or norms, so every temporal or
//! deontic subformula is replaced by a fresh predicate over the bound
//! variables it mentions. Such an encoding is *lossy*: a countermodel of the
//! abstraction says nothing about the original problem.

use anyhow::{bail, Result};
use indexmap::{IndexMap, IndexSet};

use crate::formula::{Formula, ProofFormula, Quantifier, Term};

/// Concrete syntax of a target language
pub(crate) trait Syntax {
    fn truth(&self, value: bool) -> String;
    fn not(&self, inner: String) -> String;
    fn and(&self, l: String, r: String) -> String;
    fn or(&self, l: String, r: String) -> String;
    fn implies(&self, l: String, r: String) -> String;
    fn iff(&self, l: String, r: String) -> String;
    fn quantifier(&self, kind: Quantifier, var: &str, body: String) -> String;
    /// Application of a predicate or function symbol; `args` may be empty
    fn apply(&self, head: &str, args: Vec<String>) -> String;
    fn variable(&self, name: &str) -> String;
    fn predicate(&self, name: &str) -> String;
    fn function(&self, name: &str) -> String;
    fn constant(&self, name: &str) -> String;
    fn number(&self, n: i64) -> String;
    fn modal(&self, index: usize) -> String;
}

/// Symbol name made only of ASCII letters, digits and underscores
pub(crate) fn plain(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replace every character outside `[A-Za-z0-9_]`
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Signature collected while encoding
#[derive(Debug, Default)]
pub(crate) struct Signature {
    /// Rendered predicate symbol to arity
    pub predicates: IndexMap<String, usize>,
    /// Rendered function symbol to arity
    pub functions: IndexMap<String, usize>,
    pub constants: IndexSet<String>,
}

impl Signature {
    fn note(table: &mut IndexMap<String, usize>, symbol: &str, arity: usize) -> Result<()> {
        match table.get(symbol) {
            Some(&known) if known != arity => {
                bail!("symbol {} used with arities {} and {}", symbol, known, arity)
            }
            Some(_) => Ok(()),
            None => {
                table.insert(symbol.to_string(), arity);
                Ok(())
            }
        }
    }
}

/// Encoder for one problem
pub(crate) struct Encoder<'s, S: Syntax> {
    syntax: &'s S,
    pub signature: Signature,
    modal: IndexMap<Formula, String>,
    lossy: bool,
}

impl<'s, S: Syntax> Encoder<'s, S> {
    pub fn new(syntax: &'s S) -> Self {
        Encoder {
            syntax,
            signature: Signature::default(),
            modal: IndexMap::new(),
            lossy: false,
        }
    }

    /// True once a modality or a sort annotation has been abstracted away
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    pub fn encode(&mut self, formula: &Formula) -> Result<String> {
        if formula.is_higher_order() {
            bail!("higher-order formula cannot be encoded: {}", formula);
        }
        self.formula(formula, &mut Vec::new())
    }

    fn formula(&mut self, f: &Formula, scope: &mut Vec<String>) -> Result<String> {
        let s = self.syntax;
        Ok(match f {
            Formula::True => s.truth(true),
            Formula::False => s.truth(false),
            Formula::Predicate { name, args } => {
                let head = s.predicate(name);
                Signature::note(&mut self.signature.predicates, &head, args.len())?;
                let args = args
                    .iter()
                    .map(|t| self.term(t, scope))
                    .collect::<Result<Vec<_>>>()?;
                s.apply(&head, args)
            }
            Formula::Not(inner) => {
                let inner = self.formula(inner, scope)?;
                s.not(inner)
            }
            Formula::And(l, r) => {
                let (l, r) = (self.formula(l, scope)?, self.formula(r, scope)?);
                s.and(l, r)
            }
            Formula::Or(l, r) => {
                let (l, r) = (self.formula(l, scope)?, self.formula(r, scope)?);
                s.or(l, r)
            }
            Formula::Implies(l, r) => {
                let (l, r) = (self.formula(l, scope)?, self.formula(r, scope)?);
                s.implies(l, r)
            }
            Formula::Iff(l, r) => {
                let (l, r) = (self.formula(l, scope)?, self.formula(r, scope)?);
                s.iff(l, r)
            }
            Formula::Quantified { kind, var, sort, body } => {
                if sort.is_some() {
                    self.lossy = true;
                }
                scope.push(var.clone());
                let body = self.formula(body, scope);
                scope.pop();
                s.quantifier(*kind, &s.variable(var), body?)
            }
            Formula::Temporal { .. } | Formula::Deontic { .. } => self.abstract_modal(f, scope)?,
        })
    }

    fn abstract_modal(&mut self, f: &Formula, scope: &[String]) -> Result<String> {
        self.lossy = true;
        let s = self.syntax;
        let next = self.modal.len();
        let head = self.modal.entry(f.clone()).or_insert_with(|| s.modal(next)).clone();
        let params: Vec<String> = f
            .free_vars()
            .into_iter()
            .filter(|v| scope.contains(v))
            .collect();
        Signature::note(&mut self.signature.predicates, &head, params.len())?;
        Ok(s.apply(&head, params.iter().map(|v| s.variable(v)).collect()))
    }

    fn term(&mut self, t: &Term, scope: &[String]) -> Result<String> {
        let s = self.syntax;
        Ok(match t {
            Term::Var(v) if scope.contains(v) => s.variable(v),
            Term::Var(v) => {
                // free variables are read as arbitrary constants
                let c = s.constant(&format!("free_{}", v));
                self.signature.constants.insert(c.clone());
                c
            }
            Term::Const(c) => {
                let c = s.constant(c);
                self.signature.constants.insert(c.clone());
                c
            }
            Term::Num(n) => {
                let c = s.number(*n);
                self.signature.constants.insert(c.clone());
                c
            }
            Term::Func { name, args } => {
                let head = s.function(name);
                Signature::note(&mut self.signature.functions, &head, args.len())?;
                let args = args
                    .iter()
                    .map(|a| self.term(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                s.apply(&head, args)
            }
        })
    }
}
