// SPDX-License-Identifier: PMPL-1.0-or-later

//! TDFOL text parser
//!
//! ```text
//! ∀x. Human(x) → Mortal(x)
//! DURING[1, 10](O[A](pay))
//! forall x y. (Parent(x, y) & Parent(y, ?z)) -> Grandparent(x, ?z)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ComplexityLimit, Result, TdfolError};
use crate::formula::{DeonticOp, Formula, TemporalOp, Term, OPERATOR_KEYWORDS};

pub mod grammar;
pub mod lexer;

pub use grammar::{Dialect, Grammar};
pub use lexer::{tokenize, Token, TokenKind};

/// Complexity limits enforced while parsing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum input length in bytes
    pub max_input_len: usize,
    /// Maximum nesting depth of the parse
    pub max_depth: usize,
    /// Maximum number of formula and term nodes
    pub max_nodes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_input_len: 64 * 1024,
            max_depth: 128,
            max_nodes: 20_000,
        }
    }
}

impl ParserConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_input_len == 0 || self.max_depth == 0 || self.max_nodes == 0 {
            return Err(TdfolError::config("parser limits must be non-zero"));
        }
        Ok(())
    }
}

/// The TDFOL vocabulary: temporal and deontic operators
#[derive(Debug, Default, Clone, Copy)]
pub struct TdfolDialect;

impl TdfolDialect {
    fn deontic_op(name: &str) -> Option<DeonticOp> {
        match name {
            "O" | "OBLIGATION" => Some(DeonticOp::Obligation),
            "P" | "PERMISSION" => Some(DeonticOp::Permission),
            "F" | "PROHIBITION" | "FORBIDDEN" => Some(DeonticOp::Prohibition),
            _ => None,
        }
    }
}

impl Dialect for TdfolDialect {
    type Formula = Formula;

    fn is_operator(&self, name: &str, next: &TokenKind) -> bool {
        match name {
            _ if OPERATOR_KEYWORDS.contains(&name) => true,
            // Single-letter forms need the agent bracket, so `P(x)` stays a predicate
            "O" | "P" | "F" => *next == TokenKind::LBracket,
            _ => false,
        }
    }

    fn parse_operator(
        &self,
        name: &str,
        line: usize,
        column: usize,
        grammar: &mut Grammar<'_, Self>,
    ) -> Result<Formula> {
        match name {
            "BEFORE" | "AFTER" => {
                let mut t = grammar.parse_bracket_terms(1)?;
                let point = t.pop().ok_or_else(|| TdfolError::parse("missing timepoint", line, column))?;
                let body = grammar.parse_operator_body()?;
                grammar.node()?;
                let op = if name == "BEFORE" {
                    TemporalOp::Before(point)
                } else {
                    TemporalOp::After(point)
                };
                Ok(Formula::temporal(op, body))
            }
            "DURING" => {
                let mut t = grammar.parse_bracket_terms(2)?.into_iter();
                let (start, end) = match (t.next(), t.next()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(TdfolError::parse("DURING needs a start and an end", line, column)),
                };
                let body = grammar.parse_operator_body()?;
                grammar.node()?;
                Ok(Formula::during(start, end, body))
            }
            _ => {
                let op = Self::deontic_op(name)
                    .ok_or_else(|| TdfolError::parse(format!("unknown operator '{}'", name), line, column))?;
                let agent = if *grammar.peek_kind() == TokenKind::LBracket {
                    grammar.parse_bracket_terms(1)?.pop()
                } else {
                    None
                };
                let body = grammar.parse_operator_body()?;
                grammar.node()?;
                Ok(Formula::deontic(op, agent, body))
            }
        }
    }

    fn atom(&self, name: String, args: Vec<Term>, _line: usize, _column: usize) -> Result<Formula> {
        Ok(Formula::Predicate { name, args })
    }
}

/// Parse text in dialect `D` under the given limits
pub fn parse_with<D: Dialect>(dialect: &D, text: &str, config: &ParserConfig) -> Result<D::Formula> {
    if text.len() > config.max_input_len {
        return Err(TdfolError::ComplexityLimitExceeded {
            limit: ComplexityLimit::InputLength,
            max: config.max_input_len,
            actual: text.len(),
        });
    }
    let tokens = tokenize(text)?;
    Grammar::new(dialect, tokens, config.clone()).parse_document()
}

/// Parse a TDFOL formula with default limits
pub fn parse(text: &str) -> Result<Formula> {
    Parser::new().parse(text)
}

/// Reusable TDFOL parser holding its limits
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Parser { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse(&self, text: &str) -> Result<Formula> {
        let formula = parse_with(&TdfolDialect, text, &self.config)?;
        tracing::trace!(input = text, parsed = %formula, "parsed formula");
        Ok(formula)
    }

    /// Parse every formula, failing on the first error
    pub fn parse_all<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Formula>> {
        texts.iter().map(|t| self.parse(t.as_ref())).collect()
    }
}
