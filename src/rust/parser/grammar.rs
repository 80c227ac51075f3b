// SPDX-License-Identifier: PMPL-1.0-or-later

//! Precedence-climbing grammar, generic over a formula dialect
//!
//! Precedence from tightest to loosest: `¬`, `∧`, `∨`, `→` (right
//! associative), `↔`. Quantifiers and dialect operators are prefix forms
//! whose body extends as far right as possible unless it is written as a
//! parenthesised group directly after the operator.

use crate::error::{ComplexityLimit, Result, TdfolError};
use crate::formula::{ProofFormula, Quantifier, Term};

use super::lexer::{Token, TokenKind};
use super::ParserConfig;

/// Formula-level vocabulary layered on the shared grammar
pub trait Dialect {
    type Formula: ProofFormula;

    /// True when identifier `name`, followed by `next`, introduces an operator
    fn is_operator(&self, name: &str, next: &TokenKind) -> bool;

    /// Parse the operator whose identifier has just been consumed
    fn parse_operator(
        &self,
        name: &str,
        line: usize,
        column: usize,
        grammar: &mut Grammar<'_, Self>,
    ) -> Result<Self::Formula>
    where
        Self: Sized;

    /// Build an atomic formula
    fn atom(&self, name: String, args: Vec<Term>, line: usize, column: usize) -> Result<Self::Formula>;

    /// Build an atomic formula whose name was written as a string literal
    fn quoted_atom(&self, name: String, args: Vec<Term>, line: usize, column: usize) -> Result<Self::Formula> {
        self.atom(name, args, line, column)
    }
}

#[derive(Clone, Copy)]
enum BinaryOp {
    And,
    Or,
    Implies,
    Iff,
}

impl BinaryOp {
    fn from_token(kind: &TokenKind) -> Option<(BinaryOp, u8, bool)> {
        match kind {
            TokenKind::Iff => Some((BinaryOp::Iff, 1, false)),
            TokenKind::Implies => Some((BinaryOp::Implies, 2, true)),
            TokenKind::Or => Some((BinaryOp::Or, 3, false)),
            TokenKind::And => Some((BinaryOp::And, 4, false)),
            _ => None,
        }
    }

    fn build<F: ProofFormula>(self, l: F, r: F) -> F {
        match self {
            BinaryOp::And => F::conjunction(l, r),
            BinaryOp::Or => F::disjunction(l, r),
            BinaryOp::Implies => F::implication(l, r),
            BinaryOp::Iff => F::biconditional(l, r),
        }
    }
}

/// Parser state over a token stream
pub struct Grammar<'d, D: Dialect> {
    dialect: &'d D,
    tokens: Vec<Token>,
    pos: usize,
    scope: Vec<String>,
    depth: usize,
    nodes: usize,
    config: ParserConfig,
}

impl<'d, D: Dialect> Grammar<'d, D> {
    pub fn new(dialect: &'d D, tokens: Vec<Token>, config: ParserConfig) -> Self {
        Grammar {
            dialect,
            tokens,
            pos: 0,
            scope: Vec::new(),
            depth: 0,
            nodes: 0,
            config,
        }
    }

    /// Parse a complete input: one formula followed by end of input
    pub fn parse_document(&mut self) -> Result<D::Formula> {
        let formula = self.parse_formula()?;
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            return Err(self.error_at(&tok, format!("unexpected {}", tok.kind.describe())));
        }
        Ok(formula)
    }

    pub fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    pub fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_second(&self) -> &TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + 1).min(last)].kind
    }

    pub fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let tok = self.peek().clone();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error_at(
                &tok,
                format!("expected {} but found {}", kind.describe(), tok.kind.describe()),
            ))
        }
    }

    pub fn error_at(&self, tok: &Token, message: impl Into<String>) -> TdfolError {
        TdfolError::parse(message, tok.line, tok.column)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.scope.iter().any(|s| s == name)
    }

    /// Count one node against the budget before it is built
    pub fn node(&mut self) -> Result<()> {
        self.nodes += 1;
        if self.nodes > self.config.max_nodes {
            return Err(TdfolError::ComplexityLimitExceeded {
                limit: ComplexityLimit::NodeCount,
                max: self.config.max_nodes,
                actual: self.nodes,
            });
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(TdfolError::ComplexityLimitExceeded {
                limit: ComplexityLimit::NestingDepth,
                max: self.config.max_depth,
                actual: self.depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn parse_formula(&mut self) -> Result<D::Formula> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<D::Formula> {
        self.enter()?;
        let mut lhs = self.parse_unary()?;
        while let Some((op, prec, right_assoc)) = BinaryOp::from_token(self.peek_kind()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_binary(next_min)?;
            self.node()?;
            lhs = op.build(lhs, rhs);
        }
        self.leave();
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<D::Formula> {
        self.enter()?;
        let tok = self.peek().clone();
        let formula = match &tok.kind {
            TokenKind::Not => {
                self.advance();
                let inner = self.parse_unary()?;
                self.node()?;
                D::Formula::negation(inner)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_formula()?;
                self.expect(TokenKind::RParen)?;
                inner
            }
            TokenKind::True => {
                self.advance();
                self.node()?;
                D::Formula::verum()
            }
            TokenKind::False => {
                self.advance();
                self.node()?;
                D::Formula::falsum()
            }
            TokenKind::Forall | TokenKind::Exists => self.parse_quantifier()?,
            TokenKind::Ident(name) => {
                let name = name.clone();
                let dialect = self.dialect;
                if dialect.is_operator(&name, self.peek_second()) {
                    self.advance();
                    dialect.parse_operator(&name, tok.line, tok.column, self)?
                } else {
                    self.parse_atom()?
                }
            }
            TokenKind::Str(_) => self.parse_atom()?,
            TokenKind::Eof => return Err(self.error_at(&tok, "expected formula, found end of input")),
            other => {
                return Err(self.error_at(&tok, format!("expected formula, found {}", other.describe())))
            }
        };
        self.leave();
        Ok(formula)
    }

    fn parse_quantifier(&mut self) -> Result<D::Formula> {
        let kind = match self.advance().kind {
            TokenKind::Forall => Quantifier::Forall,
            _ => Quantifier::Exists,
        };
        let mut binders: Vec<(String, Option<String>)> = Vec::new();
        loop {
            let tok = self.peek().clone();
            match &tok.kind {
                TokenKind::Ident(name) => {
                    self.advance();
                    let sort = if *self.peek_kind() == TokenKind::Colon {
                        self.advance();
                        let Token { kind, line, column } = self.advance();
                        match kind {
                            TokenKind::Ident(s) => Some(s),
                            other => {
                                return Err(TdfolError::parse(
                                    format!("expected sort name, found {}", other.describe()),
                                    line,
                                    column,
                                ))
                            }
                        }
                    } else {
                        None
                    };
                    binders.push((name.clone(), sort));
                }
                TokenKind::Comma if !binders.is_empty() => {
                    self.advance();
                }
                TokenKind::Dot if !binders.is_empty() => {
                    self.advance();
                    break;
                }
                other => {
                    let message = if binders.is_empty() {
                        format!("expected quantifier variable, found {}", other.describe())
                    } else {
                        format!("expected '.' after quantifier variables, found {}", other.describe())
                    };
                    return Err(self.error_at(&tok, message));
                }
            }
        }
        let scope_len = self.scope.len();
        self.scope.extend(binders.iter().map(|(v, _)| v.clone()));
        let body = self.parse_formula();
        self.scope.truncate(scope_len);
        let mut body = body?;
        for (var, sort) in binders.into_iter().rev() {
            self.node()?;
            body = D::Formula::quantified(kind, var, sort, body);
        }
        Ok(body)
    }

    fn parse_atom(&mut self) -> Result<D::Formula> {
        let Token { kind, line, column } = self.advance();
        let (name, quoted) = match kind {
            TokenKind::Ident(n) => (n, false),
            TokenKind::Str(n) => (n, true),
            other => {
                return Err(TdfolError::parse(
                    format!("expected predicate, found {}", other.describe()),
                    line,
                    column,
                ))
            }
        };
        let args = if *self.peek_kind() == TokenKind::LParen {
            self.parse_term_args()?
        } else {
            Vec::new()
        };
        self.node()?;
        if quoted {
            self.dialect.quoted_atom(name, args, line, column)
        } else {
            self.dialect.atom(name, args, line, column)
        }
    }

    /// `( term, ... )`
    pub fn parse_term_args(&mut self) -> Result<Vec<Term>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if *self.peek_kind() == TokenKind::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_term()?);
            let Token { kind, line, column } = self.advance();
            match kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok(args),
                other => {
                    return Err(TdfolError::parse(
                        format!("expected ',' or ')' in argument list, found {}", other.describe()),
                        line,
                        column,
                    ))
                }
            }
        }
    }

    /// `[ term, ... ]` with exactly `count` terms
    pub fn parse_bracket_terms(&mut self, count: usize) -> Result<Vec<Term>> {
        let open = self.expect(TokenKind::LBracket)?;
        let mut terms = Vec::with_capacity(count);
        loop {
            terms.push(self.parse_term()?);
            let Token { kind, line, column } = self.advance();
            match kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => break,
                other => {
                    return Err(TdfolError::parse(
                        format!("expected ',' or ']', found {}", other.describe()),
                        line,
                        column,
                    ))
                }
            }
        }
        if terms.len() != count {
            return Err(self.error_at(
                &open,
                format!("expected {} bracketed argument(s), found {}", count, terms.len()),
            ));
        }
        Ok(terms)
    }

    /// Operator body: a parenthesised group, or everything to the right
    pub fn parse_operator_body(&mut self) -> Result<D::Formula> {
        if *self.peek_kind() == TokenKind::LParen {
            self.advance();
            let body = self.parse_formula()?;
            self.expect(TokenKind::RParen)?;
            Ok(body)
        } else {
            self.parse_formula()
        }
    }

    pub fn parse_term(&mut self) -> Result<Term> {
        self.node()?;
        let Token { kind, line, column } = self.advance();
        match kind {
            TokenKind::FreeVar(name) => Ok(Term::Var(name)),
            TokenKind::Int(n) => Ok(Term::Num(n)),
            TokenKind::Str(name) if *self.peek_kind() == TokenKind::LParen => {
                let args = self.parse_term_args()?;
                Ok(Term::Func { name, args })
            }
            TokenKind::Str(s) => Ok(Term::Const(s)),
            TokenKind::Ident(name) => {
                if *self.peek_kind() == TokenKind::LParen {
                    let args = self.parse_term_args()?;
                    Ok(Term::Func { name, args })
                } else if self.is_bound(&name) {
                    Ok(Term::Var(name))
                } else if name.starts_with(|c: char| c.is_ascii_uppercase()) {
                    Ok(Term::Const(name))
                } else {
                    Err(TdfolError::parse(
                        format!(
                            "unbound variable '{}' (quantify it, write ?{} for a free variable, or capitalise a constant)",
                            name, name
                        ),
                        line,
                        column,
                    ))
                }
            }
            other => Err(TdfolError::parse(
                format!("expected term, found {}", other.describe()),
                line,
                column,
            )),
        }
    }
}
