// SPDX-License-Identifier: PMPL-1.0-or-later

//! CEC dialect of the shared grammar
//!
//! ```text
//! K[Alice](HoldsAt(DoorOpen, 4))
//! ∀a. S[a](Raining) → B[a](Raining)
//! Happens(Open, 3) ∧ Initiates(Open, DoorOpen, 3)
//! ```
//!
//! Cognitive operators always take an agent in brackets; without one a
//! single letter such as `B` stays an ordinary atom.

use crate::error::{Result, TdfolError};
use crate::formula::Term;
use crate::parser::{parse_with, Dialect, Grammar, ParserConfig, TokenKind};

use super::formula::{CecFormula, CognitiveOp, EventPredicate};

#[derive(Debug, Default, Clone, Copy)]
pub struct CecDialect;

impl Dialect for CecDialect {
    type Formula = CecFormula;

    fn is_operator(&self, name: &str, next: &TokenKind) -> bool {
        CognitiveOp::from_name(name).is_some() && *next == TokenKind::LBracket
    }

    fn parse_operator(
        &self,
        name: &str,
        line: usize,
        column: usize,
        grammar: &mut Grammar<'_, Self>,
    ) -> Result<CecFormula> {
        let op = CognitiveOp::from_name(name)
            .ok_or_else(|| TdfolError::parse(format!("unknown operator '{}'", name), line, column))?;
        let agent = grammar
            .parse_bracket_terms(1)?
            .pop()
            .ok_or_else(|| TdfolError::parse(format!("{} needs an agent", name), line, column))?;
        let body = grammar.parse_operator_body()?;
        grammar.node()?;
        Ok(CecFormula::cognitive(op, agent, body))
    }

    fn atom(&self, name: String, args: Vec<Term>, line: usize, column: usize) -> Result<CecFormula> {
        match EventPredicate::from_name(&name) {
            Some(predicate) if args.len() != predicate.arity() => Err(TdfolError::parse(
                format!(
                    "{} takes {} argument(s), found {}",
                    predicate.name(),
                    predicate.arity(),
                    args.len()
                ),
                line,
                column,
            )),
            Some(predicate) => Ok(CecFormula::Event { predicate, args }),
            None => Ok(CecFormula::Predicate { name, args }),
        }
    }

    fn quoted_atom(&self, name: String, args: Vec<Term>, _line: usize, _column: usize) -> Result<CecFormula> {
        Ok(CecFormula::Predicate { name, args })
    }
}

/// Parse a CEC formula with default limits
pub fn parse_cec(text: &str) -> Result<CecFormula> {
    CecParser::new().parse(text)
}

/// Reusable CEC parser holding its limits
#[derive(Debug, Clone, Default)]
pub struct CecParser {
    config: ParserConfig,
}

impl CecParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        CecParser { config }
    }

    pub fn parse(&self, text: &str) -> Result<CecFormula> {
        parse_with(&CecDialect, text, &self.config)
    }

    pub fn parse_all<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<CecFormula>> {
        texts.iter().map(|t| self.parse(t.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_predicate_named_like_an_event_round_trips() {
        let f = CecFormula::pred("Happens", vec![Term::constant("Party")]);
        let printed = f.to_string();
        assert_eq!(printed, "\"Happens\"(Party)");
        assert_eq!(parse_cec(&printed).unwrap(), f);
    }

    #[test]
    fn test_cognitive_operators() {
        let f = parse_cec("K[Alice](HoldsAt(DoorOpen, 4))").unwrap();
        assert_eq!(
            f,
            CecFormula::cognitive(
                CognitiveOp::Knowledge,
                Term::constant("Alice"),
                CecFormula::holds_at(Term::constant("DoorOpen"), Term::Num(4)),
            )
        );
        let g = parse_cec("BELIEVES[Bob] Safe ∧ Calm").unwrap();
        assert!(matches!(g, CecFormula::Cognitive { op: CognitiveOp::Belief, .. }));
    }

    #[test]
    fn test_quantified_agent() {
        let f = parse_cec("∀a. S[a](Raining) → B[a](Raining)").unwrap();
        assert_eq!(f.to_string(), "∀a. S[a](Raining) → B[a](Raining)");
    }

    #[test]
    fn test_single_letter_without_agent_is_an_atom() {
        let f = parse_cec("B ∧ K(Door)").unwrap();
        assert_eq!(
            f,
            CecFormula::and(
                CecFormula::pred("B", vec![]),
                CecFormula::pred("K", vec![Term::constant("Door")]),
            )
        );
    }

    #[test]
    fn test_event_arity_is_checked() {
        match parse_cec("Happens(Open)") {
            Err(TdfolError::Parse { message, line, column }) => {
                assert!(message.contains("Happens takes 2"));
                assert_eq!((line, column), (1, 1));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse_cec("Clipped(1, Lit, 5)").is_ok());
    }

    #[test]
    fn test_display_round_trip() {
        for input in [
            "K[Alice](p → q) ∧ ¬B[Bob](HoldsAt(Lit, 2))",
            "∀e. Happens(e, 1) → (∃f. Initiates(e, f, 1))",
            "I[Carol](Leave) ↔ D[Carol](Leave)",
        ] {
            let f = parse_cec(input).unwrap();
            assert_eq!(parse_cec(&f.to_string()).unwrap(), f, "round trip of {}", f);
        }
    }
}
