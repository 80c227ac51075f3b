// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tokenizer shared by the TDFOL and CEC dialects
//!
//! Unicode connectives and their ASCII aliases map onto one token kind each.
//! Dialect keywords (temporal, deontic, cognitive operators) stay identifiers
//! and are resolved by the grammar.

use crate::error::{Result, TdfolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// `?name`, an explicitly free variable
    FreeVar(String),
    /// Double-quoted constant
    Str(String),
    Int(i64),
    Not,
    And,
    Or,
    Implies,
    Iff,
    Forall,
    Exists,
    True,
    False,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier '{}'", s),
            TokenKind::FreeVar(s) => format!("variable '?{}'", s),
            TokenKind::Str(s) => format!("string \"{}\"", s),
            TokenKind::Int(n) => format!("number {}", n),
            TokenKind::Not => "'¬'".to_string(),
            TokenKind::And => "'∧'".to_string(),
            TokenKind::Or => "'∨'".to_string(),
            TokenKind::Implies => "'→'".to_string(),
            TokenKind::Iff => "'↔'".to_string(),
            TokenKind::Forall => "'∀'".to_string(),
            TokenKind::Exists => "'∃'".to_string(),
            TokenKind::True => "'⊤'".to_string(),
            TokenKind::False => "'⊥'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consume `c` if it is next
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn ident_tail(&mut self, first: char) -> String {
        let mut s = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn number(&mut self, first: char, negative: bool, line: usize, column: usize) -> Result<i64> {
        let mut digits = String::new();
        if negative {
            digits.push('-');
        }
        digits.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }
        digits
            .parse::<i64>()
            .map_err(|_| TdfolError::parse(format!("integer literal out of range: {}", digits), line, column))
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some(c @ ('"' | '\\')) => s.push(c),
                    Some(c) => {
                        return Err(TdfolError::parse(
                            format!("unknown escape '\\{}'", c),
                            self.line,
                            self.column,
                        ))
                    }
                    None => break,
                },
                Some(c) => s.push(c),
                None => break,
            }
        }
        Err(TdfolError::parse("unterminated string literal", line, column))
    }

    fn next_token(&mut self) -> Result<Token> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
        let (line, column) = (self.line, self.column);
        let make = |kind| Ok(Token { kind, line, column });
        let c = match self.bump() {
            Some(c) => c,
            None => return make(TokenKind::Eof),
        };
        let kind = match c {
            '¬' | '~' | '!' => TokenKind::Not,
            '∧' => TokenKind::And,
            '∨' => TokenKind::Or,
            '→' | '⇒' => TokenKind::Implies,
            '↔' | '⇔' => TokenKind::Iff,
            '∀' => TokenKind::Forall,
            '∃' => TokenKind::Exists,
            '⊤' => TokenKind::True,
            '⊥' => TokenKind::False,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '&' => {
                self.eat('&');
                TokenKind::And
            }
            '|' => {
                self.eat('|');
                TokenKind::Or
            }
            '-' => {
                if self.eat('>') {
                    TokenKind::Implies
                } else {
                    match self.peek() {
                        Some(d) if d.is_ascii_digit() => {
                            self.bump();
                            TokenKind::Int(self.number(d, true, line, column)?)
                        }
                        _ => return Err(TdfolError::parse("unexpected '-'", line, column)),
                    }
                }
            }
            '=' => {
                if self.eat('>') {
                    TokenKind::Implies
                } else {
                    return Err(TdfolError::parse("unexpected '=', expected '=>'", line, column));
                }
            }
            '<' => {
                let arrow = if self.eat('-') {
                    self.eat('>')
                } else if self.eat('=') {
                    self.eat('>')
                } else {
                    false
                };
                if !arrow {
                    return Err(TdfolError::parse(
                        "unexpected '<', expected '<->' or '<=>'",
                        line,
                        column,
                    ));
                }
                TokenKind::Iff
            }
            '?' => match self.peek() {
                Some(n) if n.is_ascii_alphabetic() || n == '_' => {
                    self.bump();
                    TokenKind::FreeVar(self.ident_tail(n))
                }
                _ => return Err(TdfolError::parse("expected variable name after '?'", line, column)),
            },
            '"' => TokenKind::Str(self.string(line, column)?),
            d if d.is_ascii_digit() => TokenKind::Int(self.number(d, false, line, column)?),
            a if a.is_ascii_alphabetic() || a == '_' => {
                let word = self.ident_tail(a);
                match word.as_str() {
                    "not" => TokenKind::Not,
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "implies" => TokenKind::Implies,
                    "iff" => TokenKind::Iff,
                    "forall" => TokenKind::Forall,
                    "exists" => TokenKind::Exists,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Ident(word),
                }
            }
            other => {
                return Err(TdfolError::parse(
                    format!("unknown symbol '{}'", other),
                    line,
                    column,
                ))
            }
        };
        make(kind)
    }
}

/// Split `input` into tokens, ending with [`TokenKind::Eof`]
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_unicode_and_ascii_aliases_agree() {
        assert_eq!(kinds("¬p ∧ q → r ↔ s"), kinds("~p & q -> r <-> s"));
        assert_eq!(kinds("¬p ∧ q → r ↔ s"), kinds("not p and q implies r iff s"));
        assert_eq!(kinds("p ∨ q"), kinds("p || q"));
        assert_eq!(kinds("p → q"), kinds("p => q"));
        assert_eq!(kinds("p ↔ q"), kinds("p <=> q"));
    }

    #[test]
    fn test_numbers_and_free_vars() {
        assert_eq!(
            kinds("-5 ?x 12"),
            vec![
                TokenKind::Int(-5),
                TokenKind::FreeVar("x".into()),
                TokenKind::Int(12),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a \"b\"""#),
            vec![TokenKind::Str("a \"b\"".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = tokenize("p\n  ∧ q").unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unknown_symbol_reports_position() {
        match tokenize("p # q") {
            Err(TdfolError::Parse { line, column, .. }) => assert_eq!((line, column), (1, 3)),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
