//! Character-level scanner (§6 "Source-language surface").
//!
//! Grounded on `parser.cpp`'s `getNext`/`getNextSkipWS`/`putBack` loop:
//! a flat index into the source text, one token of lookahead via
//! `putBack`. Re-expressed here as an ordinary `Iterator<Item =
//! ParseResult<(Token, Location)>>` rather than the original's
//! hand-rolled push-back index, since Rust's iterator adaptors give the
//! same one-token-of-lookahead shape without a mutable cursor the
//! parser has to manage itself.

use crate::error::{Location, ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Fixnum(i64),
    True,
    False,
    Symbol(String),
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer { chars: source.chars().peekable(), line: 1 }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn loc(&self) -> Location {
        Location { line_number: self.line }
    }

    fn scan_fixnum(&mut self, first: char) -> ParseResult<Token> {
        let mut digits = String::new();
        digits.push(first);
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
            digits.push(self.bump().unwrap());
        }
        digits.parse::<i64>().map(Token::Fixnum).map_err(|e| ParseError {
            location: self.loc(),
            message: format!("malformed fixnum literal `{digits}`: {e}"),
        })
    }

    /// An atom: `#t`/`#f`, or any run of non-delimiter, non-whitespace
    /// characters read as a symbol name (`parseAtom`'s behavior,
    /// including primitive names like `+#`/`car#`/`pair?#`).
    fn scan_atom(&mut self, first: char) -> Token {
        if first == '#' {
            match self.chars.peek() {
                Some('t') => {
                    self.bump();
                    return Token::True;
                }
                Some('f') => {
                    self.bump();
                    return Token::False;
                }
                _ => {}
            }
        }
        let mut text = String::new();
        text.push(first);
        while matches!(self.chars.peek(), Some(c) if !c.is_whitespace() && *c != '(' && *c != ')' && *c != '[' && *c != ']')
        {
            text.push(self.bump().unwrap());
        }
        Token::Symbol(text)
    }

    /// Pull the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Option<ParseResult<(Token, Location)>> {
        self.skip_whitespace();
        let loc = self.loc();
        let c = self.bump()?;
        let tok = match c {
            '(' | '[' => Ok(Token::LParen),
            ')' | ']' => Ok(Token::RParen),
            '0'..='9' => self.scan_fixnum(c),
            _ => Ok(self.scan_atom(c)),
        };
        Some(tok.map(|t| (t, loc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lex = Lexer::new(src);
        let mut out = Vec::new();
        while let Some(t) = lex.next_token() {
            out.push(t.unwrap().0);
        }
        out
    }

    #[test]
    fn lexes_parens_and_atoms() {
        assert_eq!(
            tokens("(define main (lambda () 42))"),
            vec![
                Token::LParen,
                Token::Symbol("define".into()),
                Token::Symbol("main".into()),
                Token::LParen,
                Token::Symbol("lambda".into()),
                Token::LParen,
                Token::RParen,
                Token::Fixnum(42),
                Token::RParen,
                Token::RParen,
            ]
        );
    }

    #[test]
    fn lexes_booleans_and_primitive_names() {
        assert_eq!(
            tokens("(+# #t #f cons# pair?#)"),
            vec![
                Token::LParen,
                Token::Symbol("+#".into()),
                Token::True,
                Token::False,
                Token::Symbol("cons#".into()),
                Token::Symbol("pair?#".into()),
                Token::RParen,
            ]
        );
    }
}
