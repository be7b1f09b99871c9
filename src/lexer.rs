use crate::ast::{Token, TokenKind};

/// Errors produced while scanning an expression. Both are syntax errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// The expression ended inside a literal or after an escape.
    UnexpectedEndOfExpression,
    /// A rune that cannot start or continue any token.
    UnexpectedRune(char),
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::UnexpectedEndOfExpression => write!(f, "unexpected end of expression"),
            LexError::UnexpectedRune(r) => write!(f, "unexpected rune {:?}", r),
        }
    }
}

impl std::error::Error for LexError {}

/// A byte-cursor scanner over an expression string.
///
/// The lexer never mutates or copies the input; every token borrows its
/// slice from it. Literal tokens keep their delimiters and escape sequences
/// so the parser can resolve them with full context.
pub struct Lexer<'a> {
    expression: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(expression: &'a str) -> Self {
        Lexer {
            expression,
            position: 0,
        }
    }

    fn decode(&self, pos: usize) -> Option<(char, usize)> {
        self.expression[pos..].chars().next().map(|r| (r, r.len_utf8()))
    }

    fn token(&mut self, kind: TokenKind, start: usize, end: usize) -> Token<'a> {
        self.position = end;
        Token::new(kind, &self.expression[start..end])
    }

    /// Produce the next token. Returns `End` indefinitely once the input is
    /// exhausted.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        let mut r;
        let mut sz;
        loop {
            match self.decode(self.position) {
                None => return Ok(Token::end()),
                Some((c, s)) => {
                    r = c;
                    sz = s;
                }
            }

            if r != '\t' && r != '\n' && r != '\r' && r != ' ' {
                break;
            }

            self.position += sz;
        }

        let start = self.position;

        match r {
            '"' => self.quoted_identifier(start, start + sz),
            '$' => Ok(self.variable(start, start + sz)),
            '%' => Ok(self.token(TokenKind::Modulo, start, start + sz)),
            '&' => match self.decode(start + sz) {
                Some(('&', nsz)) => Ok(self.token(TokenKind::And, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::Expression, start, start + sz)),
            },
            '\'' => self.string_literal(start, start + sz),
            '(' => Ok(self.token(TokenKind::OpenParen, start, start + sz)),
            ')' => Ok(self.token(TokenKind::CloseParen, start, start + sz)),
            '*' => Ok(self.token(TokenKind::Asterisk, start, start + sz)),
            '+' => Ok(self.token(TokenKind::Add, start, start + sz)),
            ',' => Ok(self.token(TokenKind::Comma, start, start + sz)),
            '-' => match self.decode(start + sz) {
                Some((n, nsz)) if n.is_ascii_digit() => {
                    Ok(self.number_literal(start, start + sz + nsz))
                }
                _ => Ok(self.token(TokenKind::Subtract, start, start + sz)),
            },
            '.' => match self.decode(start + sz) {
                Some(('*', nsz)) => {
                    Ok(self.token(TokenKind::ObjectWildcard, start, start + sz + nsz))
                }
                _ => Ok(self.token(TokenKind::Dot, start, start + sz)),
            },
            '/' => match self.decode(start + sz) {
                Some(('/', nsz)) => {
                    Ok(self.token(TokenKind::IntegerDivide, start, start + sz + nsz))
                }
                _ => Ok(self.token(TokenKind::Divide, start, start + sz)),
            },
            ':' => Ok(self.token(TokenKind::Colon, start, start + sz)),
            '<' => match self.decode(start + sz) {
                Some(('=', nsz)) => Ok(self.token(TokenKind::LessOrEqual, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::Less, start, start + sz)),
            },
            '=' => match self.decode(start + sz) {
                Some(('=', nsz)) => Ok(self.token(TokenKind::Equal, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::Assign, start, start + sz)),
            },
            '>' => match self.decode(start + sz) {
                Some(('=', nsz)) => {
                    Ok(self.token(TokenKind::GreaterOrEqual, start, start + sz + nsz))
                }
                _ => Ok(self.token(TokenKind::Greater, start, start + sz)),
            },
            '@' => Ok(self.token(TokenKind::Current, start, start + sz)),
            '[' => match self.decode(start + sz) {
                Some(('*', nsz)) => match self.decode(start + sz + nsz) {
                    Some((']', nnsz)) => {
                        Ok(self.token(TokenKind::ArrayWildcard, start, start + sz + nsz + nnsz))
                    }
                    _ => Ok(self.token(TokenKind::OpenSqBrace, start, start + sz)),
                },
                Some(('?', nsz)) => Ok(self.token(TokenKind::Filter, start, start + sz + nsz)),
                Some((']', nsz)) => Ok(self.token(TokenKind::Flatten, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::OpenSqBrace, start, start + sz)),
            },
            ']' => Ok(self.token(TokenKind::CloseSqBrace, start, start + sz)),
            '`' => self.json_literal(start, start + sz),
            '{' => Ok(self.token(TokenKind::OpenBrace, start, start + sz)),
            '|' => match self.decode(start + sz) {
                Some(('|', nsz)) => Ok(self.token(TokenKind::Or, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::Pipe, start, start + sz)),
            },
            '}' => Ok(self.token(TokenKind::CloseBrace, start, start + sz)),
            '\u{00d7}' => Ok(self.token(TokenKind::Multiply, start, start + sz)),
            '\u{00f7}' => Ok(self.token(TokenKind::Divide, start, start + sz)),
            '\u{2212}' => Ok(self.token(TokenKind::Subtract, start, start + sz)),
            '!' => match self.decode(start + sz) {
                Some(('=', nsz)) => Ok(self.token(TokenKind::NotEqual, start, start + sz + nsz)),
                _ => Ok(self.token(TokenKind::Not, start, start + sz)),
            },
            _ if r.is_ascii_digit() => Ok(self.number_literal(start, start + sz)),
            _ if r.is_ascii_alphabetic() || r == '_' => {
                Ok(self.unquoted_identifier(start, start + sz))
            }
            _ => Err(LexError::UnexpectedRune(r)),
        }
    }

    fn delimited(
        &mut self,
        kind: TokenKind,
        delimiter: char,
        start: usize,
        mut next: usize,
    ) -> Result<Token<'a>, LexError> {
        loop {
            let (r, sz) = self
                .decode(next)
                .ok_or(LexError::UnexpectedEndOfExpression)?;

            next += sz;

            if r == delimiter {
                return Ok(self.token(kind, start, next));
            }

            if r == '\\' {
                let (_, sz) = self
                    .decode(next)
                    .ok_or(LexError::UnexpectedEndOfExpression)?;

                next += sz;
            }
        }
    }

    fn json_literal(&mut self, start: usize, next: usize) -> Result<Token<'a>, LexError> {
        self.delimited(TokenKind::JsonLiteral, '`', start, next)
    }

    fn quoted_identifier(&mut self, start: usize, next: usize) -> Result<Token<'a>, LexError> {
        self.delimited(TokenKind::QuotedIdentifier, '"', start, next)
    }

    fn string_literal(&mut self, start: usize, next: usize) -> Result<Token<'a>, LexError> {
        self.delimited(TokenKind::StringLiteral, '\'', start, next)
    }

    fn number_literal(&mut self, start: usize, mut next: usize) -> Token<'a> {
        while let Some((r, sz)) = self.decode(next) {
            if !r.is_ascii_digit() {
                break;
            }

            next += sz;
        }

        self.token(TokenKind::IntegerLiteral, start, next)
    }

    fn unquoted_identifier(&mut self, start: usize, mut next: usize) -> Token<'a> {
        while let Some((r, sz)) = self.decode(next) {
            if !r.is_ascii_alphanumeric() && r != '_' {
                break;
            }

            next += sz;
        }

        let kind = match &self.expression[start..next] {
            "in" => TokenKind::In,
            "let" => TokenKind::Let,
            _ => TokenKind::UnquotedIdentifier,
        };

        self.token(kind, start, next)
    }

    fn variable(&mut self, start: usize, mut next: usize) -> Token<'a> {
        match self.decode(next) {
            Some((r, sz)) if r.is_ascii_alphabetic() || r == '_' => {
                next += sz;
            }
            _ => return self.token(TokenKind::Root, start, next),
        }

        while let Some((r, sz)) = self.decode(next) {
            if !r.is_ascii_alphanumeric() && r != '_' {
                break;
            }

            next += sz;
        }

        self.token(TokenKind::Variable, start, next)
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("let in");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Let);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::In);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
}

#[test]
fn test_root_and_variable() {
    let mut lexer = Lexer::new("$ $foo");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Root);

    let tok = lexer.next_token().unwrap();
    assert_eq!(tok.kind, TokenKind::Variable);
    assert_eq!(tok.text, "$foo");
}

#[test]
fn test_bracket_forms() {
    let mut lexer = Lexer::new("[*] [? [] [");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::ArrayWildcard);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Filter);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Flatten);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::OpenSqBrace);
}
