// tests/lexer_tests.rs

use nutmeg_lang::ast::TokenKind;
use nutmeg_lang::lexer::{LexError, Lexer};

fn kinds(input: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(input);
    let mut result = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token.kind == TokenKind::End {
            return result;
        }
        result.push(token.kind);
    }
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("{", TokenKind::OpenBrace),
        ("}", TokenKind::CloseBrace),
        ("(", TokenKind::OpenParen),
        (")", TokenKind::CloseParen),
        ("]", TokenKind::CloseSqBrace),
        ("+", TokenKind::Add),
        ("*", TokenKind::Asterisk),
        (":", TokenKind::Colon),
        (",", TokenKind::Comma),
        ("/", TokenKind::Divide),
        (".", TokenKind::Dot),
        (">", TokenKind::Greater),
        ("<", TokenKind::Less),
        ("%", TokenKind::Modulo),
        ("!", TokenKind::Not),
        ("|", TokenKind::Pipe),
        ("-", TokenKind::Subtract),
        ("@", TokenKind::Current),
        ("&", TokenKind::Expression),
        ("$", TokenKind::Root),
        ("=", TokenKind::Assign),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }
}

// ============================================================================
// Multi Character Tokens
// ============================================================================

#[test]
fn test_multi_char_tokens() {
    let test_cases = vec![
        ("&&", TokenKind::And),
        ("||", TokenKind::Or),
        ("==", TokenKind::Equal),
        ("!=", TokenKind::NotEqual),
        ("<=", TokenKind::LessOrEqual),
        (">=", TokenKind::GreaterOrEqual),
        ("//", TokenKind::IntegerDivide),
        (".*", TokenKind::ObjectWildcard),
        ("[*]", TokenKind::ArrayWildcard),
        ("[?", TokenKind::Filter),
        ("[]", TokenKind::Flatten),
    ];

    for (input, expected) in test_cases {
        let mut lexer = Lexer::new(input);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, expected, "Failed for input: {}", input);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }
}

#[test]
fn test_unicode_operators() {
    assert_eq!(kinds("×"), vec![TokenKind::Multiply]);
    assert_eq!(kinds("÷"), vec![TokenKind::Divide]);
    assert_eq!(kinds("−"), vec![TokenKind::Subtract]);
}

#[test]
fn test_open_bracket_not_special() {
    // `[` followed by anything other than `*]`, `?`, or `]` stays a plain
    // open bracket
    assert_eq!(
        kinds("[0]"),
        vec![
            TokenKind::OpenSqBrace,
            TokenKind::IntegerLiteral,
            TokenKind::CloseSqBrace
        ]
    );

    assert_eq!(
        kinds("[*"),
        vec![TokenKind::OpenSqBrace, TokenKind::Asterisk]
    );
}

// ============================================================================
// Identifiers and Keywords
// ============================================================================

#[test]
fn test_identifiers() {
    let mut lexer = Lexer::new("foo _bar baz_2");
    for expected in ["foo", "_bar", "baz_2"] {
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::UnquotedIdentifier);
        assert_eq!(token.text, expected);
    }
}

#[test]
fn test_keywords() {
    assert_eq!(kinds("let in"), vec![TokenKind::Let, TokenKind::In]);

    // Only exact matches are keywords
    assert_eq!(kinds("lets"), vec![TokenKind::UnquotedIdentifier]);
    assert_eq!(kinds("int"), vec![TokenKind::UnquotedIdentifier]);
}

#[test]
fn test_root_and_variable() {
    let mut lexer = Lexer::new("$ $foo $_x");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Root);

    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Variable);
    assert_eq!(token.text, "$foo");

    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::Variable);
    assert_eq!(token.text, "$_x");
}

#[test]
fn test_dollar_before_digit_is_root() {
    assert_eq!(
        kinds("$1"),
        vec![TokenKind::Root, TokenKind::IntegerLiteral]
    );
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_integer_literals() {
    let mut lexer = Lexer::new("0 42 007");
    for expected in ["0", "42", "007"] {
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::IntegerLiteral);
        assert_eq!(token.text, expected);
    }
}

#[test]
fn test_negative_integer_literal() {
    let mut lexer = Lexer::new("-42");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::IntegerLiteral);
    assert_eq!(token.text, "-42");
}

#[test]
fn test_minus_without_digit_is_subtract() {
    assert_eq!(
        kinds("a - b"),
        vec![
            TokenKind::UnquotedIdentifier,
            TokenKind::Subtract,
            TokenKind::UnquotedIdentifier
        ]
    );
}

// ============================================================================
// Delimited Literals
// ============================================================================

#[test]
fn test_quoted_identifier_keeps_delimiters() {
    let mut lexer = Lexer::new("\"foo bar\"");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::QuotedIdentifier);
    assert_eq!(token.text, "\"foo bar\"");
}

#[test]
fn test_string_literal_keeps_escapes() {
    let mut lexer = Lexer::new(r"'it\'s'");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::StringLiteral);
    assert_eq!(token.text, r"'it\'s'");
}

#[test]
fn test_json_literal() {
    let mut lexer = Lexer::new("`{\"a\": 1}`");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::JsonLiteral);
    assert_eq!(token.text, "`{\"a\": 1}`");
}

#[test]
fn test_escaped_backtick_stays_inside_literal() {
    let mut lexer = Lexer::new(r"`\``");
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, TokenKind::JsonLiteral);
    assert_eq!(token.text, r"`\``");
}

// ============================================================================
// Whitespace and End
// ============================================================================

#[test]
fn test_whitespace_is_skipped() {
    assert_eq!(
        kinds(" \t\r\n a \n"),
        vec![TokenKind::UnquotedIdentifier]
    );
}

#[test]
fn test_end_repeats() {
    let mut lexer = Lexer::new("");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unterminated_string() {
    let mut lexer = Lexer::new("'abc");
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnexpectedEndOfExpression)
    );
}

#[test]
fn test_unterminated_quoted_identifier() {
    let mut lexer = Lexer::new("\"abc");
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnexpectedEndOfExpression)
    );
}

#[test]
fn test_trailing_escape() {
    let mut lexer = Lexer::new("'abc\\");
    assert_eq!(
        lexer.next_token(),
        Err(LexError::UnexpectedEndOfExpression)
    );
}

#[test]
fn test_unexpected_rune() {
    let mut lexer = Lexer::new("#");
    assert_eq!(lexer.next_token(), Err(LexError::UnexpectedRune('#')));
}

// ============================================================================
// Full Expressions
// ============================================================================

#[test]
fn test_filter_expression_stream() {
    assert_eq!(
        kinds("foo[?bar > `10`].baz"),
        vec![
            TokenKind::UnquotedIdentifier,
            TokenKind::Filter,
            TokenKind::UnquotedIdentifier,
            TokenKind::Greater,
            TokenKind::JsonLiteral,
            TokenKind::CloseSqBrace,
            TokenKind::Dot,
            TokenKind::UnquotedIdentifier,
        ]
    );
}

#[test]
fn test_let_expression_stream() {
    assert_eq!(
        kinds("let $x = a in $x"),
        vec![
            TokenKind::Let,
            TokenKind::Variable,
            TokenKind::Assign,
            TokenKind::UnquotedIdentifier,
            TokenKind::In,
            TokenKind::Variable,
        ]
    );
}
