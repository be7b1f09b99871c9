// tests/parser_tests.rs

use nutmeg_lang::ast::Node;
use nutmeg_lang::parser::{parse, ParseError};
use nutmeg_lang::Value;

fn field(name: &str) -> Node {
    Node::Field(name.to_string())
}

// ============================================================================
// Fields and pipes
// ============================================================================

#[test]
fn test_field() {
    assert_eq!(parse("a").unwrap(), field("a"));
}

#[test]
fn test_quoted_field() {
    assert_eq!(parse("\"a b\"").unwrap(), field("a b"));
    assert_eq!(parse(r#""tab\there""#).unwrap(), field("tab\there"));
}

#[test]
fn test_dot_chain_is_pipe_field() {
    assert_eq!(
        parse("a.b").unwrap(),
        Node::PipeField {
            left: Box::new(field("a")),
            field: "b".to_string(),
        }
    );

    assert_eq!(
        parse("a.b.c").unwrap(),
        Node::PipeField {
            left: Box::new(Node::PipeField {
                left: Box::new(field("a")),
                field: "b".to_string(),
            }),
            field: "c".to_string(),
        }
    );
}

#[test]
fn test_pipe() {
    assert_eq!(
        parse("a | b").unwrap(),
        Node::Pipe {
            left: Box::new(field("a")),
            right: Box::new(field("b")),
        }
    );
}

#[test]
fn test_current_and_root() {
    assert_eq!(parse("@").unwrap(), Node::Current);
    assert_eq!(parse("$").unwrap(), Node::Root);
    assert_eq!(parse("$foo").unwrap(), Node::Variable("foo".to_string()));
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn test_json_literals() {
    assert_eq!(parse("`true`").unwrap(), Node::Bool(true));
    assert_eq!(parse("`null`").unwrap(), Node::Null);
    assert_eq!(parse("`5`").unwrap(), Node::Literal(Value::from(5)));
    assert_eq!(
        parse("`\"x\"`").unwrap(),
        Node::Literal(Value::String("x".to_string()))
    );
}

#[test]
fn test_string_literal() {
    assert_eq!(
        parse("'hello'").unwrap(),
        Node::Literal(Value::String("hello".to_string()))
    );

    // Only \' and \\ are escapes; everything else stays verbatim
    assert_eq!(
        parse(r"'a\'b'").unwrap(),
        Node::Literal(Value::String("a'b".to_string()))
    );
    assert_eq!(
        parse(r"'a\nb'").unwrap(),
        Node::Literal(Value::String("a\\nb".to_string()))
    );
}

#[test]
fn test_invalid_json_literal() {
    assert!(matches!(
        parse("`{bad`"),
        Err(ParseError::InvalidJsonLiteral(_))
    ));
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    // `1` + `2` * `3` => Add(1, Multiply(2, 3))
    match parse("`1` + `2` * `3`").unwrap() {
        Node::Add { left, right } => {
            assert_eq!(*left, Node::Literal(Value::from(1)));
            assert!(matches!(*right, Node::Multiply { .. }));
        }
        other => panic!("expected addition, got {:?}", other),
    }
}

#[test]
fn test_parentheses_override_precedence() {
    // (`1` + `2`) * `3` => Multiply(Add(1, 2), 3)
    match parse("(`1` + `2`) * `3`").unwrap() {
        Node::Multiply { left, right } => {
            assert!(matches!(*left, Node::Add { .. }));
            assert_eq!(*right, Node::Literal(Value::from(3)));
        }
        other => panic!("expected multiplication, got {:?}", other),
    }
}

#[test]
fn test_comparison_binds_tighter_than_and() {
    match parse("a > b && c").unwrap() {
        Node::And { left, .. } => assert!(matches!(*left, Node::Greater { .. })),
        other => panic!("expected and, got {:?}", other),
    }
}

#[test]
fn test_pipe_binds_loosest() {
    match parse("a || b | c").unwrap() {
        Node::Pipe { left, .. } => assert!(matches!(*left, Node::Or { .. })),
        other => panic!("expected pipe, got {:?}", other),
    }
}

// ============================================================================
// Indexes and slices
// ============================================================================

#[test]
fn test_small_index_current() {
    assert_eq!(parse("[0]").unwrap(), Node::SmallIndexCurrent(0));
    assert_eq!(parse("[255]").unwrap(), Node::SmallIndexCurrent(255));
}

#[test]
fn test_large_and_negative_index_current() {
    assert_eq!(parse("[256]").unwrap(), Node::IndexCurrent { index: 256 });
    assert_eq!(parse("[-1]").unwrap(), Node::IndexCurrent { index: -1 });
}

#[test]
fn test_index_with_child() {
    assert_eq!(
        parse("foo[3]").unwrap(),
        Node::Index {
            child: Box::new(field("foo")),
            index: 3,
        }
    );
}

#[test]
fn test_slice_defaults() {
    assert_eq!(
        parse("foo[1:2]").unwrap(),
        Node::Slice {
            child: Box::new(field("foo")),
            start: 1,
            stop: 2,
        }
    );

    assert_eq!(
        parse("[:]").unwrap(),
        Node::SliceCurrent {
            start: 0,
            stop: i64::MAX,
        }
    );

    assert_eq!(
        parse("[2:]").unwrap(),
        Node::SliceCurrent {
            start: 2,
            stop: i64::MAX,
        }
    );
}

#[test]
fn test_slice_step_defaults_invert_for_negative_step() {
    assert_eq!(
        parse("[::2]").unwrap(),
        Node::SliceStepCurrent {
            start: 0,
            stop: i64::MAX,
            step: 2,
        }
    );

    assert_eq!(
        parse("[::-1]").unwrap(),
        Node::SliceStepCurrent {
            start: i64::MAX,
            stop: i64::MIN,
            step: -1,
        }
    );
}

#[test]
fn test_slice_step_zero_is_error() {
    assert_eq!(parse("[::0]"), Err(ParseError::InvalidSliceStep));
    assert_eq!(parse("foo[1:2:0]"), Err(ParseError::InvalidSliceStep));
}

// ============================================================================
// Projections and pruners
// ============================================================================

#[test]
fn test_wildcard_without_body_is_pruner() {
    assert_eq!(
        parse("foo[*]").unwrap(),
        Node::PruneArray {
            child: Box::new(field("foo")),
        }
    );

    assert_eq!(parse("[*]").unwrap(), Node::PruneArrayCurrent);

    assert_eq!(
        parse("foo[]").unwrap(),
        Node::Flatten {
            child: Box::new(field("foo")),
        }
    );

    assert_eq!(
        parse("foo.*").unwrap(),
        Node::ObjectValues {
            child: Box::new(field("foo")),
        }
    );
}

#[test]
fn test_wildcard_with_body_is_projection() {
    assert_eq!(
        parse("foo[*].bar").unwrap(),
        Node::ProjectArray {
            left: Box::new(field("foo")),
            right: Box::new(field("bar")),
        }
    );

    assert_eq!(
        parse("foo[].bar").unwrap(),
        Node::FlattenProject {
            left: Box::new(field("foo")),
            right: Box::new(field("bar")),
        }
    );
}

#[test]
fn test_filter_specialization() {
    assert_eq!(
        parse("foo[?bar]").unwrap(),
        Node::Filter {
            child: Box::new(field("foo")),
            filter: Box::new(field("bar")),
        }
    );

    assert_eq!(
        parse("foo[?bar].baz").unwrap(),
        Node::FilterProject {
            left: Box::new(field("foo")),
            filter: Box::new(field("bar")),
            right: Box::new(field("baz")),
        }
    );

    assert_eq!(
        parse("[?bar]").unwrap(),
        Node::FilterCurrent {
            filter: Box::new(field("bar")),
        }
    );
}

#[test]
fn test_projection_swallows_dot_chain() {
    // The continuation after a projection extends the projection body
    // instead of piping the projection result
    assert_eq!(
        parse("foo[*].bar.baz").unwrap(),
        Node::ProjectArray {
            left: Box::new(field("foo")),
            right: Box::new(Node::PipeField {
                left: Box::new(field("bar")),
                field: "baz".to_string(),
            }),
        }
    );
}

#[test]
fn test_dot_after_slice_projection_stays_projection() {
    // A slice projects; the field after its body chains as a new
    // projection rather than a pipe
    assert_eq!(
        parse("foo[1:2].bar.baz").unwrap(),
        Node::ProjectArray {
            left: Box::new(Node::ProjectArray {
                left: Box::new(Node::Slice {
                    child: Box::new(field("foo")),
                    start: 1,
                    stop: 2,
                }),
                right: Box::new(field("bar")),
            }),
            right: Box::new(field("baz")),
        }
    );
}

// ============================================================================
// Multiselect
// ============================================================================

#[test]
fn test_select_object_single() {
    assert_eq!(
        parse("{x: a}").unwrap(),
        Node::SelectObjectSingleCurrent {
            key: "x".to_string(),
            field: Box::new(field("a")),
        }
    );
}

#[test]
fn test_select_object_multi() {
    assert_eq!(
        parse("foo.{x: a, y: b}").unwrap(),
        Node::SelectObject {
            child: Box::new(field("foo")),
            fields: vec![
                ("x".to_string(), field("a")),
                ("y".to_string(), field("b")),
            ],
        }
    );
}

#[test]
fn test_select_array() {
    assert_eq!(
        parse("[a]").unwrap(),
        Node::SelectArraySingleCurrent {
            field: Box::new(field("a")),
        }
    );

    assert_eq!(
        parse("foo.[a, b]").unwrap(),
        Node::SelectArray {
            child: Box::new(field("foo")),
            fields: vec![field("a"), field("b")],
        }
    );
}

// ============================================================================
// Unary operators
// ============================================================================

#[test]
fn test_unary_operators() {
    assert_eq!(
        parse("!a").unwrap(),
        Node::Not {
            child: Box::new(field("a")),
        }
    );

    assert_eq!(
        parse("+a").unwrap(),
        Node::AssertNumber {
            child: Box::new(field("a")),
        }
    );

    assert_eq!(
        parse("-a").unwrap(),
        Node::Negate {
            child: Box::new(field("a")),
        }
    );
}

// ============================================================================
// Let bindings
// ============================================================================

#[test]
fn test_let() {
    assert_eq!(
        parse("let $x = a in $x").unwrap(),
        Node::DefineVariables {
            bindings: vec![("x".to_string(), field("a"))],
            child: Box::new(Node::Variable("x".to_string())),
        }
    );
}

#[test]
fn test_let_multiple_bindings() {
    assert_eq!(
        parse("let $x = a, $y = b in $y").unwrap(),
        Node::DefineVariables {
            bindings: vec![
                ("x".to_string(), field("a")),
                ("y".to_string(), field("b")),
            ],
            child: Box::new(Node::Variable("y".to_string())),
        }
    );
}

#[test]
fn test_let_requires_assignment() {
    assert!(matches!(
        parse("let $x in $x"),
        Err(ParseError::UnexpectedToken(_))
    ));
}

// ============================================================================
// Function calls
// ============================================================================

#[test]
fn test_function_call() {
    assert_eq!(
        parse("length(@)").unwrap(),
        Node::Length(Box::new(Node::Current))
    );

    assert_eq!(
        parse("contains(a, b)").unwrap(),
        Node::Contains(Box::new([field("a"), field("b")]))
    );
}

#[test]
fn test_unknown_function() {
    assert_eq!(
        parse("nope(@)"),
        Err(ParseError::UnknownFunction("nope".to_string()))
    );
}

#[test]
fn test_function_arity_errors() {
    assert_eq!(
        parse("length()"),
        Err(ParseError::InvalidFunctionCall("length".to_string()))
    );

    assert_eq!(
        parse("length(a, b)"),
        Err(ParseError::InvalidFunctionCall("length".to_string()))
    );

    assert_eq!(
        parse("contains(a)"),
        Err(ParseError::InvalidFunctionCall("contains".to_string()))
    );
}

#[test]
fn test_expression_reference_required() {
    assert_eq!(
        parse("sort_by(a, b)"),
        Err(ParseError::InvalidFunctionArgument {
            function: "sort_by".to_string(),
            want: "expression",
        })
    );

    assert_eq!(
        parse("map(a, b)"),
        Err(ParseError::InvalidFunctionArgument {
            function: "map".to_string(),
            want: "expression",
        })
    );
}

#[test]
fn test_expression_reference() {
    assert_eq!(
        parse("sort_by(a, &b)").unwrap(),
        Node::SortBy(Box::new([field("a"), field("b")]))
    );
}

#[test]
fn test_trim_arity_selects_variant() {
    assert_eq!(
        parse("trim(a)").unwrap(),
        Node::TrimSpace(Box::new(field("a")))
    );

    assert_eq!(
        parse("trim(a, b)").unwrap(),
        Node::Trim(Box::new([field("a"), field("b")]))
    );
}

#[test]
fn test_pad_arity_selects_variant() {
    assert_eq!(
        parse("pad_left(a, b)").unwrap(),
        Node::PadSpaceLeft(Box::new([field("a"), field("b")]))
    );

    assert_eq!(
        parse("pad_left(a, b, c)").unwrap(),
        Node::PadLeft(Box::new([field("a"), field("b"), field("c")]))
    );
}

#[test]
fn test_find_first_arities() {
    assert_eq!(
        parse("find_first(a, b)").unwrap(),
        Node::FindFirst(Box::new([field("a"), field("b")]))
    );

    assert_eq!(
        parse("find_first(a, b, c)").unwrap(),
        Node::FindFirstFrom(Box::new([field("a"), field("b"), field("c")]))
    );

    assert_eq!(
        parse("find_first(a, b, c, d)").unwrap(),
        Node::FindFirstBetween(Box::new([field("a"), field("b"), field("c"), field("d")]))
    );
}

#[test]
fn test_not_null_specializations() {
    assert_eq!(
        parse("not_null(a)").unwrap(),
        Node::NotNullDefault {
            argument: Box::new(field("a")),
            default: Value::Null,
        }
    );

    assert_eq!(
        parse("not_null(a, `5`)").unwrap(),
        Node::NotNullDefault {
            argument: Box::new(field("a")),
            default: Value::from(5),
        }
    );

    assert_eq!(
        parse("not_null(a, b)").unwrap(),
        Node::NotNull(vec![field("a"), field("b")])
    );

    assert_eq!(
        parse("not_null(a, b, `1`)").unwrap(),
        Node::NotNull(vec![field("a"), field("b"), Node::Literal(Value::from(1))])
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_expression() {
    assert!(matches!(parse(""), Err(ParseError::UnexpectedToken(_))));
}

#[test]
fn test_trailing_dot() {
    assert!(matches!(parse("foo."), Err(ParseError::UnexpectedToken(_))));
}

#[test]
fn test_trailing_garbage() {
    assert!(matches!(parse("@ @"), Err(ParseError::UnexpectedToken(_))));
}

#[test]
fn test_unclosed_paren() {
    assert!(matches!(parse("(a"), Err(ParseError::UnexpectedToken(_))));
}

#[test]
fn test_lex_error_propagates() {
    assert!(matches!(parse("'abc"), Err(ParseError::Lex(_))));
}
