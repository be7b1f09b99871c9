// tests/integration_tests.rs

use nutmeg_lang::{search, Error, Expression, Value};

fn data(json: &str) -> Value {
    Value::from(serde_json::from_str::<serde_json::Value>(json).unwrap())
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_nested_field_access() {
    let doc = data(r#"{"a": {"b": {"c": 5}}}"#);
    assert_eq!(search("a.b.c", &doc).unwrap(), Value::from(5));
}

#[test]
fn test_projection_then_pipe() {
    let doc = data(r#"{"foo": [{"bar": 1}, {"bar": 2}, {"bar": 3}]}"#);
    assert_eq!(search("foo[*].bar | [0]", &doc).unwrap(), Value::from(1));
}

#[test]
fn test_filter_projection() {
    let doc = data(r#"{"foo": [{"bar": 5, "baz": "x"}, {"bar": 20, "baz": "y"}]}"#);
    assert_eq!(
        search("foo[?bar > `10`].baz", &doc).unwrap(),
        data(r#"["y"]"#)
    );
}

#[test]
fn test_length_of_keys() {
    let doc = data(r#"{"a": 1, "b": 2, "c": 3}"#);
    assert_eq!(search("length(keys(@))", &doc).unwrap(), Value::from(3));
}

#[test]
fn test_let_binding() {
    let doc = data(r#"{"a": 1, "b": 2}"#);
    assert_eq!(search("let $x = a in $x + b", &doc).unwrap(), Value::from(3));
}

#[test]
fn test_sort_by_then_project() {
    let doc = data(r#"{"items": [{"name": "A", "age": 30}, {"name": "B", "age": 10}]}"#);
    assert_eq!(
        search("sort_by(items, &age)[*].name", &doc).unwrap(),
        data(r#"["B", "A"]"#)
    );
}

#[test]
fn test_not_null_with_default() {
    let doc = data(r#"{"other": null}"#);
    assert_eq!(
        search("not_null(missing, other, `\"default\"`)", &doc).unwrap(),
        Value::String("default".to_string())
    );
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_reverse_is_involutive() {
    let doc = data(r#"{"a": [1, "x", true, [2]]}"#);
    assert_eq!(
        search("reverse(reverse(a))", &doc).unwrap(),
        search("a", &doc).unwrap()
    );

    let doc = data(r#"{"s": "héllo"}"#);
    assert_eq!(
        search("reverse(reverse(s))", &doc).unwrap(),
        Value::String("héllo".to_string())
    );
}

#[test]
fn test_sort_is_idempotent() {
    let doc = data(r#"{"a": [3, 1, 2, 1]}"#);
    assert_eq!(
        search("sort(sort(a))", &doc).unwrap(),
        search("sort(a)", &doc).unwrap()
    );
}

#[test]
fn test_length_is_preserved_by_reverse() {
    let doc = data(r#"{"a": [1, 2, 3], "s": "hello"}"#);
    assert_eq!(
        search("length(a)", &doc).unwrap(),
        search("length(reverse(a))", &doc).unwrap()
    );
    assert_eq!(
        search("length(s)", &doc).unwrap(),
        search("length(reverse(s))", &doc).unwrap()
    );
}

#[test]
fn test_negative_step_slice_equals_reverse() {
    let doc = data(r#"{"a": [1, 2, 3, 4], "s": "abcd"}"#);
    assert_eq!(
        search("a[::-1]", &doc).unwrap(),
        search("reverse(a)", &doc).unwrap()
    );
    assert_eq!(
        search("s[::-1]", &doc).unwrap(),
        search("reverse(s)", &doc).unwrap()
    );
}

#[test]
fn test_step_one_slice_agrees_with_plain_slice() {
    let doc = data(r#"{"a": [1, 2, 3, 4, 5]}"#);
    assert_eq!(
        search("a[1:4:1]", &doc).unwrap(),
        search("a[1:4]", &doc).unwrap()
    );
}

#[test]
fn test_evaluation_does_not_mutate_input() {
    let doc = data(r#"{"a": [3, 1, 2], "b": {"x": 1}}"#);
    let before = doc.clone();

    search("sort(a)", &doc).unwrap();
    search("merge(b, `{\"y\": 2}`)", &doc).unwrap();
    search("a[::-1]", &doc).unwrap();

    assert_eq!(doc, before);
}

#[test]
fn test_short_circuit_skips_right_side() {
    // The right side would fail with an undefined variable if evaluated
    let doc = data("{}");
    assert_eq!(
        search("`false` && $nope", &doc).unwrap(),
        Value::Bool(false)
    );
    assert_eq!(search("`true` || $nope", &doc).unwrap(), Value::Bool(true));
}

#[test]
fn test_short_circuit_does_not_suppress_taken_side() {
    let doc = data("{}");
    assert!(matches!(
        search("`true` && $nope", &doc),
        Err(Error::UndefinedVariable(_))
    ));
}

#[test]
fn test_merge_override() {
    let doc = data(r#"{"a": {"x": 1, "y": 2}, "b": {"y": 3, "z": 4}}"#);
    assert_eq!(
        search("merge(a, b)", &doc).unwrap(),
        data(r#"{"x": 1, "y": 3, "z": 4}"#)
    );
}

#[test]
fn test_missing_key_equals_null() {
    let doc = data(r#"{"present": null}"#);
    assert_eq!(search("missing == `null`", &doc).unwrap(), Value::Bool(true));
    assert_eq!(
        search("missing == present", &doc).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_projection_drops_nulls_map_preserves_them() {
    let doc = data(r#"{"a": [{"foo": 1}, {}, {"foo": 2}]}"#);
    assert_eq!(search("a[*].foo", &doc).unwrap(), data("[1, 2]"));
    assert_eq!(
        search("map(&foo, a)", &doc).unwrap(),
        data("[1, null, 2]")
    );
}

#[test]
fn test_number_round_trip() {
    let doc = data("{}");
    assert_eq!(
        search("to_number(to_string(`1.25`))", &doc).unwrap(),
        search("`1.25`", &doc).unwrap()
    );
}

// ============================================================================
// Boundary cases
// ============================================================================

#[test]
fn test_negative_step_slice_of_empty_array() {
    let doc = data(r#"{"a": []}"#);
    assert_eq!(search("a[::-1]", &doc).unwrap(), data("[]"));
}

#[test]
fn test_find_first_empty_cases() {
    let doc = data("{}");
    assert_eq!(search("find_first('', 'x')", &doc).unwrap(), Value::Null);
    assert_eq!(search("find_first('x', '')", &doc).unwrap(), Value::Null);
}

#[test]
fn test_division_by_zero() {
    let doc = data("{}");
    assert_eq!(search("`1` / `0`", &doc), Err(Error::Infinity));
    assert_eq!(search("`1` % `0`", &doc), Err(Error::NotANumber));
}

#[test]
fn test_float_division_by_zero() {
    // Floats enter through the API, not through JSON literals; a float
    // divided by a float zero is an infinity
    let mut m = std::collections::HashMap::new();
    m.insert("x".to_string(), Value::from(1.0));
    m.insert("zero".to_string(), Value::from(0.0));
    let doc = Value::Object(m);

    assert_eq!(search("x / zero", &doc), Err(Error::Infinity));
}

#[test]
fn test_split_edge_cases() {
    let doc = data("{}");
    assert_eq!(search("split('', 'x')", &doc).unwrap(), data("[]"));
    assert_eq!(
        search("split('abc', '', `2`)", &doc).unwrap(),
        data(r#"["a", "b", "c"]"#)
    );
}

#[test]
fn test_max_min_of_empty_array() {
    let doc = data("{}");
    assert_eq!(search("max(`[]`)", &doc).unwrap(), Value::Null);
    assert_eq!(search("min(`[]`)", &doc).unwrap(), Value::Null);
}

#[test]
fn test_sort_mixed_types_fails() {
    let doc = data("{}");
    assert!(matches!(
        search("sort(`[1, \"a\"]`)", &doc),
        Err(Error::InvalidType(_))
    ));
}

#[test]
fn test_string_slice_then_field_is_pipe_not_projection() {
    // Slicing a string and continuing with a field lookup pipes the
    // sub-string instead of projecting over its characters
    let doc = data(r#"{"s": "abcdef"}"#);
    assert_eq!(search("s[0:3].foo", &doc).unwrap(), Value::Null);
}

#[test]
fn test_decimal_precision_is_kept() {
    let doc = data(r#"{"price": 0.1, "qty": 3}"#);
    assert_eq!(
        search("price * qty", &doc).unwrap(),
        search("`0.3`", &doc).unwrap()
    );
}

// ============================================================================
// Compiled expressions
// ============================================================================

#[test]
fn test_compile_once_evaluate_many() {
    let expr = Expression::compile("a + b").unwrap();

    assert_eq!(
        expr.search(&data(r#"{"a": 1, "b": 2}"#)).unwrap(),
        Value::from(3)
    );
    assert_eq!(
        expr.search(&data(r#"{"a": 10, "b": 20}"#)).unwrap(),
        Value::from(30)
    );
}

#[test]
fn test_compile_reports_syntax_errors() {
    assert!(matches!(
        Expression::compile("foo."),
        Err(Error::Syntax(_))
    ));
}

#[test]
#[should_panic]
fn test_must_compile_panics_on_invalid_expression() {
    Expression::must_compile("foo.");
}

#[test]
fn test_compiled_expression_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Expression>();
}

// ============================================================================
// Error taxonomy
// ============================================================================

#[test]
fn test_error_kinds() {
    let doc = data(r#"{"s": "x"}"#);

    assert!(matches!(search("foo.", &doc), Err(Error::Syntax(_))));
    assert!(matches!(
        search("nope(@)", &doc),
        Err(Error::UnknownFunction(_))
    ));
    assert!(matches!(
        search("length()", &doc),
        Err(Error::InvalidArity(_))
    ));
    assert!(matches!(
        search("sum(s)", &doc),
        Err(Error::InvalidType(_))
    ));
    assert!(matches!(
        search("pad_left(s, `-1`, '0')", &doc),
        Err(Error::InvalidValue(_))
    ));
    assert!(matches!(
        search("$missing", &doc),
        Err(Error::UndefinedVariable(_))
    ));
}

#[test]
fn test_invalid_slice_step_is_syntax_error() {
    let doc = data("{}");
    assert!(matches!(search("`[]` | [::0]", &doc), Err(Error::Syntax(_))));
}
