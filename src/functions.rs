//! Pure built-in operations over [`Value`].
//!
//! Everything here is context-free: these functions see already-evaluated
//! values and never touch the expression tree. Higher-order built-ins that
//! re-enter evaluation (`sort_by`, `map`, projections) live in the
//! evaluator.
//!
//! Arithmetic follows one rule throughout: if *both* operands are binary
//! floats, the operation is performed in floats; otherwise both operands
//! are coerced to exact decimals. A non-finite result is an error, never a
//! value.

use rust_decimal::Decimal;

use crate::evaluator::EvalError;
use crate::output::to_json;
use crate::value::{parse_decimal, IntValue, Value};

fn invalid_type(got: &Value, want: &'static str) -> EvalError {
    EvalError::InvalidType {
        got: got.type_name(),
        want,
    }
}

fn require_decimal(v: &Value) -> Result<Decimal, EvalError> {
    v.as_decimal().ok_or_else(|| invalid_type(v, "number"))
}

fn require_array<'a>(v: &'a Value) -> Result<&'a Vec<Value>, EvalError> {
    match v {
        Value::Array(a) => Ok(a),
        _ => Err(invalid_type(v, "array")),
    }
}

fn require_string<'a>(v: &'a Value) -> Result<&'a str, EvalError> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(invalid_type(v, "string")),
    }
}

/// Coerce a positional argument to an integer, reporting non-numbers as a
/// type error and fractional or out-of-range numbers as a value error.
fn require_int(v: &Value) -> Result<i64, EvalError> {
    match v.as_index_int() {
        IntValue::Int(i) => Ok(i),
        IntValue::NotInteger(d) => Err(EvalError::IntegerConversion(d)),
        IntValue::NotNumber => Err(invalid_type(v, "number")),
    }
}

/// The lower bound of a between-search. A bound that is not a number at
/// all is reported ahead of one that is merely not an integer, so the type
/// of the upper bound is inspected before the lower bound's conversion
/// failure surfaces.
fn require_between_start(start: &Value, finish: &Value) -> Result<i64, EvalError> {
    match start.as_index_int() {
        IntValue::Int(i) => Ok(i),
        IntValue::NotNumber => Err(invalid_type(start, "number")),
        IntValue::NotInteger(d) => {
            if let IntValue::NotNumber = finish.as_index_int() {
                return Err(invalid_type(finish, "number"));
            }

            Err(EvalError::IntegerConversion(d))
        }
    }
}

fn float_result(r: f64) -> Result<Value, EvalError> {
    if r.is_infinite() {
        return Err(EvalError::Infinity);
    }

    if r.is_nan() {
        return Err(EvalError::NotANumber);
    }

    Ok(Value::from(r))
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

pub fn add(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result(xf + yf);
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_add(yd).map(Value::from).ok_or(EvalError::Infinity)
}

pub fn subtract(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result(xf - yf);
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_sub(yd).map(Value::from).ok_or(EvalError::Infinity)
}

pub fn multiply(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result(xf * yf);
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_mul(yd).map(Value::from).ok_or(EvalError::Infinity)
}

pub fn divide(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result(xf / yf);
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_div(yd).map(Value::from).ok_or(EvalError::Infinity)
}

/// Floor-quotient division.
pub fn integer_divide(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result((xf / yf).floor());
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_div(yd)
        .map(|r| Value::from(r.floor()))
        .ok_or(EvalError::Infinity)
}

pub fn modulo(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Some((xf, yf)) = Value::float_pair(x, y) {
        return float_result(xf % yf);
    }

    let xd = require_decimal(x)?;
    let yd = require_decimal(y)?;

    xd.checked_rem(yd)
        .map(Value::from)
        .ok_or(EvalError::NotANumber)
}

pub fn abs(v: &Value) -> Result<Value, EvalError> {
    if let Some(f) = v.as_float() {
        return Ok(Value::from(f.abs()));
    }

    Ok(Value::from(require_decimal(v)?.abs()))
}

pub fn ceil(v: &Value) -> Result<Value, EvalError> {
    if let Some(f) = v.as_float() {
        return Ok(Value::from(f.ceil()));
    }

    Ok(Value::from(require_decimal(v)?.ceil()))
}

pub fn floor(v: &Value) -> Result<Value, EvalError> {
    if let Some(f) = v.as_float() {
        return Ok(Value::from(f.floor()));
    }

    Ok(Value::from(require_decimal(v)?.floor()))
}

pub fn avg(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    if a.is_empty() {
        return Ok(Value::Null);
    }

    let mut r = Decimal::ZERO;
    for v in a {
        let d = require_decimal(v)?;
        r = r.checked_add(d).ok_or(EvalError::Infinity)?;
    }

    r.checked_div(Decimal::from(a.len() as u64))
        .map(Value::from)
        .ok_or(EvalError::Infinity)
}

pub fn sum(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    let mut r = Decimal::ZERO;
    for v in a {
        let d = require_decimal(v)?;
        r = r.checked_add(d).ok_or(EvalError::Infinity)?;
    }

    Ok(Value::from(r))
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Ordering is total only over numbers; comparing anything else yields
/// `Null`, not an error.
pub fn less(x: &Value, y: &Value) -> Value {
    match (x.as_decimal(), y.as_decimal()) {
        (Some(xd), Some(yd)) => Value::Bool(xd < yd),
        _ => Value::Null,
    }
}

pub fn less_or_equal(x: &Value, y: &Value) -> Value {
    match (x.as_decimal(), y.as_decimal()) {
        (Some(xd), Some(yd)) => Value::Bool(xd <= yd),
        _ => Value::Null,
    }
}

pub fn greater(x: &Value, y: &Value) -> Value {
    match (x.as_decimal(), y.as_decimal()) {
        (Some(xd), Some(yd)) => Value::Bool(xd > yd),
        _ => Value::Null,
    }
}

pub fn greater_or_equal(x: &Value, y: &Value) -> Value {
    match (x.as_decimal(), y.as_decimal()) {
        (Some(xd), Some(yd)) => Value::Bool(xd >= yd),
        _ => Value::Null,
    }
}

pub fn contains(x: &Value, y: &Value) -> Result<Value, EvalError> {
    if let Value::String(s) = x {
        if let Value::String(sub) = y {
            return Ok(Value::Bool(s.contains(sub.as_str())));
        }

        return Ok(Value::Bool(false));
    }

    if let Value::Array(a) = x {
        return Ok(Value::Bool(a.iter().any(|v| v == y)));
    }

    Err(invalid_type(x, "array"))
}

// ---------------------------------------------------------------------------
// Generic value operations
// ---------------------------------------------------------------------------

/// Length of an array or object in entries, of a string in code points.
pub fn length(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::Array(a) => Ok(Value::from(a.len())),
        Value::Object(o) => Ok(Value::from(o.len())),
        Value::String(s) => Ok(Value::from(s.chars().count())),
        _ => Err(invalid_type(v, "array")),
    }
}

pub fn reverse(v: &Value) -> Result<Value, EvalError> {
    match v {
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        Value::Array(a) => Ok(Value::Array(a.iter().rev().cloned().collect())),
        _ => Err(invalid_type(v, "array")),
    }
}

pub fn type_of(v: &Value) -> Value {
    Value::String(v.type_name().to_string())
}

pub fn to_array(v: &Value) -> Value {
    match v {
        Value::Array(_) => v.clone(),
        _ => Value::Array(vec![v.clone()]),
    }
}

pub fn to_number(v: &Value) -> Value {
    match v {
        Value::Number(_) => v.clone(),
        Value::String(s) => match parse_decimal(s) {
            Some(d) => Value::from(d),
            None => Value::Null,
        },
        _ => Value::Null,
    }
}

pub fn to_string(v: &Value) -> Value {
    match v {
        Value::String(_) => v.clone(),
        _ => Value::String(to_json(v)),
    }
}

pub fn upper(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::String(require_string(v)?.to_uppercase()))
}

pub fn lower(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::String(require_string(v)?.to_lowercase()))
}

// ---------------------------------------------------------------------------
// Object operations
// ---------------------------------------------------------------------------

fn require_object<'a>(
    v: &'a Value,
) -> Result<&'a std::collections::HashMap<String, Value>, EvalError> {
    match v {
        Value::Object(o) => Ok(o),
        _ => Err(invalid_type(v, "object")),
    }
}

pub fn keys(v: &Value) -> Result<Value, EvalError> {
    let o = require_object(v)?;
    Ok(Value::Array(
        o.keys().map(|k| Value::String(k.clone())).collect(),
    ))
}

pub fn values(v: &Value) -> Result<Value, EvalError> {
    let o = require_object(v)?;
    Ok(Value::Array(o.values().cloned().collect()))
}

/// Object entries as an array of two-element `[key, value]` arrays.
pub fn items(v: &Value) -> Result<Value, EvalError> {
    let o = require_object(v)?;
    Ok(Value::Array(
        o.iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect(),
    ))
}

/// Inverse of [`items`]: an array of two-element arrays with string keys
/// becomes an object.
pub fn from_items(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    let mut r = std::collections::HashMap::with_capacity(a.len());
    for item in a {
        let pair = require_array(item)?;

        if pair.len() != 2 {
            return Err(EvalError::FromItemsLength(pair.len()));
        }

        let key = match &pair[0] {
            Value::String(s) => s.clone(),
            other => return Err(EvalError::FromItemsKey(other.type_name())),
        };

        r.insert(key, pair[1].clone());
    }

    Ok(Value::Object(r))
}

/// The object behind an object-wildcard: values of an object, `Null` for
/// anything else.
pub fn object_values(v: &Value) -> Value {
    match v {
        Value::Object(o) => Value::Array(o.values().cloned().collect()),
        _ => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Array operations
// ---------------------------------------------------------------------------

pub fn array_max(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    if a.is_empty() {
        return Ok(Value::Null);
    }

    if matches!(a[0], Value::String(_)) {
        let mut max = require_string(&a[0])?;
        for v in &a[1..] {
            let s = require_string(v)?;
            if s > max {
                max = s;
            }
        }

        return Ok(Value::String(max.to_string()));
    }

    let mut max = require_decimal(&a[0])?;
    for v in &a[1..] {
        let d = require_decimal(v)?;
        if d > max {
            max = d;
        }
    }

    Ok(Value::from(max))
}

pub fn array_min(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    if a.is_empty() {
        return Ok(Value::Null);
    }

    if matches!(a[0], Value::String(_)) {
        let mut min = require_string(&a[0])?;
        for v in &a[1..] {
            let s = require_string(v)?;
            if s < min {
                min = s;
            }
        }

        return Ok(Value::String(min.to_string()));
    }

    let mut min = require_decimal(&a[0])?;
    for v in &a[1..] {
        let d = require_decimal(v)?;
        if d < min {
            min = d;
        }
    }

    Ok(Value::from(min))
}

/// Stable sort. The first element fixes the comparison kind (string or
/// number); a later element of the other kind fails the whole call with no
/// partial result.
pub fn sort_array(v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;

    if a.is_empty() {
        return Ok(v.clone());
    }

    if matches!(a[0], Value::String(_)) {
        let mut items: Vec<(&str, &Value)> = Vec::with_capacity(a.len());
        for v in a {
            items.push((require_string(v)?, v));
        }

        items.sort_by(|x, y| x.0.cmp(y.0));
        return Ok(Value::Array(items.into_iter().map(|(_, v)| v.clone()).collect()));
    }

    let mut items: Vec<(Decimal, &Value)> = Vec::with_capacity(a.len());
    for v in a {
        items.push((require_decimal(v)?, v));
    }

    items.sort_by(|x, y| x.0.cmp(&y.0));
    Ok(Value::Array(items.into_iter().map(|(_, v)| v.clone()).collect()))
}

/// Splice one level of nested arrays, dropping `Null` entries.
pub fn flatten(v: &Value) -> Value {
    let a = match v {
        Value::Array(a) => a,
        _ => return Value::Null,
    };

    let mut r = Vec::with_capacity(a.len());
    for v in a {
        match v {
            Value::Array(inner) => {
                for i in inner {
                    if !matches!(i, Value::Null) {
                        r.push(i.clone());
                    }
                }
            }
            Value::Null => {}
            other => r.push(other.clone()),
        }
    }

    Value::Array(r)
}

/// The identity form of an array wildcard: keep the array, removing `Null`
/// entries. The input is returned unchanged when it contains none.
pub fn prune_array(v: &Value) -> Value {
    let a = match v {
        Value::Array(a) => a,
        _ => return Value::Null,
    };

    if !a.iter().any(|v| matches!(v, Value::Null)) {
        return v.clone();
    }

    Value::Array(
        a.iter()
            .filter(|v| !matches!(v, Value::Null))
            .cloned()
            .collect(),
    )
}

/// Array index with negative resolution; anything out of bounds, and any
/// non-array input, is `Null`.
pub fn index(v: &Value, i: i64) -> Value {
    let a = match v {
        Value::Array(a) => a,
        _ => return Value::Null,
    };

    let i = if i < 0 { i + a.len() as i64 } else { i };

    if i < 0 || i >= a.len() as i64 {
        return Value::Null;
    }

    a[i as usize].clone()
}

/// Object field lookup; a missing key, and any non-object input, is `Null`.
pub fn field(name: &str, v: &Value) -> Value {
    match v {
        Value::Object(o) => o.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// Slice with step 1 over arrays (sub-array) and strings (code-point
/// sub-string); other inputs are `Null`. Boundary clamping is identical for
/// both.
pub fn slice(v: &Value, start: i64, stop: i64) -> Value {
    match v {
        Value::Array(a) => {
            let l = a.len() as i64;

            let start = match clamp_start(start, l) {
                Some(start) => start,
                None => return Value::Array(vec![]),
            };

            let stop = match clamp_stop(stop, l) {
                Some(stop) => stop,
                None => return Value::Array(vec![]),
            };

            if start >= stop {
                return Value::Array(vec![]);
            }

            Value::Array(a[start as usize..stop as usize].to_vec())
        }
        Value::String(s) => {
            let l = s.chars().count() as i64;

            let start = match clamp_start(start, l) {
                Some(start) => start,
                None => return Value::String(String::new()),
            };

            let stop = match clamp_stop(stop, l) {
                Some(stop) => stop,
                None => return Value::String(String::new()),
            };

            if start >= stop {
                return Value::String(String::new());
            }

            Value::String(
                s.chars()
                    .skip(start as usize)
                    .take((stop - start) as usize)
                    .collect(),
            )
        }
        _ => Value::Null,
    }
}

fn clamp_start(start: i64, l: i64) -> Option<i64> {
    if start < 0 {
        if start < -l {
            Some(0)
        } else {
            Some(start + l)
        }
    } else if start >= l {
        None
    } else {
        Some(start)
    }
}

fn clamp_stop(stop: i64, l: i64) -> Option<i64> {
    if stop < 0 {
        if stop < -l {
            None
        } else {
            Some(stop + l)
        }
    } else if stop >= l {
        Some(l)
    } else {
        Some(stop)
    }
}

/// Stepped slice. Negative steps walk backwards with inverted defaults.
pub fn slice_step(v: &Value, start: i64, stop: i64, step: i64) -> Value {
    match v {
        Value::Array(a) => match stepped_indexes(a.len() as i64, start, stop, step) {
            Some(indexes) => {
                Value::Array(indexes.map(|i| a[i as usize].clone()).collect())
            }
            None => Value::Array(vec![]),
        },
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();

            match stepped_indexes(chars.len() as i64, start, stop, step) {
                Some(indexes) => Value::String(indexes.map(|i| chars[i as usize]).collect()),
                None => Value::String(String::new()),
            }
        }
        _ => Value::Null,
    }
}

fn stepped_indexes(
    l: i64,
    mut start: i64,
    mut stop: i64,
    step: i64,
) -> Option<impl Iterator<Item = i64>> {
    let n;
    if step > 0 {
        start = clamp_start(start, l)?;

        if stop < 0 {
            if stop < -l {
                return None;
            }

            stop += l;
        } else if stop > l {
            stop = l;
        }

        if start >= stop {
            return None;
        }

        let c = stop - start;
        n = c / step + i64::from(c % step > 0);
    } else {
        if start < 0 {
            if start < -l {
                return None;
            }

            start += l;
        } else if start >= l {
            start = l - 1;
        }

        if stop < 0 {
            if stop < -l {
                stop = -1;
            } else {
                stop += l;
            }
        } else if stop >= l {
            return None;
        }

        if start <= stop {
            return None;
        }

        let s = -step;
        let c = start - stop;
        n = c / s + i64::from(c % s > 0);
    }

    Some((0..n).map(move |i| start + i * step))
}

// ---------------------------------------------------------------------------
// String operations
// ---------------------------------------------------------------------------

pub fn starts_with(v: &Value, prefix: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(prefix)?;

    Ok(Value::Bool(s.starts_with(p)))
}

pub fn ends_with(v: &Value, suffix: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(suffix)?;

    Ok(Value::Bool(s.ends_with(p)))
}

pub fn join(sep: &Value, v: &Value) -> Result<Value, EvalError> {
    let a = require_array(v)?;
    let sep = require_string(sep)?;

    let mut parts = Vec::with_capacity(a.len());
    for v in a {
        parts.push(require_string(v)?);
    }

    Ok(Value::String(parts.join(sep)))
}

/// Convert a code-point count into a byte offset; `None` when the string
/// has fewer code points.
fn byte_offset(s: &str, count: i64) -> Option<usize> {
    if count <= 0 {
        return Some(0);
    }

    let mut offset = 0usize;
    let mut remaining = count;
    for c in s.chars() {
        offset += c.len_utf8();
        remaining -= 1;

        if remaining == 0 {
            return Some(offset);
        }
    }

    None
}

fn rune_count(s: &str) -> i64 {
    s.chars().count() as i64
}

pub fn find_first(v: &Value, sub: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;

    if s.is_empty() || p.is_empty() {
        return Ok(Value::Null);
    }

    match s.find(p) {
        Some(i) => Ok(Value::from(rune_count(&s[..i]))),
        None => Ok(Value::Null),
    }
}

pub fn find_first_from(v: &Value, sub: &Value, start: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;
    let i = require_int(start)?.max(0);

    let from = match byte_offset(s, i) {
        Some(from) => from,
        None => return Ok(Value::Null),
    };

    match s[from..].find(p) {
        Some(r) => Ok(Value::from(rune_count(&s[..from + r]))),
        None => Ok(Value::Null),
    }
}

pub fn find_first_between(
    v: &Value,
    sub: &Value,
    start: &Value,
    finish: &Value,
) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;

    let i = require_between_start(start, finish)?.max(0);
    let from = match byte_offset(s, i) {
        Some(from) => from,
        None => return Ok(Value::Null),
    };

    let j = require_int(finish)?;
    if j < 0 {
        return Ok(Value::Null);
    }

    let to = byte_offset(s, j).unwrap_or(s.len());

    if from > to {
        return Ok(Value::Null);
    }

    match s[from..to].find(p) {
        Some(r) => Ok(Value::from(rune_count(&s[..from + r]))),
        None => Ok(Value::Null),
    }
}

pub fn find_last(v: &Value, sub: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;

    if s.is_empty() || p.is_empty() {
        return Ok(Value::Null);
    }

    match s.rfind(p) {
        Some(i) => Ok(Value::from(rune_count(&s[..i]))),
        None => Ok(Value::Null),
    }
}

pub fn find_last_from(v: &Value, sub: &Value, start: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;
    let i = require_int(start)?.max(0);

    let from = match byte_offset(s, i) {
        Some(from) => from,
        None => return Ok(Value::Null),
    };

    match s[from..].rfind(p) {
        Some(r) => Ok(Value::from(rune_count(&s[..from + r]))),
        None => Ok(Value::Null),
    }
}

pub fn find_last_between(
    v: &Value,
    sub: &Value,
    start: &Value,
    finish: &Value,
) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sub)?;

    let i = require_between_start(start, finish)?.max(0);
    let from = match byte_offset(s, i) {
        Some(from) => from,
        None => return Ok(Value::Null),
    };

    let j = require_int(finish)?;
    if j < 0 {
        return Ok(Value::Null);
    }

    let to = byte_offset(s, j).unwrap_or(s.len());

    if from > to {
        return Ok(Value::Null);
    }

    match s[from..to].rfind(p) {
        Some(r) => Ok(Value::from(rune_count(&s[..from + r]))),
        None => Ok(Value::Null),
    }
}

pub fn pad_left(v: &Value, width: &Value, pad: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(pad)?;
    let w = require_width(width)?;

    if p.len() != 1 {
        return Err(EvalError::PadLength(p.to_string()));
    }

    if w <= s.len() {
        return Ok(v.clone());
    }

    let mut r = p.repeat(w - s.len());
    r.push_str(s);
    Ok(Value::String(r))
}

pub fn pad_right(v: &Value, width: &Value, pad: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(pad)?;
    let w = require_width(width)?;

    if p.len() != 1 {
        return Err(EvalError::PadLength(p.to_string()));
    }

    if w <= s.len() {
        return Ok(v.clone());
    }

    let mut r = s.to_string();
    r.push_str(&p.repeat(w - s.len()));
    Ok(Value::String(r))
}

pub fn pad_space_left(v: &Value, width: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let w = require_width(width)?;

    if w <= s.len() {
        return Ok(v.clone());
    }

    let mut r = " ".repeat(w - s.len());
    r.push_str(s);
    Ok(Value::String(r))
}

pub fn pad_space_right(v: &Value, width: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let w = require_width(width)?;

    if w <= s.len() {
        return Ok(v.clone());
    }

    let mut r = s.to_string();
    r.push_str(&" ".repeat(w - s.len()));
    Ok(Value::String(r))
}

fn require_width(width: &Value) -> Result<usize, EvalError> {
    let w = require_int(width)?;

    if w < 0 {
        return Err(EvalError::NegativeInteger(w));
    }

    Ok(w as usize)
}

pub fn replace(v: &Value, old: &Value, new: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let o = require_string(old)?;
    let n = require_string(new)?;

    Ok(Value::String(s.replace(o, n)))
}

pub fn replace_count(
    v: &Value,
    old: &Value,
    new: &Value,
    count: &Value,
) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let o = require_string(old)?;
    let n = require_string(new)?;
    let c = require_int(count)?;

    if c < 0 {
        return Ok(Value::String(s.replace(o, n)));
    }

    Ok(Value::String(s.replacen(o, n, c as usize)))
}

pub fn split(v: &Value, sep: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sep)?;

    if s.is_empty() {
        return Ok(Value::Array(vec![]));
    }

    if p.is_empty() {
        return Ok(Value::Array(
            s.chars().map(|c| Value::String(c.to_string())).collect(),
        ));
    }

    Ok(Value::Array(
        s.split(p).map(|part| Value::String(part.to_string())).collect(),
    ))
}

/// Split with an upper bound: `n` splits produce at most `n + 1` pieces,
/// the last holding the unsplit remainder.
pub fn split_count(v: &Value, sep: &Value, count: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(sep)?;
    let n = require_int(count)?;

    if n < 0 {
        return Err(EvalError::NegativeInteger(n));
    }

    if n == 0 {
        return Ok(Value::Array(vec![Value::String(s.to_string())]));
    }

    if s.is_empty() {
        return Ok(Value::Array(vec![]));
    }

    if p.is_empty() {
        let mut r = Vec::new();
        let mut rest = s;
        for _ in 0..n {
            let mut chars = rest.chars();
            let c = match chars.next() {
                Some(c) if !chars.as_str().is_empty() => c,
                _ => break,
            };

            let l = c.len_utf8();
            r.push(Value::String(rest[..l].to_string()));
            rest = &rest[l..];
        }

        r.push(Value::String(rest.to_string()));
        return Ok(Value::Array(r));
    }

    Ok(Value::Array(
        s.splitn(n as usize + 1, p)
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

/// Trim the set of code points in `cut` from both ends; an empty set trims
/// Unicode whitespace.
pub fn trim(v: &Value, cut: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(cut)?;

    if p.is_empty() {
        return Ok(Value::String(s.trim().to_string()));
    }

    Ok(Value::String(
        s.trim_matches(|c: char| p.contains(c)).to_string(),
    ))
}

pub fn trim_left(v: &Value, cut: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(cut)?;

    if p.is_empty() {
        return Ok(Value::String(s.trim_start().to_string()));
    }

    Ok(Value::String(
        s.trim_start_matches(|c: char| p.contains(c)).to_string(),
    ))
}

pub fn trim_right(v: &Value, cut: &Value) -> Result<Value, EvalError> {
    let s = require_string(v)?;
    let p = require_string(cut)?;

    if p.is_empty() {
        return Ok(Value::String(s.trim_end().to_string()));
    }

    Ok(Value::String(
        s.trim_end_matches(|c: char| p.contains(c)).to_string(),
    ))
}

pub fn trim_space(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::String(require_string(v)?.trim().to_string()))
}

pub fn trim_space_left(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::String(require_string(v)?.trim_start().to_string()))
}

pub fn trim_space_right(v: &Value) -> Result<Value, EvalError> {
    Ok(Value::String(require_string(v)?.trim_end().to_string()))
}
