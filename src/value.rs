use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{prelude::FromPrimitive, prelude::ToPrimitive, Decimal};

/// A JSON value used throughout the Nutmeg query language.
///
/// This type represents all valid JSON types with a numeric model that keeps
/// three forms side by side: exact 128-bit decimals, binary floats, and
/// unparsed numeric literals carried through from JSON input.
///
/// # Numeric precision
///
/// Numbers read from JSON documents are kept as their original text and only
/// parsed into a decimal when arithmetic or comparison needs them. This means
/// no precision is lost between ingestion and evaluation, and arithmetic is
/// decimal-exact unless both operands are floats.
///
/// # Examples
///
/// ```
/// use nutmeg_lang::Value;
/// use std::collections::HashMap;
///
/// let null = Value::Null;
/// let boolean = Value::Bool(true);
/// let number = Value::from(42);
/// let string = Value::String("hello".to_string());
/// let array = Value::Array(vec![Value::from(1), Value::from(2)]);
///
/// let mut obj = HashMap::new();
/// obj.insert("key".to_string(), Value::String("value".to_string()));
/// let object = Value::Object(obj);
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Bool(bool),

    /// A number in one of three internal forms
    Number(Number),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with string keys; iteration order is not guaranteed
    Object(HashMap<String, Value>),
}

/// The internal representation of a number.
///
/// `Literal` preserves the original JSON text of a number so that values can
/// round-trip through the engine without losing precision; it is parsed into
/// a [`Decimal`] on demand.
#[derive(Debug, Clone)]
pub enum Number {
    /// An exact 128-bit decimal; integer inputs are embedded here.
    Decimal(Decimal),

    /// An unparsed JSON numeric literal, kept in its original textual form.
    Literal(String),

    /// A binary 64-bit float.
    Float(f64),
}

impl Number {
    /// Coerce to the canonical decimal form. Unparsed literals are parsed
    /// here; a literal that cannot be parsed is not a number.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Number::Decimal(d) => Some(*d),
            Number::Literal(s) => parse_decimal(s),
            Number::Float(f) => Decimal::from_f64(*f),
        }
    }

    /// Returns the float form, but only for values that already are floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Number::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// Parse a JSON numeric literal into a decimal.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    if let Ok(d) = Decimal::from_str(s) {
        return Some(d);
    }

    Decimal::from_scientific(s).ok()
}

/// Result of coercing a value into a positional integer argument.
pub enum IntValue {
    /// A numeric value that fits an integer exactly.
    Int(i64),

    /// A numeric value that is fractional or out of range.
    NotInteger(Decimal),

    /// Not a numeric value at all.
    NotNumber,
}

impl Value {
    /// Truthiness used by filters, `&&`/`||`, and `!`: null, the empty
    /// string, the empty array, and the empty object are false; booleans are
    /// themselves; any number is true; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(_) => true,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    /// True for any of the numeric forms.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Coerce to the canonical decimal if this is a number.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => n.as_decimal(),
            _ => None,
        }
    }

    /// Returns the float form, but only for float numbers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_float(),
            _ => None,
        }
    }

    /// Returns both values as floats iff *both* are floats. A mixed
    /// float/decimal pair falls through to decimal arithmetic.
    pub fn float_pair(x: &Value, y: &Value) -> Option<(f64, f64)> {
        match (x.as_float(), y.as_float()) {
            (Some(xf), Some(yf)) => Some((xf, yf)),
            _ => None,
        }
    }

    /// Coerce to a positional integer argument, distinguishing values that
    /// are not numbers from numbers that are not representable as integers.
    pub fn as_index_int(&self) -> IntValue {
        let d = match self {
            Value::Number(n) => match n.as_decimal() {
                Some(d) => d,
                None => return IntValue::NotNumber,
            },
            _ => return IntValue::NotNumber,
        };

        if !d.fract().is_zero() {
            return IntValue::NotInteger(d);
        }

        match d.to_i64() {
            Some(i) => IntValue::Int(i),
            None => IntValue::NotInteger(d),
        }
    }

    /// The type name reported by the `type` built-in.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Equality is decimal-exact for numbers: two numbers are equal iff their
/// canonical decimal values are equal, regardless of internal form. Objects
/// compare by key set and values, independent of iteration order. Values of
/// different kinds are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => match (x.as_decimal(), y.as_decimal()) {
                (Some(xd), Some(yd)) => xd == yd,
                _ => false,
            },
            (Value::Array(x), Value::Array(y)) => x == y,
            (Value::Object(x), Value::Object(y)) => {
                x.len() == y.len()
                    && x.iter().all(|(k, xv)| y.get(k).is_some_and(|yv| xv == yv))
            }
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Decimal(Decimal::from(i)))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::Decimal(Decimal::from(i)))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Number(Number::Decimal(Decimal::from(u)))
    }
}

impl From<usize> for Value {
    fn from(u: usize) -> Self {
        Value::Number(Number::Decimal(Decimal::from(u as u64)))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(Number::Decimal(d))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Decoded JSON converts with numbers kept in their original textual form,
/// deferring decimal parsing to the point of use.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(Number::Literal(n.to_string())),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => {
                Value::Array(a.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(o) => Value::Object(
                o.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_equality_across_forms() {
        let literal = Value::Number(Number::Literal("1.50".to_string()));
        let decimal = Value::Number(Number::Decimal(Decimal::new(15, 1)));
        let float = Value::Number(Number::Float(1.5));

        assert_eq!(literal, decimal);
        assert_eq!(decimal, float);
        assert_eq!(literal, float);
    }

    #[test]
    fn object_equality_ignores_order() {
        let mut x = HashMap::new();
        x.insert("a".to_string(), Value::from(1));
        x.insert("b".to_string(), Value::from(2));

        let mut y = HashMap::new();
        y.insert("b".to_string(), Value::from(2));
        y.insert("a".to_string(), Value::from(1));

        assert_eq!(Value::Object(x), Value::Object(y));
    }

    #[test]
    fn cross_kind_never_equal() {
        assert_ne!(Value::Null, Value::Bool(false));
        assert_ne!(Value::from(0), Value::Bool(false));
        assert_ne!(Value::String("1".to_string()), Value::from(1));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(!Value::Object(HashMap::new()).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::from(0).is_truthy());
        assert!(Value::String("x".to_string()).is_truthy());
    }

    #[test]
    fn scientific_literals_parse() {
        let v = Value::Number(Number::Literal("1e3".to_string()));
        assert_eq!(v.as_decimal(), Some(Decimal::from(1000)));
    }
}
