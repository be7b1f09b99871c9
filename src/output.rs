//! JSON serialization for Nutmeg values.
//!
//! Provides compact and pretty-printed output. All output is deterministic
//! (object keys are sorted) and follows standard JSON formatting rules.
//! Exact decimals are rendered in canonical form with trailing zeros
//! normalized away, and unparsed numeric literals are emitted verbatim so
//! values round-trip without losing their original precision.

use std::collections::HashMap;
use std::fmt::Write;

use crate::value::{Number, Value};

pub struct JsonPrinter {
    /// Spaces per nesting level; `None` produces compact output.
    indent: Option<usize>,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter {
            indent: if pretty { Some(2) } else { None },
        }
    }

    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value, 0);
        out
    }

    fn write_value(&self, out: &mut String, value: &Value, depth: usize) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Number(n) => write_number(out, n),
            Value::String(s) => write_string(out, s),
            Value::Array(a) => self.write_array(out, a, depth),
            Value::Object(o) => self.write_object(out, o, depth),
        }
    }

    fn write_array(&self, out: &mut String, a: &[Value], depth: usize) {
        if a.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (i, v) in a.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }

            self.write_break(out, depth + 1);
            self.write_value(out, v, depth + 1);
        }

        self.write_break(out, depth);
        out.push(']');
    }

    fn write_object(&self, out: &mut String, o: &HashMap<String, Value>, depth: usize) {
        if o.is_empty() {
            out.push_str("{}");
            return;
        }

        // Sort keys so objects always serialize the same way, regardless of
        // map iteration order.
        let mut keys: Vec<&String> = o.keys().collect();
        keys.sort();

        out.push('{');
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }

            self.write_break(out, depth + 1);
            write_string(out, key);
            out.push(':');

            if self.indent.is_some() {
                out.push(' ');
            }

            self.write_value(out, &o[key.as_str()], depth + 1);
        }

        self.write_break(out, depth);
        out.push('}');
    }

    fn write_break(&self, out: &mut String, depth: usize) {
        if let Some(width) = self.indent {
            out.push('\n');
            for _ in 0..depth * width {
                out.push(' ');
            }
        }
    }
}

/// Numbers render according to their internal form: decimals in canonical
/// form with the scale normalized, unparsed literals exactly as they
/// appeared in the input, and floats through their shortest round-trip
/// representation.
fn write_number(out: &mut String, n: &Number) {
    match n {
        Number::Decimal(d) => {
            let _ = write!(out, "{}", d.normalize());
        }
        Number::Literal(text) => out.push_str(text),
        Number::Float(f) => {
            let _ = write!(out, "{}", f);
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Converts a value to a compact JSON string.
///
/// Output is minified, deterministic (object keys are sorted), and escapes
/// special characters.
///
/// # Examples
///
/// ```
/// use nutmeg_lang::output::to_json;
/// use nutmeg_lang::Value;
/// use std::collections::HashMap;
///
/// let mut obj = HashMap::new();
/// obj.insert("name".to_string(), Value::String("Alice".to_string()));
/// obj.insert("age".to_string(), Value::from(30));
///
/// assert_eq!(to_json(&Value::Object(obj)), r#"{"age":30,"name":"Alice"}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Converts a value to a pretty-printed JSON string with 2-space
/// indentation. Like [`to_json`], output is deterministic.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
