//! Nutmeg is a JMESPath-style query language for JSON documents: a textual
//! expression selects, transforms, and computes over a tree of values,
//! producing a new value or a structured error.
//!
//! # Quick start
//!
//! ```
//! use nutmeg_lang::{search, Value};
//! use std::collections::HashMap;
//!
//! let mut inner = HashMap::new();
//! inner.insert("b".to_string(), Value::from(5));
//! let mut data = HashMap::new();
//! data.insert("a".to_string(), Value::Object(inner));
//!
//! let result = search("a.b", &Value::Object(data)).unwrap();
//! assert_eq!(result, Value::from(5));
//! ```
//!
//! Expressions can also be compiled once and evaluated many times:
//!
//! ```
//! use nutmeg_lang::{Expression, Value};
//!
//! let expr = Expression::compile("length(@)").unwrap();
//! let result = expr.search(&Value::String("nutmeg".to_string())).unwrap();
//! assert_eq!(result, Value::from(6));
//! ```

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod value;

pub use ast::Node;
pub use evaluator::EvalError;
pub use lexer::{LexError, Lexer};
pub use output::{to_json, to_json_pretty};
pub use parser::ParseError;
pub use value::{Number, Value};

pub mod cli;

use evaluator::evaluate;
use parser::parse;

/// The error taxonomy surfaced to callers. Every failure of [`search`] or
/// [`Expression::search`] is one of these kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexer or parser failure
    Syntax(String),
    /// Function name not in the built-in table
    UnknownFunction(String),
    /// Wrong number of arguments for a function, raised at parse time
    InvalidArity(String),
    /// A value kind that does not satisfy a type constraint
    InvalidType(String),
    /// A value of the right kind but outside the permitted domain
    InvalidValue(String),
    /// A `$name` with no binding in any enclosing scope
    UndefinedVariable(String),
    /// Arithmetic produced an infinity
    Infinity,
    /// Arithmetic produced a not-a-number result
    NotANumber,
    /// Catch-all for unforeseen internal failures
    EvaluationFailed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Syntax(msg) => write!(f, "syntax error: {}", msg),
            Error::UnknownFunction(name) => write!(f, "unknown function {:?}", name),
            Error::InvalidArity(name) => write!(f, "invalid call to function {:?}", name),
            Error::InvalidType(msg) => write!(f, "{}", msg),
            Error::InvalidValue(msg) => write!(f, "{}", msg),
            Error::UndefinedVariable(name) => write!(f, "undefined variable {:?}", name),
            Error::Infinity => write!(f, "result of operation is an infinity"),
            Error::NotANumber => write!(f, "result of operation is not a number"),
            Error::EvaluationFailed(msg) => write!(f, "evaluation failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::UnknownFunction(name) => Error::UnknownFunction(name),
            ParseError::InvalidFunctionCall(name) => Error::InvalidArity(name),
            e @ ParseError::InvalidFunctionArgument { .. } => Error::InvalidType(e.to_string()),
            e => Error::Syntax(e.to_string()),
        }
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        match e {
            EvalError::InvalidType { .. } => Error::InvalidType(e.to_string()),
            EvalError::IntegerConversion(_)
            | EvalError::NegativeInteger(_)
            | EvalError::PadLength(_)
            | EvalError::FromItemsLength(_)
            | EvalError::FromItemsKey(_) => Error::InvalidValue(e.to_string()),
            EvalError::UndefinedVariable(name) => Error::UndefinedVariable(name),
            EvalError::Infinity => Error::Infinity,
            EvalError::NotANumber => Error::NotANumber,
        }
    }
}

/// Parse `expression` and evaluate it against `data` in one step.
///
/// The input is never mutated; the result is a freshly built value.
pub fn search(expression: &str, data: &Value) -> Result<Value, Error> {
    let node = parse(expression)?;
    Ok(evaluate(&node, data)?)
}

/// A compiled expression.
///
/// Compiling once amortizes parsing across evaluations. A compiled
/// expression is immutable and can be shared across threads; concurrent
/// [`Expression::search`] calls against distinct data are safe because all
/// evaluation state is per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    node: Node,
}

impl Expression {
    /// Compile `expression`, returning an [`Expression`] that can be
    /// evaluated against data.
    pub fn compile(expression: &str) -> Result<Expression, Error> {
        let node = parse(expression)?;
        Ok(Expression { node })
    }

    /// Like [`Expression::compile`] but panics if the expression cannot be
    /// compiled. Intended for expressions known valid at compile time.
    pub fn must_compile(expression: &str) -> Expression {
        match parse(expression) {
            Ok(node) => Expression { node },
            Err(_) => panic!(
                "Expression::must_compile({:?}): invalid expression",
                expression
            ),
        }
    }

    /// Evaluate the compiled expression against `data`.
    pub fn search(&self, data: &Value) -> Result<Value, Error> {
        Ok(evaluate(&self.node, data)?)
    }
}
