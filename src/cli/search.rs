//! Execute expressions against JSON input

use super::CliError;
use crate::{output, Expression, Value};

/// Options for the search command
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON input string
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only compile the expression, don't evaluate
    pub compile_only: bool,
}

/// Result of a search operation
#[derive(Debug)]
pub enum SearchResult {
    /// Compilation passed
    Compiled,
    /// The expression evaluated successfully with JSON output
    Output(String),
}

/// Compile an expression and evaluate it against the given JSON input.
pub fn execute_search(options: &SearchOptions) -> Result<SearchResult, CliError> {
    let expression = Expression::compile(&options.expression)?;

    if options.compile_only {
        return Ok(SearchResult::Compiled);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;

    let json_value: serde_json::Value = serde_json::from_str(json_str)?;
    let data = Value::from(json_value);

    let result = expression.search(&data)?;

    let output = if options.pretty {
        output::to_json_pretty(&result)
    } else {
        output::to_json(&result)
    };

    Ok(SearchResult::Output(output))
}
