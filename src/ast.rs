//! # Nutmeg Query Language - Abstract Syntax Tree
//!
//! This module defines the lexical tokens and the operation tree for the
//! Nutmeg query language, a JMESPath-style expression language for
//! selecting, transforming, and computing over JSON documents.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[nodes]** - Operation-tree nodes built by the parser and walked by
//!   the evaluator
//!
//! ## Core Concepts
//!
//! ### Pipeline of specializations
//!
//! The parser does not emit a generic tree and leave the evaluator to probe
//! shapes at run time. Instead it specializes nodes while parsing:
//!
//! - A wildcard/flatten/filter with a continuation becomes a *projection*
//!   node carrying its body; without one it becomes a *pruner* node with
//!   identity semantics.
//! - Field access following a projection stays inside the projection
//!   (`foo[*].bar` projects `bar` over each element) rather than piping.
//! - Small non-negative indexes on the current value get a compact
//!   `SmallIndexCurrent` form.
//!
//! ### Current and Root
//!
//! `@` is the current value, rebound across `|` and at each projection
//! element; `$` is always the top-level input. `$name` reads a variable
//! bound by `let`.
//!
//! ## Examples
//!
//! ```text
//! a.b.c
//! foo[*].bar | [0]
//! foo[?bar > `10`].baz
//! let $x = a in $x + b
//! sort_by(items, &age)[*].name
//! ```

pub mod nodes;
pub mod tokens;

pub use nodes::{is_project_node, is_slice_node, Node};
pub use tokens::{Token, TokenKind};
