//! Parse error type.

use thiserror::Error;

/// Error produced by the tokenizer or parser.
///
/// Carries a 1-indexed source position; rendering is left to the caller
/// (the engine reports it together with the module name).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at line {line}, column {col}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl ParseError {
    /// Create a syntax error at a position.
    pub fn syntax(message: impl Into<String>, line: u32, col: u32) -> Self {
        ParseError {
            message: message.into(),
            line,
            col,
        }
    }

    /// Unterminated string literal starting at a position.
    pub fn unterminated_string(line: u32, col: u32) -> Self {
        ParseError::syntax("unterminated string literal", line, col)
    }
}
