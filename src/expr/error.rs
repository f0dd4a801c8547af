//! Expression syntax errors

use thiserror::Error;

/// A problem found while tokenizing, parsing or validating an expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ExpressionError {
    pub message: String,
    /// Byte offset into the expression source
    pub position: usize,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}
