//! Engine error types

use thiserror::Error;

use crate::expr::ExpressionError;
use crate::model::{find_matching_column, Table};

/// Failure that prevents an operation from producing any result.
///
/// Every variant belongs to the invalid-input category: the boundary turns
/// it into a rejected request carrying `to_string()`. Row- and cell-level
/// problems are never reported through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("column '{column}' not found{}", hint(.suggestion))]
    ColumnNotFound {
        column: String,
        suggestion: Option<String>,
    },

    #[error("invalid expression: {0}")]
    InvalidExpression(#[from] ExpressionError),
}

impl EngineError {
    /// Build an `InvalidInput` error from any message
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    /// Build a `ColumnNotFound` error, attaching the closest existing column
    pub fn column_not_found(table: &Table, column: &str) -> Self {
        let available = table.columns();
        EngineError::ColumnNotFound {
            column: column.to_string(),
            suggestion: find_matching_column(column, &available).map(str::to_string),
        }
    }
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Fail with `ColumnNotFound` unless some row carries the column
pub(crate) fn require_column(table: &Table, column: &str) -> Result<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(EngineError::column_not_found(table, column))
    }
}
