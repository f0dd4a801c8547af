//! Derived columns from a restricted formula language
//!
//! The language has literals, column references, arithmetic, comparison,
//! logical operators and a fixed set of math functions. There is no member
//! access, indexing, assignment or way to reach anything outside the row
//! being evaluated. An expression is parsed once per request and then
//! interpreted per row.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::model::{find_matching_column, Row, Table, Value};

pub use ast::{BinaryOp, Expr, Function, UnaryOp};
pub use error::ExpressionError;
pub use eval::evaluate;
pub use lexer::{tokenize, Spanned, Token};
pub use parser::{parse, MAX_DEPTH, MAX_EXPRESSION_LEN};

/// A row whose derived value could not be computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedColumnError {
    pub row_index: usize,
    pub message: String,
}

impl std::fmt::Display for DerivedColumnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}: {}", self.row_index, self.message)
    }
}

/// Result of `create_derived_column`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedColumnResult {
    pub data: Table,
    pub errors: Vec<DerivedColumnError>,
}

impl DerivedColumnResult {
    /// True when every row evaluated without error
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse `source` and check that every referenced column exists somewhere
/// in the table.
pub fn compile(source: &str, table: &Table) -> Result<Expr> {
    let expr = parse(source)?;
    let columns = table.columns();
    for name in expr.columns() {
        if !columns.iter().any(|c| c == name) {
            let hint = find_matching_column(name, &columns)
                .map(|s| format!(" (did you mean '{}'?)", s))
                .unwrap_or_default();
            let position = source.find(name).unwrap_or(0);
            return Err(ExpressionError::new(
                format!("unknown column or identifier '{}'{}", name, hint),
                position,
            )
            .into());
        }
    }
    Ok(expr)
}

/// Check that a new column name looks like an identifier: a letter or
/// underscore first, then letters, digits, underscores, spaces or dashes,
/// with no surrounding whitespace.
fn validate_column_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ' ' | '-'));
    if valid_start && valid_rest && name.trim_end() == name {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "invalid column name '{}': must start with a letter or underscore and contain only letters, digits, spaces, '_' or '-'",
            name
        )))
    }
}

/// Evaluate `expression` for every row and store the result in
/// `new_column_name`.
///
/// An existing column with that name is overwritten in place. Rows that
/// fail get a null value and an entry in `errors`; the remaining rows are
/// still evaluated.
pub fn create_derived_column(
    table: &Table,
    new_column_name: &str,
    expression: &str,
) -> Result<DerivedColumnResult> {
    validate_column_name(new_column_name)?;
    let expr = compile(expression, table)?;

    let mut errors = Vec::new();
    let rows: Vec<Row> = table
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let value = evaluate(&expr, row).unwrap_or_else(|message| {
                errors.push(DerivedColumnError { row_index, message });
                Value::Null
            });
            let mut row = row.clone();
            row.insert(new_column_name, value);
            row
        })
        .collect();

    Ok(DerivedColumnResult {
        data: Table::from_rows(rows),
        errors,
    })
}
