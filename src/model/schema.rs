//! Column kind inference

use serde::{Deserialize, Serialize};

use super::table::Table;
use super::value::Value;

/// Inferred kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

impl ColumnKind {
    /// Majority vote over present values: numeric when strictly more than
    /// half parse as numbers. Ties and empty columns are categorical.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
        let mut numeric = 0usize;
        let mut total = 0usize;
        for value in values {
            if value.is_null() {
                continue;
            }
            total += 1;
            if value.parse_numeric().is_some() {
                numeric += 1;
            }
        }

        if numeric * 2 > total {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    /// Infer the kind of a named column in a table
    pub fn of_column(table: &Table, column: &str) -> ColumnKind {
        let kind = Self::infer(table.present_values(column));
        tracing::trace!(column, %kind, "inferred column kind");
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_numeric() {
        let values = [Value::Int(1), Value::from("2.5"), Value::from("x")];
        assert_eq!(ColumnKind::infer(&values), ColumnKind::Numeric);
    }

    #[test]
    fn test_tie_is_categorical() {
        let values = [Value::Int(1), Value::from("x"), Value::Null];
        assert_eq!(ColumnKind::infer(&values), ColumnKind::Categorical);
    }

    #[test]
    fn test_empty_is_categorical() {
        let empty: [Value; 0] = [];
        assert_eq!(ColumnKind::infer(&empty), ColumnKind::Categorical);
    }
}
