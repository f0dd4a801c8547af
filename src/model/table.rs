//! Table and Row data structures

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// One record: an ordered mapping from column name to value.
///
/// A key that is not present is *absent*, which is kept distinct from an
/// explicit `Value::Null`. Both count as missing for statistics and null
/// handling, but an absent cell is never materialised unless an operation
/// writes into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell by column name; `None` when the key is absent
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Set a cell, keeping the position of an existing key
    pub fn insert(&mut self, column: impl Into<String>, value: Value) -> Option<Value> {
        self.cells.insert(column.into(), value)
    }

    /// Check whether a key is present (even if its value is null)
    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// True when the column is absent or explicitly null
    pub fn is_missing(&self, column: &str) -> bool {
        self.cells.get(column).map_or(true, Value::is_null)
    }

    /// Present, non-null value of a column
    pub fn present(&self, column: &str) -> Option<&Value> {
        self.cells.get(column).filter(|v| !v.is_null())
    }

    /// Iterate over `(column, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.cells.iter()
    }

    /// Column names in this row, in key order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.cells.keys()
    }

    /// Number of keys in this row
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check whether the row has no keys
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// An ordered sequence of rows.
///
/// Rows may carry different key sets. The column list of a table is the
/// union of keys in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    /// All rows in the table
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from rows
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Add a row to the table
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of column names across all rows, in first-occurrence order
    pub fn columns(&self) -> Vec<String> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        for row in &self.rows {
            for key in row.keys() {
                seen.insert(key.as_str());
            }
        }
        seen.into_iter().map(str::to_string).collect()
    }

    /// Check whether any row carries the column key
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains(column))
    }

    /// Values of one column, `None` where the key is absent
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.rows.iter().map(move |row| row.get(column))
    }

    /// Present, non-null values of one column, in row order
    pub fn present_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |row| row.present(column))
    }

    /// Iterate over rows
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}

impl FromIterator<Row> for Table {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_columns_first_occurrence_union() {
        let table = Table::from_rows(vec![
            row(&[("b", Value::Int(1)), ("a", Value::Int(2))]),
            row(&[("c", Value::Null), ("a", Value::Int(3))]),
        ]);
        assert_eq!(table.columns(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_absent_and_null_are_both_missing() {
        let r = row(&[("a", Value::Null)]);
        assert!(r.is_missing("a"));
        assert!(r.is_missing("b"));
        assert!(r.contains("a"));
        assert!(!r.contains("b"));
    }

    #[test]
    fn test_json_round_trip_keeps_key_order() {
        let json = r#"[{"z":1,"a":null},{"m":"x"}]"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.columns(), vec!["z", "a", "m"]);
        assert_eq!(serde_json::to_string(&table).unwrap(), json);
    }
}
