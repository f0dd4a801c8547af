//! Null detection, removal and imputation

use std::cmp::Ordering;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::error::{require_column, EngineError, Result};
use crate::model::{ColumnKind, Row, Table, Value};

/// Strategy for handling missing values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullMethod {
    #[default]
    Delete,
    Mean,
    Median,
    Mode,
    Custom,
}

impl std::str::FromStr for NullMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delete" => Ok(NullMethod::Delete),
            "mean" => Ok(NullMethod::Mean),
            "median" => Ok(NullMethod::Median),
            "mode" => Ok(NullMethod::Mode),
            "custom" => Ok(NullMethod::Custom),
            _ => Err(format!("Unknown null handling method: {}", s)),
        }
    }
}

impl std::fmt::Display for NullMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NullMethod::Delete => "delete",
            NullMethod::Mean => "mean",
            NullMethod::Median => "median",
            NullMethod::Mode => "mode",
            NullMethod::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

/// Result of `remove_nulls`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveNullsResult {
    pub data: Table,
    /// Rows removed (delete) or cells filled (every other method)
    pub affected_count: usize,
    pub method: NullMethod,
}

/// Result of `count_nulls`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullCounts {
    /// Missing cells (absent or null) per column, in column order
    pub counts: IndexMap<String, usize>,
    pub total_nulls: usize,
    pub total_rows: usize,
}

/// Remove or fill missing values.
///
/// With `column` set, only that column is considered; otherwise `delete`
/// looks at every column of the table and the fill methods apply to each
/// column independently (mean, median and mode only to numeric columns).
pub fn remove_nulls(
    table: &Table,
    column: Option<&str>,
    method: NullMethod,
    custom_value: Option<&Value>,
) -> Result<RemoveNullsResult> {
    if let Some(column) = column {
        require_column(table, column)?;
    }

    let (data, affected_count) = match method {
        NullMethod::Delete => delete_rows(table, column),
        NullMethod::Custom => {
            let fill = custom_value
                .filter(|v| !v.is_null())
                .ok_or_else(|| EngineError::invalid("custom method requires a custom_value"))?;
            let columns = target_columns(table, column);
            fill_columns(table, &columns, |_| Ok(Some(fill.clone())))?
        }
        NullMethod::Mean | NullMethod::Median | NullMethod::Mode => match column {
            Some(column) => fill_columns(table, &[column.to_string()], |c| {
                impute_value(table, c, method).map(Some)
            })?,
            None => {
                let numeric: Vec<String> = table
                    .columns()
                    .into_iter()
                    .filter(|c| ColumnKind::of_column(table, c) == ColumnKind::Numeric)
                    .collect();
                fill_columns(table, &numeric, |c| impute_value(table, c, method).map(Some))?
            }
        },
    };

    Ok(RemoveNullsResult {
        data,
        affected_count,
        method,
    })
}

/// Count missing cells per column
pub fn count_nulls(table: &Table, column: Option<&str>) -> Result<NullCounts> {
    if let Some(column) = column {
        require_column(table, column)?;
    }

    let counts: IndexMap<String, usize> = target_columns(table, column)
        .into_iter()
        .map(|c| {
            let missing = table.iter().filter(|row| row.is_missing(&c)).count();
            (c, missing)
        })
        .collect();
    let total_nulls = counts.values().sum();

    Ok(NullCounts {
        counts,
        total_nulls,
        total_rows: table.row_count(),
    })
}

fn target_columns(table: &Table, column: Option<&str>) -> Vec<String> {
    match column {
        Some(c) => vec![c.to_string()],
        None => table.columns(),
    }
}

fn delete_rows(table: &Table, column: Option<&str>) -> (Table, usize) {
    let columns = target_columns(table, column);
    let kept: Table = table
        .iter()
        .filter(|row| !columns.iter().any(|c| row.is_missing(c)))
        .cloned()
        .collect();
    let removed = table.row_count() - kept.row_count();
    (kept, removed)
}

/// Copy the table, writing a fill value into every missing cell of the
/// given columns. `fill_for` is asked once per column; `None` skips it.
fn fill_columns<F>(table: &Table, columns: &[String], mut fill_for: F) -> Result<(Table, usize)>
where
    F: FnMut(&str) -> Result<Option<Value>>,
{
    let mut fills: Vec<(&str, Value)> = Vec::with_capacity(columns.len());
    for column in columns {
        if let Some(value) = fill_for(column)? {
            fills.push((column.as_str(), value));
        }
    }

    let mut affected = 0;
    let rows: Vec<Row> = table
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for (column, value) in &fills {
                if row.is_missing(column) {
                    row.insert(*column, value.clone());
                    affected += 1;
                }
            }
            row
        })
        .collect();

    Ok((Table::from_rows(rows), affected))
}

fn impute_value(table: &Table, column: &str, method: NullMethod) -> Result<Value> {
    match method {
        NullMethod::Mean | NullMethod::Median => {
            if ColumnKind::of_column(table, column) != ColumnKind::Numeric {
                return Err(EngineError::invalid(format!(
                    "column '{}' is not numeric; cannot compute the {}",
                    column, method
                )));
            }
            let mut numbers: Vec<f64> = table
                .present_values(column)
                .filter_map(Value::parse_numeric)
                .collect();
            if numbers.is_empty() {
                return Err(EngineError::invalid(format!(
                    "column '{}' has no numeric values to compute the {}",
                    column, method
                )));
            }
            let statistic = if method == NullMethod::Mean {
                mean(&numbers)
            } else {
                median(&mut numbers)
            };
            Ok(Value::Float(statistic))
        }
        NullMethod::Mode => mode(table.present_values(column)).ok_or_else(|| {
            EngineError::invalid(format!("column '{}' has no values to compute the mode", column))
        }),
        NullMethod::Delete | NullMethod::Custom => {
            unreachable!("impute_value is only called for statistical methods")
        }
    }
}

/// Mean of a non-empty slice; stays finite for any finite input
pub(crate) fn mean(numbers: &[f64]) -> f64 {
    let n = numbers.len() as f64;
    let sum: f64 = numbers.iter().sum();
    if sum.is_finite() {
        return sum / n;
    }
    // The plain sum overflowed; fold a running mean instead
    numbers
        .iter()
        .enumerate()
        .fold(0.0, |avg, (i, x)| {
            let k = (i + 1) as f64;
            avg - avg / k + x / k
        })
}

/// Median of a non-empty slice; sorts in place
pub(crate) fn median(numbers: &mut [f64]) -> f64 {
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 0 {
        midpoint(numbers[mid - 1], numbers[mid])
    } else {
        numbers[mid]
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    let sum = a + b;
    if sum.is_finite() {
        sum / 2.0
    } else {
        a / 2.0 + b / 2.0
    }
}

/// Most frequent value; ties go to the value seen first
fn mode<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: IndexMap<&Value, usize, FxBuildHasher> = IndexMap::default();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&Value, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str) -> Table {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_delete_any_column() {
        let t = table(r#"[{"a":1,"b":2},{"a":null,"b":3}]"#);
        let result = remove_nulls(&t, None, NullMethod::Delete, None).unwrap();
        assert_eq!(result.data, table(r#"[{"a":1,"b":2}]"#));
        assert_eq!(result.affected_count, 1);
        assert_eq!(result.method, NullMethod::Delete);
    }

    #[test]
    fn test_delete_treats_absent_key_as_null() {
        let t = table(r#"[{"a":1,"b":2},{"a":5},{"a":null,"b":1}]"#);
        let result = remove_nulls(&t, Some("b"), NullMethod::Delete, None).unwrap();
        assert_eq!(result.data, table(r#"[{"a":1,"b":2},{"a":null,"b":1}]"#));
        assert_eq!(result.affected_count, 1);
    }

    #[test]
    fn test_delete_keeps_empty_strings() {
        let t = table(r#"[{"a":""},{"a":null}]"#);
        let result = remove_nulls(&t, None, NullMethod::Delete, None).unwrap();
        assert_eq!(result.data, table(r#"[{"a":""}]"#));
    }

    #[test]
    fn test_mean_imputation() {
        let t = table(r#"[{"x":1},{"x":null},{"x":"5"},{"y":0}]"#);
        let result = remove_nulls(&t, Some("x"), NullMethod::Mean, None).unwrap();
        assert_eq!(result.affected_count, 2);
        assert_eq!(result.data.rows[1].get("x"), Some(&Value::Float(3.0)));
        assert_eq!(result.data.rows[3].get("x"), Some(&Value::Float(3.0)));
        // Original table is untouched
        assert_eq!(t.rows[1].get("x"), Some(&Value::Null));
    }

    #[test]
    fn test_median_is_order_invariant() {
        let a = table(r#"[{"x":9},{"x":1},{"x":null},{"x":4},{"x":2}]"#);
        let b = table(r#"[{"x":null},{"x":2},{"x":4},{"x":1},{"x":9}]"#);
        let ra = remove_nulls(&a, Some("x"), NullMethod::Median, None).unwrap();
        let rb = remove_nulls(&b, Some("x"), NullMethod::Median, None).unwrap();
        assert_eq!(ra.data.rows[2].get("x"), Some(&Value::Float(3.0)));
        assert_eq!(rb.data.rows[0].get("x"), Some(&Value::Float(3.0)));
    }

    #[test]
    fn test_mean_requires_numeric_values() {
        let t = table(r#"[{"x":"a"},{"x":null}]"#);
        let err = remove_nulls(&t, Some("x"), NullMethod::Mean, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_mean_rejects_mostly_text_column() {
        let t = table(r#"[{"c":"red"},{"c":"blue"},{"c":"green"},{"c":"7"},{"c":null}]"#);
        for method in [NullMethod::Mean, NullMethod::Median] {
            let err = remove_nulls(&t, Some("c"), method, None).unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
        }
        // Mode still works on text
        assert!(remove_nulls(&t, Some("c"), NullMethod::Mode, None).is_ok());
    }

    #[test]
    fn test_mean_and_median_near_float_max() {
        let t = table(r#"[{"x":1e308},{"x":1e308},{"x":null}]"#);
        let result = remove_nulls(&t, Some("x"), NullMethod::Mean, None).unwrap();
        assert_eq!(result.affected_count, 1);
        assert_eq!(result.data.rows[2].get("x"), Some(&Value::Float(1e308)));

        let result = remove_nulls(&t, Some("x"), NullMethod::Median, None).unwrap();
        assert_eq!(result.data.rows[2].get("x"), Some(&Value::Float(1e308)));

        let m = mean(&[f64::MAX; 3]);
        assert!(m.is_finite());
        assert!((m - f64::MAX).abs() / f64::MAX < 1e-12);
        assert_eq!(mean(&[1.0, 5.0]), 3.0);
    }

    #[test]
    fn test_mode_tie_breaks_by_first_seen() {
        let t = table(r#"[{"c":"b"},{"c":"a"},{"c":null},{"c":"a"},{"c":"b"}]"#);
        let result = remove_nulls(&t, Some("c"), NullMethod::Mode, None).unwrap();
        assert_eq!(result.data.rows[2].get("c"), Some(&Value::from("b")));
    }

    #[test]
    fn test_mean_without_column_skips_categorical() {
        let t = table(r#"[{"n":2,"s":"x"},{"n":null,"s":null},{"n":4,"s":"y"}]"#);
        let result = remove_nulls(&t, None, NullMethod::Mean, None).unwrap();
        assert_eq!(result.affected_count, 1);
        assert_eq!(result.data.rows[1].get("n"), Some(&Value::Float(3.0)));
        assert_eq!(result.data.rows[1].get("s"), Some(&Value::Null));
    }

    #[test]
    fn test_custom_fill_all_columns() {
        let t = table(r#"[{"a":1,"b":null},{"a":null}]"#);
        let fill = Value::from("n/a");
        let result = remove_nulls(&t, None, NullMethod::Custom, Some(&fill)).unwrap();
        assert_eq!(result.affected_count, 3);
        assert_eq!(
            result.data,
            table(r#"[{"a":1,"b":"n/a"},{"a":"n/a","b":"n/a"}]"#)
        );
    }

    #[test]
    fn test_custom_requires_value() {
        let t = table(r#"[{"a":null}]"#);
        assert!(remove_nulls(&t, Some("a"), NullMethod::Custom, None).is_err());
    }

    #[test]
    fn test_unknown_column() {
        let t = table(r#"[{"a":null}]"#);
        let err = remove_nulls(&t, Some("b"), NullMethod::Delete, None).unwrap_err();
        assert!(matches!(err, EngineError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_count_nulls() {
        let t = table(r#"[{"a":1,"b":null},{"a":null},{"a":3,"b":""}]"#);
        let counts = count_nulls(&t, None).unwrap();
        assert_eq!(counts.counts["a"], 1);
        assert_eq!(counts.counts["b"], 2);
        assert_eq!(counts.total_nulls, 3);
        assert_eq!(counts.total_rows, 3);
    }
}
