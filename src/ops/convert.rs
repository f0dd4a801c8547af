//! Per-cell type coercion

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{require_column, Result};
use crate::model::{Row, Table, Value};

/// Semantic type a column can be converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Numeric,
    String,
    Date,
    Percentage,
    Boolean,
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numeric" | "number" => Ok(TargetType::Numeric),
            "string" | "text" => Ok(TargetType::String),
            "date" => Ok(TargetType::Date),
            "percentage" | "percent" => Ok(TargetType::Percentage),
            "boolean" | "bool" => Ok(TargetType::Boolean),
            _ => Err(format!("Unknown target type: {}", s)),
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TargetType::Numeric => "numeric",
            TargetType::String => "string",
            TargetType::Date => "date",
            TargetType::Percentage => "percentage",
            TargetType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

/// How bare numbers (no `%` suffix) are normalised to fractions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentagePolicy {
    /// Values above 1 are read as whole percentages and divided by 100;
    /// values in `[-1, 1]` are already fractions
    #[default]
    ScaleAboveOne,
    /// Only an explicit `%` suffix divides by 100
    SuffixOnly,
}

impl std::str::FromStr for PercentagePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "scale_above_one" => Ok(PercentagePolicy::ScaleAboveOne),
            "suffix_only" => Ok(PercentagePolicy::SuffixOnly),
            _ => Err(format!("Unknown percentage policy: {}", s)),
        }
    }
}

/// A cell that could not be converted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionError {
    pub row_index: usize,
    pub original_value: Value,
    pub reason: String,
}

/// Result of `convert_type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertTypeResult {
    pub data: Table,
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<ConversionError>,
}

/// Date layouts accepted by the `date` target, tried in order.
/// Month-first slashes win over day-first for ambiguous inputs.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', '¢'];

/// Convert one column to `target`, cell by cell.
///
/// Cells that fail keep their original value and are reported in `errors`.
/// Absent and null cells pass through without being counted.
pub fn convert_type(
    table: &Table,
    column: &str,
    target: TargetType,
    policy: PercentagePolicy,
) -> Result<ConvertTypeResult> {
    require_column(table, column)?;

    let mut success_count = 0;
    let mut errors = Vec::new();

    let rows: Vec<Row> = table
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let mut row = row.clone();
            if let Some(original) = row.present(column).cloned() {
                match convert_value(&original, target, policy) {
                    Ok(converted) => {
                        row.insert(column, converted);
                        success_count += 1;
                    }
                    Err(reason) => errors.push(ConversionError {
                        row_index,
                        original_value: original,
                        reason,
                    }),
                }
            }
            row
        })
        .collect();

    Ok(ConvertTypeResult {
        data: Table::from_rows(rows),
        success_count,
        error_count: errors.len(),
        errors,
    })
}

/// Convert a single non-null value
pub fn convert_value(
    value: &Value,
    target: TargetType,
    policy: PercentagePolicy,
) -> std::result::Result<Value, String> {
    match target {
        TargetType::Numeric => to_numeric(value),
        TargetType::String => Ok(Value::String(value.display().into_owned())),
        TargetType::Date => to_date(value),
        TargetType::Percentage => to_percentage(value, policy),
        TargetType::Boolean => to_boolean(value),
    }
}

fn to_numeric(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::String(s) => parse_number(s).ok_or_else(|| format!("cannot parse '{}' as a number", s)),
        Value::Null => Ok(Value::Null),
    }
}

/// Parse text as a number after removing currency symbols, thousands
/// separators and whitespace. Integral text becomes an `Int`.
fn parse_number(text: &str) -> Option<Value> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '_' && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let integral = cleaned
        .strip_prefix(|c: char| c == '-' || c == '+')
        .unwrap_or(cleaned.as_str())
        .chars()
        .all(|c| c.is_ascii_digit());
    if integral {
        if let Ok(i) = cleaned.parse::<i64>() {
            return Some(Value::Int(i));
        }
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

fn to_date(value: &Value) -> std::result::Result<Value, String> {
    let text = match value {
        Value::String(s) => s.trim(),
        other => return Err(format!("cannot interpret {} value as a date", other.type_name())),
    };

    parse_date(text)
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .ok_or_else(|| format!("unrecognized date format: '{}'", text))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn to_percentage(value: &Value, policy: PercentagePolicy) -> std::result::Result<Value, String> {
    let (number, has_suffix) = match value {
        Value::Int(_) | Value::Float(_) => (value.as_f64().unwrap_or_default(), false),
        Value::String(s) => {
            let trimmed = s.trim();
            let (digits, has_suffix) = match trimmed.strip_suffix('%') {
                Some(rest) => (rest, true),
                None => (trimmed, false),
            };
            let number = parse_number(digits)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| format!("cannot parse '{}' as a percentage", s))?;
            (number, has_suffix)
        }
        other => return Err(format!("cannot interpret {} value as a percentage", other.type_name())),
    };

    let scale = has_suffix
        || match policy {
            PercentagePolicy::ScaleAboveOne => number.abs() > 1.0,
            PercentagePolicy::SuffixOnly => false,
        };
    Ok(Value::Float(if scale { number / 100.0 } else { number }))
}

fn to_boolean(value: &Value) -> std::result::Result<Value, String> {
    if let Value::Bool(_) = value {
        return Ok(value.clone());
    }
    match value.display().trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(format!("cannot interpret '{}' as a boolean", value.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn table(json: &str) -> Table {
        serde_json::from_str(json).unwrap()
    }

    fn convert(json: &str, target: TargetType) -> ConvertTypeResult {
        convert_type(&table(json), "v", target, PercentagePolicy::default()).unwrap()
    }

    #[test]
    fn test_boolean_vocabulary() {
        let result = convert(r#"[{"v":"yes"},{"v":"maybe"},{"v":"0"}]"#, TargetType::Boolean);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.data.rows[0].get("v"), Some(&Value::Bool(true)));
        assert_eq!(result.data.rows[1].get("v"), Some(&Value::from("maybe")));
        assert_eq!(result.data.rows[2].get("v"), Some(&Value::Bool(false)));
        assert_eq!(result.errors[0].row_index, 1);
        assert_eq!(result.errors[0].original_value, Value::from("maybe"));
    }

    #[test]
    fn test_numeric_cleaning() {
        let result = convert(
            r#"[{"v":"$1,234"},{"v":" 2.50 "},{"v":"€-3"},{"v":"abc"},{"v":null},{"w":1}]"#,
            TargetType::Numeric,
        );
        assert_eq!(result.data.rows[0].get("v"), Some(&Value::Int(1234)));
        assert_eq!(result.data.rows[1].get("v"), Some(&Value::Float(2.5)));
        assert_eq!(result.data.rows[2].get("v"), Some(&Value::Int(-3)));
        assert_eq!(result.data.rows[3].get("v"), Some(&Value::from("abc")));
        assert_eq!(result.data.rows[4].get("v"), Some(&Value::Null));
        assert_eq!(result.data.rows[5].get("v"), None);
        assert_eq!(result.success_count + result.error_count, 4);
    }

    #[test]
    fn test_string_is_idempotent() {
        let once = convert(r#"[{"v":1.0},{"v":true},{"v":"x"},{"v":2.25}]"#, TargetType::String);
        let twice =
            convert_type(&once.data, "v", TargetType::String, PercentagePolicy::default()).unwrap();
        assert_eq!(once.data, twice.data);
        assert_eq!(once.data.rows[0].get("v"), Some(&Value::from("1")));
        assert_eq!(once.data.rows[1].get("v"), Some(&Value::from("true")));
        assert_eq!(once.data.rows[3].get("v"), Some(&Value::from("2.25")));
    }

    #[test]
    fn test_date_formats() {
        let result = convert(
            r#"[{"v":"2024-03-05"},{"v":"03/05/2024"},{"v":"5 March 2024"},{"v":"2024-03-05T10:00:00Z"},{"v":"soon"},{"v":20240305}]"#,
            TargetType::Date,
        );
        for i in 0..4 {
            assert_eq!(result.data.rows[i].get("v"), Some(&Value::from("2024-03-05")));
        }
        assert_eq!(result.error_count, 2);
        assert_eq!(result.errors[0].row_index, 4);
    }

    #[test]
    fn test_day_first_fallback() {
        let result = convert(r#"[{"v":"25/12/2023"}]"#, TargetType::Date);
        assert_eq!(result.data.rows[0].get("v"), Some(&Value::from("2023-12-25")));
    }

    #[test]
    fn test_percentage_policies() {
        let t = table(r#"[{"v":"45%"},{"v":"45"},{"v":0.3},{"v":"x%"}]"#);
        let scaled = convert_type(&t, "v", TargetType::Percentage, PercentagePolicy::ScaleAboveOne)
            .unwrap();
        assert_eq!(scaled.data.rows[0].get("v"), Some(&Value::Float(0.45)));
        assert_eq!(scaled.data.rows[1].get("v"), Some(&Value::Float(0.45)));
        assert_eq!(scaled.data.rows[2].get("v"), Some(&Value::Float(0.3)));
        assert_eq!(scaled.error_count, 1);

        let suffix = convert_type(&t, "v", TargetType::Percentage, PercentagePolicy::SuffixOnly)
            .unwrap();
        assert_eq!(suffix.data.rows[1].get("v"), Some(&Value::Float(45.0)));

        // Exactly 1 is already a fraction; the threshold uses magnitude
        let edges = table(r#"[{"v":1},{"v":"1%"},{"v":-45},{"v":"-0.5"},{"v":"%"},{"v":" 12.5 % "}]"#);
        let scaled =
            convert_type(&edges, "v", TargetType::Percentage, PercentagePolicy::ScaleAboveOne)
                .unwrap();
        assert_eq!(scaled.data.rows[0].get("v"), Some(&Value::Float(1.0)));
        assert_eq!(scaled.data.rows[1].get("v"), Some(&Value::Float(0.01)));
        assert_eq!(scaled.data.rows[2].get("v"), Some(&Value::Float(-0.45)));
        assert_eq!(scaled.data.rows[3].get("v"), Some(&Value::Float(-0.5)));
        assert_eq!(scaled.data.rows[4].get("v"), Some(&Value::from("%")));
        assert_eq!(scaled.data.rows[5].get("v"), Some(&Value::Float(0.125)));
        assert_eq!(scaled.error_count, 1);
        assert_eq!(scaled.errors[0].row_index, 4);

        let suffix =
            convert_type(&edges, "v", TargetType::Percentage, PercentagePolicy::SuffixOnly)
                .unwrap();
        assert_eq!(suffix.data.rows[2].get("v"), Some(&Value::Float(-45.0)));
        assert_eq!(suffix.data.rows[1].get("v"), Some(&Value::Float(0.01)));
    }

    #[test]
    fn test_missing_column_is_invalid_input() {
        let err = convert_type(
            &table(r#"[{"a":1}]"#),
            "v",
            TargetType::Numeric,
            PercentagePolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ColumnNotFound { .. }));
    }
}
