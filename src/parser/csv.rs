//! CSV file parser

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{Row, Table, Value};

use super::{Parser, ReadOptions};

/// Parser for CSV files
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(&self, path: &Path, _options: &ReadOptions) -> Result<Table> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        read_csv(BufReader::new(file), delimiter)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv" | "tsv" | "txt")
    }
}

/// Read CSV with a header row from any reader
pub fn read_csv<R: Read>(reader: R, delimiter: u8) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("Column{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut table = Table::new();
    for (line_num, result) in csv_reader.records().enumerate() {
        // +2 for 1-indexing and header
        let record = result.with_context(|| format!("Failed to read CSV row {}", line_num + 2))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        // Short rows are padded with nulls, extra fields are dropped
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), record.get(i).map_or(Value::Null, parse_cell_value)))
            .collect();
        table.add_row(row);
    }

    Ok(table)
}

/// Parse a string value into a Value with type inference
fn parse_cell_value(s: &str) -> Value {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Value::Null;
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    // "inf" and "nan" stay text
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }

    Value::String(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(""), Value::Null);
        assert_eq!(parse_cell_value("  "), Value::Null);
        assert_eq!(parse_cell_value("null"), Value::String("null".to_string()));
        assert_eq!(parse_cell_value("TRUE"), Value::Bool(true));
        assert_eq!(parse_cell_value("42"), Value::Int(42));
        assert_eq!(parse_cell_value("3.5"), Value::Float(3.5));
        assert_eq!(parse_cell_value("NaN"), Value::String("NaN".to_string()));
        assert_eq!(parse_cell_value("2024-01-15"), Value::String("2024-01-15".to_string()));
    }

    #[test]
    fn test_read_csv_pads_short_rows() {
        let input = "name,age,city\nAlice,30,Paris\nBob,\n\n";
        let table = read_csv(input.as_bytes(), b',').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.columns(), vec!["name", "age", "city"]);
        assert_eq!(table.rows[1].get("age"), Some(&Value::Null));
        assert_eq!(table.rows[1].get("city"), Some(&Value::Null));
    }
}
