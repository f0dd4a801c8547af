//! JSON array parser

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value as Json;

use crate::model::{Row, Table, Value};

use super::{Parser, ReadOptions};

/// Parser for JSON files holding an array of objects
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, path: &Path, _options: &ReadOptions) -> Result<Table> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;
        let value: Json = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON file: {}", path.display()))?;
        table_from_json(value)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case("json")
    }
}

/// Build a table from a JSON array of objects (a single object is one row)
pub fn table_from_json(value: Json) -> Result<Table> {
    let items = match value {
        Json::Array(items) => items,
        Json::Object(_) => vec![value],
        _ => bail!("JSON must be an array of objects"),
    };

    let mut table = Table::new();
    for (index, item) in items.into_iter().enumerate() {
        let Json::Object(object) = item else {
            bail!("JSON row {} is not an object", index);
        };
        let row: Row = object
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect();
        table.add_row(row);
    }
    Ok(table)
}

fn json_to_value(value: Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or_else(|| Value::String(n.to_string()), Value::Float),
        },
        Json::String(s) => Value::String(s),
        // Nested structures are kept as their JSON text
        nested => Value::String(nested.to_string()),
    }
}
