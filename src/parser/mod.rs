//! Parser layer for loading tabular files into a [`Table`]

mod csv;
mod excel;
mod json;

use std::path::Path;

use anyhow::{bail, Result};
use tracing::debug;

use crate::model::Table;

pub use self::csv::CsvParser;
pub use self::excel::ExcelParser;
pub use self::json::JsonParser;

/// Options that affect how a file is read
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Worksheet to read from a workbook (first sheet when unset)
    pub sheet: Option<String>,
}

impl ReadOptions {
    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }
}

/// Trait for parsing tabular data files
pub trait Parser: Send + Sync {
    /// Parse a file and return a Table
    fn parse(&self, path: &Path, options: &ReadOptions) -> Result<Table>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}

/// Factory for choosing a parser based on file extension
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(CsvParser), Box::new(ExcelParser), Box::new(JsonParser)],
        }
    }

    /// Get a parser for the given file path.
    ///
    /// Files without an extension are sniffed with [`detect_format`].
    pub fn get_parser(&self, path: &Path) -> Result<&dyn Parser> {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => detect_format(path).unwrap_or("csv").to_string(),
        };

        for parser in &self.parsers {
            if parser.supports_extension(&ext) {
                return Ok(parser.as_ref());
            }
        }

        bail!("Unsupported file format: {}", ext)
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path, options: &ReadOptions) -> Result<Table> {
        let parser = self.get_parser(path)?;
        let table = parser.parse(path, options)?;
        debug!(path = %path.display(), rows = table.row_count(), "loaded table");
        Ok(table)
    }
}

/// Detect file format from content
pub fn detect_format(path: &Path) -> Option<&'static str> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; 512];
    let bytes_read = file.read(&mut buffer).ok()?;
    let head = &buffer[..bytes_read];

    if head.starts_with(b"PK\x03\x04") {
        return Some("xlsx");
    }
    if head.starts_with(b"\xD0\xCF\x11\xE0") {
        return Some("xls");
    }

    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Some("json");
    }

    Some("csv")
}
