//! Plain-text terminal output

use std::io::Write;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::model::Table;
use crate::ops::{ColumnStatistics, KindStats, OperationResult, Summary};
use crate::service::Response;

use super::OutputFormatter;

/// Terminal output rendering tables with box drawing
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }

    fn write_table(&self, table: &Table, columns: &[String], writer: &mut dyn Write) -> Result<()> {
        if columns.is_empty() {
            writeln!(writer, "(no columns)")?;
            return Ok(());
        }

        let mut builder = Builder::default();
        builder.push_record(columns.iter().cloned());
        for row in table.iter() {
            // Absent cells render blank so they stand apart from explicit nulls
            builder.push_record(columns.iter().map(|column| {
                row.get(column)
                    .map(|value| value.display().into_owned())
                    .unwrap_or_default()
            }));
        }
        writeln!(writer, "{}", styled(builder))?;
        Ok(())
    }

    fn write_summary(&self, summary: &Summary, writer: &mut dyn Write) -> Result<()> {
        let stats: Vec<&ColumnStatistics> = match summary {
            Summary::Column(stats) => vec![stats],
            Summary::Table(columns) => columns.values().collect(),
        };

        let mut builder = Builder::default();
        builder.push_record([
            "column", "kind", "count", "nulls", "distinct", "min", "max", "mean", "median",
            "std dev", "mode",
        ]);
        for s in stats {
            let mut record = vec![
                s.column.clone(),
                s.kind.to_string(),
                s.count.to_string(),
                s.null_count.to_string(),
                s.distinct_count.to_string(),
            ];
            match &s.stats {
                KindStats::Numeric(n) => {
                    record.extend([n.min, n.max, n.mean, n.median, n.std_dev].map(format_stat));
                    record.push(String::new());
                }
                KindStats::Categorical(c) => {
                    record.extend(std::iter::repeat(String::new()).take(5));
                    record.push(c.mode.clone().unwrap_or_default());
                }
            }
            builder.push_record(record);
        }
        writeln!(writer, "{}", styled(builder))?;
        Ok(())
    }

    fn write_result(&self, result: &OperationResult, writer: &mut dyn Write) -> Result<()> {
        match result {
            OperationResult::RemoveNulls(r) => {
                self.write_table(&r.data, &r.data.columns(), writer)?;
                writeln!(writer, "method: {}, affected: {}", r.method, r.affected_count)?;
            }
            OperationResult::Preview(r) => {
                self.write_table(&r.data, &r.columns, writer)?;
                writeln!(writer, "showing {} of {} rows", r.data.row_count(), r.total_rows)?;
            }
            OperationResult::Summary(summary) => self.write_summary(summary, writer)?,
            OperationResult::ConvertType(r) => {
                self.write_table(&r.data, &r.data.columns(), writer)?;
                writeln!(writer, "converted: {}, failed: {}", r.success_count, r.error_count)?;
                for e in &r.errors {
                    writeln!(
                        writer,
                        "  row {}: {} ({})",
                        e.row_index,
                        e.original_value.display(),
                        e.reason
                    )?;
                }
            }
            OperationResult::DerivedColumn(r) => {
                self.write_table(&r.data, &r.data.columns(), writer)?;
                for e in &r.errors {
                    writeln!(writer, "  {}", e)?;
                }
            }
            OperationResult::CountNulls(r) => {
                let mut builder = Builder::default();
                builder.push_record(["column", "nulls"]);
                for (column, count) in &r.counts {
                    builder.push_record([column.clone(), count.to_string()]);
                }
                writeln!(writer, "{}", styled(builder))?;
                writeln!(writer, "total: {} nulls in {} rows", r.total_nulls, r.total_rows)?;
            }
        }
        Ok(())
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, response: &Response, writer: &mut dyn Write) -> Result<()> {
        match response {
            Response::Accepted { result } => self.write_result(result, writer),
            // Status and message go to stderr
            Response::Rejected { .. } | Response::Failed { .. } => Ok(()),
        }
    }
}

fn styled(builder: Builder) -> String {
    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

fn format_stat(value: f64) -> String {
    let rounded = format!("{:.4}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{count_nulls, preview, summary};

    fn render(result: OperationResult) -> String {
        let mut out = Vec::new();
        TerminalOutput::new()
            .render(&Response::Accepted { result }, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn table(json: &str) -> Table {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_preview_table() {
        let t = table(r#"[{"name":"Ada","age":36},{"name":"Alan"}]"#);
        let out = render(OperationResult::Preview(preview(&t, 1)));
        assert!(out.contains("name"));
        assert!(out.contains("Ada"));
        assert!(!out.contains("Alan"));
        assert!(out.contains("showing 1 of 2 rows"));
    }

    #[test]
    fn test_summary_table() {
        let t = table(r#"[{"x":1,"c":"a"},{"x":3,"c":"a"}]"#);
        let out = render(OperationResult::Summary(summary(&t, None).unwrap()));
        assert!(out.contains("numeric"));
        assert!(out.contains("categorical"));
        assert!(out.contains("std dev"));
    }

    #[test]
    fn test_count_nulls_total() {
        let t = table(r#"[{"a":null,"b":1},{"a":2}]"#);
        let out = render(OperationResult::CountNulls(count_nulls(&t, None).unwrap()));
        assert!(out.contains("total: 2 nulls in 2 rows"));
    }

    #[test]
    fn test_rejected_writes_nothing() {
        let mut out = Vec::new();
        TerminalOutput::new()
            .render(
                &Response::Rejected {
                    message: "nope".to_string(),
                },
                &mut out,
            )
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(2.0), "2");
        assert_eq!(format_stat(2.50001), "2.5");
        assert_eq!(format_stat(-0.00001), "0");
    }
}
