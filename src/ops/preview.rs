//! Bounded table preview

use serde::{Deserialize, Serialize};

use crate::model::Table;

/// Result of `preview`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub data: Table,
    pub total_rows: usize,
    /// Columns of the whole table, not only of the returned prefix
    pub columns: Vec<String>,
}

/// Return the first `limit` rows together with the full column list
pub fn preview(table: &Table, limit: usize) -> PreviewResult {
    let take = limit.min(table.row_count());
    PreviewResult {
        data: Table::from_rows(table.rows[..take].to_vec()),
        total_rows: table.row_count(),
        columns: table.columns(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str) -> Table {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_preview_prefix_and_full_schema() {
        let t = table(r#"[{"a":1},{"a":2},{"a":3,"late":true}]"#);
        let result = preview(&t, 2);
        assert_eq!(result.data, table(r#"[{"a":1},{"a":2}]"#));
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.columns, vec!["a", "late"]);
    }

    #[test]
    fn test_preview_limit_beyond_length() {
        let t = table(r#"[{"a":1}]"#);
        let result = preview(&t, 50);
        assert_eq!(result.data.row_count(), 1);
    }

    #[test]
    fn test_preview_zero_limit() {
        let t = table(r#"[{"a":1}]"#);
        let result = preview(&t, 0);
        assert!(result.data.is_empty());
        assert_eq!(result.columns, vec!["a"]);
    }
}
