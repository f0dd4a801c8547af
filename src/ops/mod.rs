//! Table operations
//!
//! Every operation is a pure function: it borrows the input table and
//! returns a fresh one together with its diagnostics.

pub mod convert;
pub mod nulls;
pub mod preview;
pub mod summary;

use serde::Serialize;

use crate::expr::DerivedColumnResult;
use crate::model::{Table, Value};

pub use convert::{convert_type, ConversionError, ConvertTypeResult, PercentagePolicy, TargetType};
pub use nulls::{count_nulls, remove_nulls, NullCounts, NullMethod, RemoveNullsResult};
pub use preview::{preview, PreviewResult};
pub use summary::{summary, ColumnStatistics, KindStats, Summary};

/// Output of any operation, serialized without an extra wrapper
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OperationResult {
    RemoveNulls(RemoveNullsResult),
    Preview(PreviewResult),
    Summary(Summary),
    ConvertType(ConvertTypeResult),
    DerivedColumn(DerivedColumnResult),
    CountNulls(NullCounts),
}

impl OperationResult {
    /// Short operation name, as used in logs and request envelopes
    pub fn operation(&self) -> &'static str {
        match self {
            OperationResult::RemoveNulls(_) => "remove-nulls",
            OperationResult::Preview(_) => "preview",
            OperationResult::Summary(_) => "summary",
            OperationResult::ConvertType(_) => "convert-type",
            OperationResult::DerivedColumn(_) => "create-derived-column",
            OperationResult::CountNulls(_) => "count-nulls",
        }
    }

    /// True when any float in the result is NaN or infinite, which JSON
    /// cannot carry
    pub fn has_non_finite(&self) -> bool {
        let non_finite = |value: &Value| matches!(value, Value::Float(f) if !f.is_finite());
        if let Some(table) = self.data() {
            return table.iter().any(|row| row.iter().any(|(_, v)| non_finite(v)));
        }
        match self {
            OperationResult::Summary(Summary::Column(stats)) => !stats_are_finite(stats),
            OperationResult::Summary(Summary::Table(columns)) => {
                !columns.values().all(stats_are_finite)
            }
            _ => false,
        }
    }

    /// The transformed table, for operations that produce one
    pub fn data(&self) -> Option<&Table> {
        match self {
            OperationResult::RemoveNulls(r) => Some(&r.data),
            OperationResult::Preview(r) => Some(&r.data),
            OperationResult::ConvertType(r) => Some(&r.data),
            OperationResult::DerivedColumn(r) => Some(&r.data),
            OperationResult::Summary(_) | OperationResult::CountNulls(_) => None,
        }
    }
}

fn stats_are_finite(stats: &ColumnStatistics) -> bool {
    match &stats.stats {
        KindStats::Numeric(n) => [n.min, n.max, n.mean, n.median, n.std_dev]
            .iter()
            .all(|f| f.is_finite()),
        KindStats::Categorical(_) => true,
    }
}
