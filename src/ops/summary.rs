//! Per-column descriptive statistics

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::error::{require_column, Result};
use crate::model::{ColumnKind, Table};

use super::nulls::{mean, median};

/// Number of value/frequency pairs reported for categorical columns
pub const TOP_VALUES: usize = 5;

/// A value and how many times it occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrequency {
    pub value: String,
    pub count: usize,
}

/// Numeric statistics over the parseable subset of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericStats {
    /// Values that parsed as numbers
    pub numeric_count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// Categorical statistics over the stringified values of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalStats {
    pub mode: Option<String>,
    pub top_values: Vec<ValueFrequency>,
}

/// Kind-specific part of the statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

/// Statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStatistics {
    pub column: String,
    pub kind: ColumnKind,
    /// Present, non-null cells
    pub count: usize,
    /// Absent or null cells
    pub null_count: usize,
    /// Unique stringified non-null values
    pub distinct_count: usize,
    #[serde(flatten)]
    pub stats: KindStats,
}

/// Result of `summary`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Summary {
    Column(ColumnStatistics),
    Table(IndexMap<String, ColumnStatistics>),
}

/// Compute statistics for one column, or for every column when `column`
/// is `None`.
pub fn summary(table: &Table, column: Option<&str>) -> Result<Summary> {
    match column {
        Some(column) => {
            require_column(table, column)?;
            Ok(Summary::Column(column_statistics(table, column)))
        }
        None => Ok(Summary::Table(
            table
                .columns()
                .into_iter()
                .map(|c| {
                    let stats = column_statistics(table, &c);
                    (c, stats)
                })
                .collect(),
        )),
    }
}

/// Compute statistics for a single column
pub fn column_statistics(table: &Table, column: &str) -> ColumnStatistics {
    let values: Vec<_> = table.present_values(column).collect();
    let kind = ColumnKind::infer(values.iter().copied());

    // Frequency of the stringified values, in first-seen order
    let mut frequencies: IndexMap<String, usize, FxBuildHasher> = IndexMap::default();
    for value in &values {
        *frequencies.entry(value.display().into_owned()).or_insert(0) += 1;
    }

    let stats = match kind {
        ColumnKind::Numeric => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.parse_numeric()).collect();
            KindStats::Numeric(numeric_stats(numbers))
        }
        ColumnKind::Categorical => KindStats::Categorical(categorical_stats(&frequencies)),
    };

    ColumnStatistics {
        column: column.to_string(),
        kind,
        count: values.len(),
        null_count: table.row_count() - values.len(),
        distinct_count: frequencies.len(),
        stats,
    }
}

fn numeric_stats(mut numbers: Vec<f64>) -> NumericStats {
    if numbers.is_empty() {
        return NumericStats {
            numeric_count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
        };
    }

    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = mean(&numbers);

    NumericStats {
        numeric_count: numbers.len(),
        min,
        max,
        mean: avg,
        std_dev: population_std_dev(&numbers, avg, min.abs().max(max.abs())),
        median: median(&mut numbers),
    }
}

/// Population standard deviation. Falls back to values scaled by the
/// largest magnitude when the squared deviations overflow.
fn population_std_dev(numbers: &[f64], avg: f64, magnitude: f64) -> f64 {
    let n = numbers.len() as f64;
    let variance = numbers.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
    if variance.is_finite() || magnitude == 0.0 {
        return variance.sqrt();
    }

    let scaled_avg = avg / magnitude;
    let scaled_variance = numbers
        .iter()
        .map(|x| (x / magnitude - scaled_avg).powi(2))
        .sum::<f64>()
        / n;
    magnitude * scaled_variance.sqrt()
}

fn categorical_stats(frequencies: &IndexMap<String, usize, FxBuildHasher>) -> CategoricalStats {
    let mut ranked: Vec<(&String, &usize)> = frequencies.iter().collect();
    // Stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(a.1));

    let top_values: Vec<ValueFrequency> = ranked
        .into_iter()
        .take(TOP_VALUES)
        .map(|(value, count)| ValueFrequency {
            value: value.clone(),
            count: *count,
        })
        .collect();

    CategoricalStats {
        mode: top_values.first().map(|f| f.value.clone()),
        top_values,
    }
}
