//! Per-column summaries.

use serde::Serialize;
use std::collections::HashSet;

use crate::models::{CellValue, Dataset};

/// Descriptive statistics over the numeric values of a column.
///
/// `mean`, `median` and `std` (population) are rounded to 2 decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

/// Stats for a column. All zero when the column is unknown or has no
/// numeric values.
pub fn column_stats(dataset: &Dataset, column: &str) -> ColumnStats {
    let mut values: Vec<f64> = dataset
        .rows
        .iter()
        .filter_map(|row| row.get(column).and_then(|v| v.as_number()))
        .collect();

    if values.is_empty() {
        return ColumnStats::default();
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    ColumnStats {
        count: n,
        min: values[0],
        max: values[n - 1],
        mean: round2(mean),
        median: round2(median),
        std: round2(variance.sqrt()),
    }
}

/// Distinct non-null values of a column, in first-seen order.
pub fn unique_values(dataset: &Dataset, column: &str) -> Vec<CellValue> {
    let mut seen = HashSet::new();
    dataset
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| **v != CellValue::Null)
        .filter(|v| seen.insert(v.identity_key()))
        .cloned()
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
