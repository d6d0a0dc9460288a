//! Schema validation and data-quality checks.
//!
//! # Schema issues (block charting)
//!
//! - a column name is empty after trimming
//! - two or more names collide case-insensitively after trimming
//!
//! Nothing is auto-corrected: duplicates are flagged, never renamed.
//!
//! # Quality issues (advisory, shown at preview)
//!
//! - exact duplicate names
//! - empty names
//! - columns with more than half of their values missing

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{ColumnSchema, Dataset};

/// Share of missing values above which a column is reported.
pub const MISSING_DATA_RATIO: f64 = 0.5;

/// A reason a schema cannot advance to charting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaIssue {
    EmptyNames { count: usize },
    /// Colliding names, normalized (trimmed, lowercase), each listed once.
    DuplicateNames { names: Vec<String> },
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaIssue::EmptyNames { count } => write!(f, "{} columns have empty names", count),
            SchemaIssue::DuplicateNames { names } => {
                write!(f, "Duplicate column names detected: {}", names.join(", "))
            }
        }
    }
}

/// Validate a schema. An empty list means the schema is valid.
pub fn validate_schema(columns: &[ColumnSchema]) -> Vec<SchemaIssue> {
    validate_names(columns.iter().map(|c| c.name.as_str()))
}

/// Same checks over bare names.
pub fn validate_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut empty = 0;
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();

    for name in names {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            empty += 1;
            continue;
        }
        if !seen.insert(normalized.clone()) && !duplicates.contains(&normalized) {
            duplicates.push(normalized);
        }
    }

    if empty > 0 {
        issues.push(SchemaIssue::EmptyNames { count: empty });
    }
    if !duplicates.is_empty() {
        issues.push(SchemaIssue::DuplicateNames { names: duplicates });
    }
    issues
}

pub fn is_valid_schema(columns: &[ColumnSchema]) -> bool {
    validate_schema(columns).is_empty()
}

/// Advisory finding about a freshly assembled dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QualityIssue {
    DuplicateNames { names: Vec<String> },
    EmptyNames { count: usize },
    MissingData { columns: Vec<String> },
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityIssue::DuplicateNames { names } => {
                write!(f, "Duplicate column names: {}", names.join(", "))
            }
            QualityIssue::EmptyNames { count } => {
                write!(f, "{} columns have empty or invalid names", count)
            }
            QualityIssue::MissingData { columns } => {
                write!(f, "Columns with >50% missing data: {}", columns.join(", "))
            }
        }
    }
}

/// Data-quality checks run at preview time.
pub fn data_quality_issues(dataset: &Dataset) -> Vec<QualityIssue> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for column in &dataset.columns {
        if !seen.insert(column.name.as_str()) && !duplicates.contains(&column.name) {
            duplicates.push(column.name.clone());
        }
    }
    if !duplicates.is_empty() {
        issues.push(QualityIssue::DuplicateNames { names: duplicates });
    }

    let empty = dataset
        .columns
        .iter()
        .filter(|c| c.name.trim().is_empty())
        .count();
    if empty > 0 {
        issues.push(QualityIssue::EmptyNames { count: empty });
    }

    let sparse: Vec<String> = dataset
        .columns
        .iter()
        .filter(|c| c.missing_count() as f64 > c.values.len() as f64 * MISSING_DATA_RATIO)
        .map(|c| c.name.clone())
        .collect();
    if !sparse.is_empty() {
        issues.push(QualityIssue::MissingData { columns: sparse });
    }

    issues
}
