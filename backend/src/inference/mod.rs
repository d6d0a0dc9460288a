//! Column type inference.
//!
//! Each non-missing value is bucketed as numeric, date or string (checked
//! in that order). The column type is then decided from the bucket ratios:
//!
//! ```text
//! number_count / total >= number_ratio            -> number
//! date_count / total   >= date_ratio              -> date
//! distinct < min(max_distinct, total * ratio)
//!   and at least one string value                 -> category
//! otherwise                                       -> string
//! ```
//!
//! Number and date are checked before cardinality, so a low-cardinality
//! numeric column is still `number`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{CellValue, ColumnType};

/// Default share of numeric values for a `number` column.
pub const DEFAULT_NUMBER_RATIO: f64 = 0.8;
/// Default share of date values for a `date` column.
pub const DEFAULT_DATE_RATIO: f64 = 0.6;
/// Distinct values must stay below this for `category`.
pub const DEFAULT_CATEGORY_MAX_DISTINCT: usize = 50;
/// ...and below this share of the non-missing values.
pub const DEFAULT_CATEGORY_DISTINCT_RATIO: f64 = 0.1;

/// Thresholds driving the type decision. Boundaries are inclusive for the
/// ratios and exclusive for the distinct-value cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceThresholds {
    pub number_ratio: f64,
    pub date_ratio: f64,
    pub category_max_distinct: usize,
    pub category_distinct_ratio: f64,
}

impl Default for InferenceThresholds {
    fn default() -> Self {
        Self {
            number_ratio: DEFAULT_NUMBER_RATIO,
            date_ratio: DEFAULT_DATE_RATIO,
            category_max_distinct: DEFAULT_CATEGORY_MAX_DISTINCT,
            category_distinct_ratio: DEFAULT_CATEGORY_DISTINCT_RATIO,
        }
    }
}

/// Bucket a single value falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Numeric,
    Date,
    String,
}

/// Bucket counts for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    /// Non-missing values.
    pub total: usize,
    pub number_count: usize,
    pub date_count: usize,
    pub string_count: usize,
    pub distinct_count: usize,
}

impl ColumnProfile {
    /// Apply the decision order to the counts.
    pub fn classify(&self, thresholds: &InferenceThresholds) -> ColumnType {
        if self.total == 0 {
            return ColumnType::String;
        }

        let total = self.total as f64;

        if self.number_count as f64 / total >= thresholds.number_ratio {
            return ColumnType::Number;
        }

        if self.date_count as f64 / total >= thresholds.date_ratio {
            return ColumnType::Date;
        }

        let distinct_cap = (thresholds.category_max_distinct as f64)
            .min(total * thresholds.category_distinct_ratio);
        if (self.distinct_count as f64) < distinct_cap && self.string_count > 0 {
            return ColumnType::Category;
        }

        ColumnType::String
    }
}

/// Count buckets and distinct values over the non-missing values.
pub fn profile_column(values: &[CellValue]) -> ColumnProfile {
    let mut profile = ColumnProfile::default();
    let mut distinct: HashSet<String> = HashSet::new();

    for value in values.iter().filter(|v| !v.is_missing()) {
        profile.total += 1;
        distinct.insert(value.identity_key());

        match classify_value(value) {
            ValueKind::Numeric => profile.number_count += 1,
            ValueKind::Date => profile.date_count += 1,
            ValueKind::String => profile.string_count += 1,
        }
    }

    profile.distinct_count = distinct.len();
    profile
}

/// Infer the type of a column from its raw values.
pub fn infer_column_type(values: &[CellValue], thresholds: &InferenceThresholds) -> ColumnType {
    profile_column(values).classify(thresholds)
}

/// Bucket one value: numeric first, then date, else string.
pub fn classify_value(value: &CellValue) -> ValueKind {
    if value.as_number().is_some() {
        return ValueKind::Numeric;
    }

    match value {
        CellValue::Text(s) if is_date_string(s) => ValueKind::Date,
        _ => ValueKind::String,
    }
}

// =============================================================================
// Date recognition
// =============================================================================

/// Fixed patterns and the chrono format that validates the calendar date.
static DATE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^\d{4}-\d{2}-\d{2}$", "%Y-%m-%d"),
        (r"^\d{2}/\d{2}/\d{4}$", "%m/%d/%Y"),
        (r"^\d{2}-\d{2}-\d{4}$", "%m-%d-%Y"),
        (r"^\d{4}/\d{2}/\d{2}$", "%Y/%m/%d"),
    ]
    .into_iter()
    .filter_map(|(pattern, format)| Regex::new(pattern).ok().map(|re| (re, format)))
    .collect()
});

/// ISO partial dates (`YYYY-MM`, `YYYY`) and the suffix completing them.
static PARTIAL_ISO_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [(r"^\d{4}-\d{2}$", "-01"), (r"^\d{4}$", "-01-01")]
        .into_iter()
        .filter_map(|(pattern, suffix)| Regex::new(pattern).ok().map(|re| (re, suffix)))
        .collect()
});

const GENERIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const GENERIC_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%a %b %d %Y",
];

/// A string is a date when it matches a recognized pattern and forms a
/// valid calendar date, or when the generic parser accepts it.
pub fn is_date_string(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    for (re, format) in DATE_PATTERNS.iter() {
        if re.is_match(s) {
            return NaiveDate::parse_from_str(s, format).is_ok();
        }
    }

    parse_generic_date(s).is_some()
}

/// Lenient date parsing: ISO partial dates, RFC 3339, RFC 2822 and
/// common written forms.
pub fn parse_generic_date(s: &str) -> Option<NaiveDateTime> {
    for (re, suffix) in PARTIAL_ISO_PATTERNS.iter() {
        if re.is_match(s) {
            return NaiveDate::parse_from_str(&format!("{}{}", s, suffix), "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for format in GENERIC_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in GENERIC_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
