//! Row filtering, grouping/aggregation, sorting and derived columns over
//! row objects.

use evalexpr::Value as ExprValue;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{CellValue, Row};

// =============================================================================
// Filtering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Equals,
    Contains,
    Greater,
    Less,
    /// Inclusive on both ends, uses `value2` as the upper bound.
    Between,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<CellValue>,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<CellValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(column: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::Between,
            value: CellValue::Number(low),
            value2: Some(CellValue::Number(high)),
        }
    }

    /// Numeric comparisons fail when either side is not numeric.
    pub fn matches(&self, row: &Row) -> bool {
        let null = CellValue::Null;
        let cell = row.get(&self.column).unwrap_or(&null);

        match self.operator {
            FilterOperator::Equals => *cell == self.value,
            FilterOperator::Contains => cell
                .to_string()
                .to_lowercase()
                .contains(&self.value.to_string().to_lowercase()),
            FilterOperator::Greater => matches!(
                (cell.as_number(), self.value.as_number()),
                (Some(a), Some(b)) if a > b
            ),
            FilterOperator::Less => matches!(
                (cell.as_number(), self.value.as_number()),
                (Some(a), Some(b)) if a < b
            ),
            FilterOperator::Between => {
                let high = self.value2.as_ref().and_then(|v| v.as_number());
                matches!(
                    (cell.as_number(), self.value.as_number(), high),
                    (Some(a), Some(low), Some(high)) if a >= low && a <= high
                )
            }
        }
    }
}

/// Keep rows satisfying every filter. No filters keeps everything.
pub fn filter_rows(rows: &[Row], filters: &[Filter]) -> Vec<Row> {
    rows.iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .cloned()
        .collect()
}

// =============================================================================
// Aggregation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub column: String,
    pub operation: AggregateOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Aggregation {
    pub fn new(column: impl Into<String>, operation: AggregateOp) -> Self {
        Self {
            column: column.into(),
            operation,
            alias: None,
        }
    }

    /// Output column name, `{op}_{column}` unless aliased.
    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.operation.as_str(), self.column))
    }

    /// Non-numeric values are skipped; an empty numeric set yields 0.
    fn apply(&self, rows: &[&Row]) -> f64 {
        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(&self.column).and_then(|v| v.as_number()))
            .collect();

        match self.operation {
            AggregateOp::Count => rows.len() as f64,
            _ if values.is_empty() => 0.0,
            AggregateOp::Sum => values.iter().sum(),
            AggregateOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggregateOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregateOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateConfig {
    pub group_by: Vec<String>,
    pub aggregations: Vec<Aggregation>,
}

/// Group rows and compute aggregations per group, in first-seen group
/// order. Each output row holds the group-by values (from the group's
/// first row) and one number per aggregation. With no group-by columns
/// the rows are returned unchanged.
pub fn aggregate_rows(rows: &[Row], config: &AggregateConfig) -> Vec<Row> {
    if config.group_by.is_empty() {
        return rows.to_vec();
    }

    let mut groups: Vec<(String, Vec<&Row>)> = Vec::new();
    for row in rows {
        let key = config
            .group_by
            .iter()
            .map(|col| row.get(col).map(|v| v.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("|");

        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }

    groups
        .into_iter()
        .map(|(_, members)| {
            let mut out = Row::new();
            for col in &config.group_by {
                out.insert(col.clone(), members[0].get(col).cloned().unwrap_or_default());
            }
            for agg in &config.aggregations {
                out.insert(agg.output_name(), CellValue::Number(agg.apply(&members)));
            }
            out
        })
        .collect()
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort a copy of the rows by one column. Two numbers compare numerically,
/// anything else compares as lowercase text. Stable.
pub fn sort_rows(rows: &[Row], column: &str, direction: SortDirection) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare_cells(a.get(column), b.get(column));
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    sorted
}

fn compare_cells(a: Option<&CellValue>, b: Option<&CellValue>) -> Ordering {
    match (a, b) {
        (Some(CellValue::Number(x)), Some(CellValue::Number(y))) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => {
            let x = a.map(|v| v.to_string().to_lowercase()).unwrap_or_default();
            let y = b.map(|v| v.to_string().to_lowercase()).unwrap_or_default();
            x.cmp(&y)
        }
    }
}

// =============================================================================
// Derived columns
// =============================================================================

/// Add a column computed per row from an arithmetic expression over column
/// names, e.g. `Revenue / Units Sold`. Referenced columns are replaced by
/// the row's values before evaluation. A row gets `Null` when a referenced
/// value is not numeric, the expression does not evaluate, or the result
/// is not a finite number.
pub fn add_derived_column(rows: &[Row], name: &str, expression: &str) -> Vec<Row> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    // Longest names first so "Units" never eats into "Units Sold"
    let mut names: Vec<&String> = first.keys().filter(|k| !k.is_empty()).collect();
    names.sort_by_key(|k| std::cmp::Reverse(k.chars().count()));
    let patterns: Vec<(&String, Regex)> = names
        .into_iter()
        .filter_map(|k| column_pattern(k).map(|re| (k, re)))
        .collect();

    rows.iter()
        .map(|row| {
            let value = substitute_columns(row, expression, &patterns)
                .map(|expr| evaluate(&expr))
                .unwrap_or(CellValue::Null);
            let mut out = row.clone();
            out.insert(name.to_string(), value);
            out
        })
        .collect()
}

fn column_pattern(name: &str) -> Option<Regex> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if name.starts_with(is_word) { r"\b" } else { "" };
    let end = if name.ends_with(is_word) { r"\b" } else { "" };
    Regex::new(&format!("{}{}{}", start, regex::escape(name), end)).ok()
}

fn substitute_columns(row: &Row, expression: &str, patterns: &[(&String, Regex)]) -> Option<String> {
    let mut expr = expression.to_string();
    for (name, re) in patterns {
        if !re.is_match(&expr) {
            continue;
        }
        let literal = match row.get(name.as_str())? {
            CellValue::Boolean(b) => b.to_string(),
            cell => format!("({:?})", cell.as_number()?),
        };
        expr = re.replace_all(&expr, NoExpand(&literal)).into_owned();
    }
    Some(expr)
}

fn evaluate(expr: &str) -> CellValue {
    match evalexpr::eval(expr) {
        Ok(ExprValue::Float(f)) if f.is_finite() => CellValue::Number(f),
        Ok(ExprValue::Int(i)) => CellValue::Number(i as f64),
        Ok(ExprValue::Boolean(b)) => CellValue::Boolean(b),
        _ => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    fn sales_rows() -> Vec<Row> {
        samples::get("sales").unwrap().rows
    }

    #[test]
    fn test_no_filters_keeps_all() {
        assert_eq!(filter_rows(&sales_rows(), &[]).len(), 6);
    }

    #[test]
    fn test_equals_is_strict() {
        let rows = sales_rows();
        let by_text = Filter::new("Revenue", FilterOperator::Equals, "45000");
        assert!(filter_rows(&rows, &[by_text]).is_empty());

        let by_number = Filter::new("Revenue", FilterOperator::Equals, 45000.0);
        assert_eq!(filter_rows(&rows, &[by_number]).len(), 1);
    }

    #[test]
    fn test_contains_case_insensitive() {
        let f = Filter::new("Region", FilterOperator::Contains, "OR");
        let out = filter_rows(&sales_rows(), &[f]);
        assert_eq!(out.len(), 2); // North x2
    }

    #[test]
    fn test_numeric_filters_combine() {
        let rows = sales_rows();
        let filters = vec![
            Filter::new("Revenue", FilterOperator::Greater, 48000.0),
            Filter::new("Units Sold", FilterOperator::Less, "600"),
        ];
        let out = filter_rows(&rows, &filters);
        let months: Vec<String> = out.iter().map(|r| r["Month"].to_string()).collect();
        assert_eq!(months, vec!["Feb", "May"]);
    }

    #[test]
    fn test_between_inclusive() {
        let out = filter_rows(&sales_rows(), &[Filter::between("Revenue", 48000.0, 55000.0)]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_numeric_filter_on_text_fails() {
        let f = Filter::new("Month", FilterOperator::Greater, 0.0);
        assert!(filter_rows(&sales_rows(), &[f]).is_empty());
    }

    #[test]
    fn test_aggregate_by_region() {
        let config = AggregateConfig {
            group_by: vec!["Region".into()],
            aggregations: vec![
                Aggregation::new("Revenue", AggregateOp::Sum),
                Aggregation::new("Revenue", AggregateOp::Avg),
                Aggregation::new("Revenue", AggregateOp::Count),
                Aggregation {
                    column: "Units Sold".into(),
                    operation: AggregateOp::Max,
                    alias: Some("best".into()),
                },
            ],
        };
        let out = aggregate_rows(&sales_rows(), &config);

        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["Region"], CellValue::from("North"));
        assert_eq!(out[0]["sum_Revenue"], CellValue::Number(93000.0));
        assert_eq!(out[0]["avg_Revenue"], CellValue::Number(46500.0));
        assert_eq!(out[0]["count_Revenue"], CellValue::Number(2.0));
        assert_eq!(out[1]["best"], CellValue::Number(670.0));
    }

    #[test]
    fn test_aggregate_without_group_by() {
        let out = aggregate_rows(&sales_rows(), &AggregateConfig::default());
        assert_eq!(out, sales_rows());
    }

    #[test]
    fn test_aggregate_empty_numeric_set_is_zero() {
        let config = AggregateConfig {
            group_by: vec!["Region".into()],
            aggregations: vec![Aggregation::new("Month", AggregateOp::Min)],
        };
        let out = aggregate_rows(&sales_rows(), &config);
        assert_eq!(out[0]["min_Month"], CellValue::Number(0.0));
    }

    #[test]
    fn test_derived_column_ratio() {
        let out = add_derived_column(&sales_rows(), "Price", "Revenue / Units Sold");

        assert_eq!(out.len(), 6);
        for row in &out {
            assert_eq!(row["Price"], CellValue::Number(100.0));
        }
        // appended after the existing columns
        assert_eq!(out[0].keys().last().map(String::as_str), Some("Price"));
    }

    #[test]
    fn test_derived_column_with_literals() {
        let out = add_derived_column(&sales_rows(), "Target", "Revenue * 1.1 + 500");
        assert_eq!(out[0]["Target"].as_number().map(|n| n.round()), Some(50000.0));
    }

    #[test]
    fn test_derived_column_invalid_expression_is_null() {
        let out = add_derived_column(&sales_rows(), "Broken", "Revenue +");
        assert!(out.iter().all(|r| r["Broken"] == CellValue::Null));

        let out = add_derived_column(&sales_rows(), "Unknown", "Revenue * Discount");
        assert!(out.iter().all(|r| r["Unknown"] == CellValue::Null));
    }

    #[test]
    fn test_derived_column_non_numeric_operand_is_null() {
        let out = add_derived_column(&sales_rows(), "Odd", "Month * 2");
        assert_eq!(out[0]["Odd"], CellValue::Null);

        let out = add_derived_column(&sales_rows(), "Inf", "Revenue / 0.0");
        assert_eq!(out[0]["Inf"], CellValue::Null);
    }

    #[test]
    fn test_derived_column_empty_rows() {
        assert!(add_derived_column(&[], "x", "1 + 1").is_empty());
    }

    #[test]
    fn test_sort_numeric_and_text() {
        let rows = sales_rows();

        let by_revenue = sort_rows(&rows, "Revenue", SortDirection::Desc);
        assert_eq!(by_revenue[0]["Month"], CellValue::from("Jun"));

        let by_month = sort_rows(&rows, "Month", SortDirection::Asc);
        let months: Vec<String> = by_month.iter().map(|r| r["Month"].to_string()).collect();
        assert_eq!(months, vec!["Apr", "Feb", "Jan", "Jun", "Mar", "May"]);
    }
}
