//! Chart configuration, recommendations and series derivation.
//!
//! Rendering is done by the web client; this module only decides what to
//! plot. Series are plain `x`/`y` (or `labels`/`values` for pies) arrays.

use serde::{Deserialize, Serialize};

use crate::models::{CellValue, ColumnType, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Scatter,
    Histogram,
    Pie,
    Area,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Scatter => "scatter",
            ChartType::Histogram => "histogram",
            ChartType::Pie => "pie",
            ChartType::Area => "area",
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<Vec<String>>,
}

/// User-selected visualization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub options: ChartOptions,
}

impl ChartConfig {
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            x_axis: None,
            y_axis: None,
            group_by: None,
            title: None,
            options: ChartOptions::default(),
        }
    }

    pub fn with_x(mut self, column: impl Into<String>) -> Self {
        self.x_axis = Some(column.into());
        self
    }

    pub fn with_y(mut self, column: impl Into<String>) -> Self {
        self.y_axis = Some(column.into());
        self
    }

    pub fn with_group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by = Some(column.into());
        self
    }

    /// Names of axes that do not match any dataset column.
    pub fn unknown_columns(&self, dataset: &Dataset) -> Vec<String> {
        [&self.x_axis, &self.y_axis, &self.group_by]
            .into_iter()
            .flatten()
            .filter(|name| !name.is_empty() && dataset.column(name).is_none())
            .cloned()
            .collect()
    }
}

/// A suggested chart type for a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecommendation {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub reason: String,
    pub confidence: f64,
}

/// Suggest chart types from the column types, highest confidence first.
pub fn recommend_charts(dataset: &Dataset) -> Vec<ChartRecommendation> {
    let numeric = dataset.columns_of_type(ColumnType::Number).count();
    let dates = dataset.columns_of_type(ColumnType::Date).count();
    let categorical = dataset
        .columns
        .iter()
        .filter(|c| c.column_type.is_categorical())
        .count();

    let mut recs = Vec::new();
    let mut push = |chart_type, reason: &str, confidence| {
        recs.push(ChartRecommendation {
            chart_type,
            reason: reason.to_string(),
            confidence,
        })
    };

    if dates > 0 && numeric > 0 {
        push(ChartType::Line, "Time series data detected", 0.9);
        push(ChartType::Area, "Good for cumulative time trends", 0.7);
    }
    if categorical > 0 && numeric > 0 {
        push(ChartType::Bar, "Categories with numeric values", 0.8);
    }
    if numeric >= 2 {
        push(ChartType::Scatter, "Multiple numeric variables for correlation", 0.7);
    }
    if numeric >= 1 {
        push(ChartType::Histogram, "Analyze numeric distribution", 0.6);
    }
    if categorical > 0 {
        push(ChartType::Pie, "Show category proportions", 0.5);
    }

    // stable: equal confidences keep insertion order
    recs.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    recs
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<CellValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<CellValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
}

impl ChartSeries {
    fn xy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: Vec::new(),
            y: Vec::new(),
            labels: Vec::new(),
            values: Vec::new(),
        }
    }
}

fn non_empty(axis: &Option<String>) -> Option<&str> {
    axis.as_deref().filter(|s| !s.is_empty())
}

/// Derive plot series for a configuration. `None` when a required axis is
/// unset or names no column.
pub fn build_series(dataset: &Dataset, config: &ChartConfig) -> Option<Vec<ChartSeries>> {
    let x = non_empty(&config.x_axis);
    let y = non_empty(&config.y_axis);

    match config.chart_type {
        ChartType::Bar | ChartType::Line | ChartType::Area => {
            let (x, y) = (x?, y?);
            dataset.column(x)?;
            dataset.column(y)?;

            match non_empty(&config.group_by) {
                Some(group) => {
                    dataset.column(group)?;
                    let mut series: Vec<(String, ChartSeries)> = Vec::new();
                    for row in &dataset.rows {
                        let key = row.get(group).cloned().unwrap_or_default().to_string();
                        let idx = match series.iter().position(|(k, _)| *k == key) {
                            Some(idx) => idx,
                            None => {
                                series.push((key.clone(), ChartSeries::xy(key)));
                                series.len() - 1
                            }
                        };
                        let s = &mut series[idx].1;
                        s.x.push(row.get(x).cloned().unwrap_or_default());
                        s.y.push(row.get(y).cloned().unwrap_or_default());
                    }
                    Some(series.into_iter().map(|(_, s)| s).collect())
                }
                None => {
                    let mut s = ChartSeries::xy(y);
                    s.x = column_values(dataset, x);
                    s.y = column_values(dataset, y);
                    Some(vec![s])
                }
            }
        }

        ChartType::Scatter => {
            let (x, y) = (x?, y?);
            dataset.column(x)?;
            dataset.column(y)?;
            let mut s = ChartSeries::xy(format!("{} vs {}", x, y));
            s.x = column_values(dataset, x);
            s.y = column_values(dataset, y);
            Some(vec![s])
        }

        ChartType::Histogram => {
            let column = match y {
                Some(y) => dataset.column(y)?,
                None => dataset.columns_of_type(ColumnType::Number).next()?,
            };
            let mut s = ChartSeries::xy(column.name.clone());
            s.x = column.values.clone();
            Some(vec![s])
        }

        ChartType::Pie => {
            let x = x?;
            dataset.column(x)?;
            let mut labels: Vec<String> = Vec::new();
            let mut counts: Vec<f64> = Vec::new();
            for row in &dataset.rows {
                let label = row.get(x).cloned().unwrap_or_default().to_string();
                match labels.iter().position(|l| *l == label) {
                    Some(idx) => counts[idx] += 1.0,
                    None => {
                        labels.push(label);
                        counts.push(1.0);
                    }
                }
            }
            let mut s = ChartSeries::xy(x);
            s.labels = labels;
            s.values = counts;
            Some(vec![s])
        }
    }
}

fn column_values(dataset: &Dataset, name: &str) -> Vec<CellValue> {
    dataset
        .rows
        .iter()
        .map(|row| row.get(name).cloned().unwrap_or_default())
        .collect()
}
