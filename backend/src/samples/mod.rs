//! Built-in sample datasets for trying the app without a file.

use serde::Serialize;

use crate::models::{CellValue, Column, ColumnType, Dataset};

/// Summary shown in sample pickers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInfo {
    pub key: &'static str,
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
}

const KEYS: &[&str] = &["sales", "website", "survey", "stock", "ecommerce"];

pub fn keys() -> &'static [&'static str] {
    KEYS
}

/// Build the sample dataset for `key`.
pub fn get(key: &str) -> Option<Dataset> {
    let dataset = match key {
        "sales" => Dataset::new(
            "Sales Performance",
            vec![
                text("Month", ColumnType::Category, &["Jan", "Feb", "Mar", "Apr", "May", "Jun"]),
                numbers("Revenue", &[45000.0, 52000.0, 48000.0, 61000.0, 55000.0, 67000.0]),
                numbers("Units Sold", &[450.0, 520.0, 480.0, 610.0, 550.0, 670.0]),
                text("Region", ColumnType::Category, &["North", "South", "North", "West", "East", "South"]),
            ],
        ),
        "website" => Dataset::new(
            "Website Analytics",
            vec![
                text(
                    "Date",
                    ColumnType::Date,
                    &["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"],
                ),
                numbers("Page Views", &[1250.0, 1420.0, 1180.0, 1650.0, 1890.0]),
                numbers("Unique Visitors", &[890.0, 1020.0, 840.0, 1150.0, 1340.0]),
                numbers("Bounce Rate", &[0.35, 0.42, 0.38, 0.29, 0.31]),
            ],
        ),
        "survey" => Dataset::new(
            "Customer Survey",
            vec![
                text("Age Group", ColumnType::Category, &["18-25", "26-35", "36-45", "46-55", "56+"]),
                numbers("Satisfaction", &[4.2, 4.5, 4.1, 4.7, 4.3]),
                numbers("Response Count", &[120.0, 180.0, 145.0, 95.0, 67.0]),
                text(
                    "Category",
                    ColumnType::Category,
                    &["Product", "Service", "Support", "Pricing", "Overall"],
                ),
            ],
        ),
        "stock" => Dataset::new(
            "Stock Prices",
            vec![
                text(
                    "Date",
                    ColumnType::Date,
                    &["2024-01-01", "2024-01-08", "2024-01-15", "2024-01-22", "2024-01-29"],
                ),
                numbers("AAPL", &[185.64, 182.31, 188.63, 191.25, 187.45]),
                numbers("GOOGL", &[140.93, 138.21, 142.56, 145.82, 144.15]),
                numbers("MSFT", &[376.04, 372.75, 380.12, 385.64, 382.89]),
                numbers("Volume", &[4500000.0, 3200000.0, 5100000.0, 4800000.0, 3900000.0]),
            ],
        ),
        "ecommerce" => Dataset::new(
            "E-commerce Metrics",
            vec![
                text(
                    "Product Category",
                    ColumnType::Category,
                    &["Electronics", "Clothing", "Books", "Home", "Sports"],
                ),
                numbers("Units Sold", &[234.0, 456.0, 123.0, 345.0, 178.0]),
                numbers("Revenue", &[15600.0, 22800.0, 2460.0, 13800.0, 8900.0]),
                numbers("Avg Price", &[66.67, 50.0, 20.0, 40.0, 50.0]),
                numbers("Return Rate", &[0.08, 0.15, 0.02, 0.05, 0.12]),
            ],
        ),
        _ => return None,
    };
    Some(dataset)
}

/// Summaries of every sample.
pub fn list() -> Vec<SampleInfo> {
    KEYS.iter()
        .filter_map(|&key| {
            get(key).map(|ds| SampleInfo {
                key,
                row_count: ds.row_count(),
                column_count: ds.columns.len(),
                name: ds.name,
            })
        })
        .collect()
}

fn text(name: &str, column_type: ColumnType, values: &[&str]) -> Column {
    Column::new(name, column_type, values.iter().map(|v| CellValue::from(*v)).collect())
}

fn numbers(name: &str, values: &[f64]) -> Column {
    Column::new(
        name,
        ColumnType::Number,
        values.iter().map(|v| CellValue::Number(*v)).collect(),
    )
}
