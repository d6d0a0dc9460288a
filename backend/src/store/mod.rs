//! Dataset persistence.
//!
//! Only a summary is stored: schema, row count, the first rows as a sample
//! and the chart configuration.
//!
//! - [`RemoteStore`] - posts to the hosted save-dataset function
//! - [`LocalStore`] - JSON files on disk, used when no remote is configured

pub mod local;
pub mod remote;

use serde::{Deserialize, Serialize};

use crate::chart::ChartConfig;
use crate::models::{ColumnSchema, Dataset, Row};

pub use local::{LocalStore, StoredDataset};
pub use remote::RemoteStore;

/// Rows kept in a saved summary.
pub const SAMPLE_ROW_LIMIT: usize = 10;

/// Body of a save request. Field names are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDatasetRequest {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub row_count: usize,
    pub sample_rows: Vec<Row>,
    pub chart_config: Option<ChartConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl SaveDatasetRequest {
    pub fn from_dataset(dataset: &Dataset, chart_config: Option<ChartConfig>) -> Self {
        Self {
            name: dataset.name.clone(),
            columns: dataset.schema(),
            row_count: dataset.row_count(),
            sample_rows: dataset.rows.iter().take(SAMPLE_ROW_LIMIT).cloned().collect(),
            chart_config,
            file_url: None,
        }
    }
}

/// Answer of a save. Failures carry `error` instead of an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDatasetResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
