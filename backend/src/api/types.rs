//! REST API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::chart::{recommend_charts, ChartConfig, ChartRecommendation};
use crate::error::ParseWarning;
use crate::models::{ColumnSchema, Dataset};
use crate::parser::FileFormat;
use crate::pipeline::ParseOutcome;
use crate::validation::{validate_schema, QualityIssue, SchemaIssue};

/// Response sent after an upload is parsed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub job_id: String,

    /// `ready`, or `warning` when there are decoder warnings, quality
    /// issues or schema issues.
    pub status: String,

    pub dataset: Dataset,
    pub format: FileFormat,
    pub warnings: Vec<ParseWarning>,
    pub quality_issues: Vec<QualityIssue>,
    pub schema_issues: Vec<SchemaIssue>,
    pub recommendations: Vec<ChartRecommendation>,
}

impl From<ParseOutcome> for UploadResponse {
    fn from(outcome: ParseOutcome) -> Self {
        let schema_issues = validate_schema(&outcome.dataset.schema());
        let recommendations = recommend_charts(&outcome.dataset);
        let clean = outcome.warnings.is_empty()
            && outcome.quality_issues.is_empty()
            && schema_issues.is_empty();

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: if clean { "ready" } else { "warning" }.to_string(),
            dataset: outcome.dataset,
            format: outcome.format,
            warnings: outcome.warnings,
            quality_issues: outcome.quality_issues,
            schema_issues,
            recommendations,
        }
    }
}

/// Body of `POST /api/schema/validate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateSchemaRequest {
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateSchemaResponse {
    pub valid: bool,
    pub issues: Vec<SchemaIssue>,
}

/// Body of `POST /api/chart/series`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartSeriesRequest {
    pub dataset: Dataset,
    pub config: ChartConfig,
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
