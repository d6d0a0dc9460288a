//! High-level pipeline API: file bytes to a typed [`Dataset`].
//!
//! Combines the stages (extension and size checks, decoding, type
//! inference, assembly) and the checks that gate charting.
//!
//! # Example
//!
//! ```rust,ignore
//! use datavision::pipeline::{parse_file, ParseOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let outcome = parse_file(Path::new("sales.csv"), &ParseOptions::default()).await?;
//!     println!("{} rows, {} columns", outcome.dataset.row_count(), outcome.dataset.columns.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::chart::{build_series, ChartConfig, ChartSeries};
use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::dataset::assemble;
use crate::error::{FormatError, ParseWarning, PipelineError, PipelineResult};
use crate::inference::InferenceThresholds;
use crate::models::{ColumnSchema, Dataset};
use crate::parser::{decode, FileFormat};
use crate::validation::{data_quality_issues, validate_schema, QualityIssue};

/// Progress checkpoints, in percent.
pub const PROGRESS_READ: u8 = 50;
pub const PROGRESS_DECODED: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

/// Options for parsing a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    pub thresholds: InferenceThresholds,
    /// Files larger than this are rejected before decoding.
    pub max_bytes: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            thresholds: InferenceThresholds::default(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl From<&Config> for ParseOptions {
    fn from(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds,
            max_bytes: config.max_upload_bytes,
        }
    }
}

/// A parsed file with its diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    pub dataset: Dataset,
    pub format: FileFormat,
    pub warnings: Vec<ParseWarning>,
    pub quality_issues: Vec<QualityIssue>,
}

/// Parse in-memory file content. See [`parse_bytes_with_progress`].
pub fn parse_bytes(bytes: &[u8], file_name: &str, options: &ParseOptions) -> PipelineResult<ParseOutcome> {
    parse_bytes_with_progress(bytes, file_name, options, |_| {})
}

/// Parse in-memory file content, reporting progress (50, 80, 100).
///
/// The extension and the size are checked before anything is decoded.
/// Decoder warnings are logged and returned; they never abort parsing.
pub fn parse_bytes_with_progress<P: FnMut(u8)>(
    bytes: &[u8],
    file_name: &str,
    options: &ParseOptions,
    mut progress: P,
) -> PipelineResult<ParseOutcome> {
    let format = FileFormat::from_file_name(file_name)?;
    check_size(bytes.len() as u64, options.max_bytes)?;

    log_info(format!("Reading {} ({} bytes)", file_name, bytes.len()));
    progress(PROGRESS_READ);

    let decoded = decode(bytes, format)?;
    for warning in &decoded.warnings {
        log_warning(warning.to_string());
    }
    progress(PROGRESS_DECODED);

    let dataset = assemble(decoded.table, file_name, &options.thresholds)?;
    log_success(format!(
        "Parsed {} rows, {} columns",
        dataset.row_count(),
        dataset.columns.len()
    ));
    for column in &dataset.columns {
        log_info(format!("{} -> {}", column.name, column.column_type));
    }

    let quality_issues = data_quality_issues(&dataset);
    for issue in &quality_issues {
        log_warning(issue.to_string());
    }
    progress(PROGRESS_DONE);

    Ok(ParseOutcome {
        dataset,
        format,
        warnings: decoded.warnings,
        quality_issues,
    })
}

/// Read and parse a file from disk.
pub async fn parse_file(path: &Path, options: &ParseOptions) -> PipelineResult<ParseOutcome> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    FileFormat::from_file_name(&file_name)?;
    let metadata = tokio::fs::metadata(path).await?;
    check_size(metadata.len(), options.max_bytes)?;

    let bytes = tokio::fs::read(path).await?;
    parse_bytes(&bytes, &file_name, options)
}

fn check_size(size: u64, limit: u64) -> PipelineResult<()> {
    if size > limit {
        return Err(FormatError::TooLarge { size, limit }.into());
    }
    Ok(())
}

/// Fail with every schema issue when the schema is not valid.
pub fn ensure_valid_schema(columns: &[ColumnSchema]) -> PipelineResult<()> {
    let issues = validate_schema(columns);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::InvalidSchema(issues))
    }
}

/// Chart stage entry: requires a valid schema and known axis columns, then
/// builds the series.
pub fn prepare_chart(dataset: &Dataset, config: &ChartConfig) -> PipelineResult<Vec<ChartSeries>> {
    ensure_valid_schema(&dataset.schema())?;

    let unknown = config.unknown_columns(dataset);
    if !unknown.is_empty() {
        return Err(PipelineError::InvalidChart(format!(
            "unknown columns: {}",
            unknown.join(", ")
        )));
    }

    build_series(dataset, config).ok_or_else(|| {
        PipelineError::InvalidChart(format!("{} chart is missing a required axis", config.chart_type))
    })
}
