//! Data export: CSV and JSON renderings of a dataset.

use crate::error::{PipelineError, PipelineResult};
use crate::models::Dataset;

/// Render a dataset as comma-delimited text: a header line with the column
/// names, then one line per row. Nulls become empty fields.
pub fn to_csv(dataset: &Dataset) -> PipelineResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let io_err = |e: csv::Error| PipelineError::Io(e.into());

    writer
        .write_record(dataset.columns.iter().map(|c| c.name.as_str()))
        .map_err(io_err)?;

    for i in 0..dataset.row_count() {
        let record: Vec<String> = dataset
            .columns
            .iter()
            .map(|c| c.values.get(i).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(io_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render the row objects as a pretty JSON array.
pub fn to_json(dataset: &Dataset) -> PipelineResult<String> {
    serde_json::to_string_pretty(&dataset.rows)
        .map_err(|e| PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
