//! Dataset assembly: headers, inferred types and raw rows into a [`Dataset`].

use crate::error::{PipelineError, PipelineResult};
use crate::inference::{infer_column_type, InferenceThresholds};
use crate::models::{CellValue, Column, Dataset};
use crate::parser::RawTable;

/// Normalize header cells: trimmed text, or `Column N` (1-indexed) when
/// blank. Duplicates are left as they are.
pub fn normalize_headers(header: &[CellValue]) -> Vec<String> {
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.to_string();
            let name = name.trim();
            if name.is_empty() {
                format!("Column {}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect()
}

/// Strip the final extension from a file name.
pub fn dataset_name(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[..idx].to_string(),
        _ => file_name.to_string(),
    }
}

/// Build a dataset from a decoded table.
///
/// Each column takes the cell at its header index from every data row;
/// short rows are padded with null and cells past the header are dropped.
pub fn assemble(
    table: RawTable,
    file_name: &str,
    thresholds: &InferenceThresholds,
) -> PipelineResult<Dataset> {
    if table.is_empty() {
        return Err(PipelineError::NoData);
    }

    let headers = normalize_headers(&table.header);

    let columns: Vec<Column> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<CellValue> = table
                .rows
                .iter()
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect();
            let column_type = infer_column_type(&values, thresholds);
            Column::new(name, column_type, values)
        })
        .collect();

    Ok(Dataset::new(dataset_name(file_name), columns))
}
