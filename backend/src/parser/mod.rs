//! File decoder: CSV, JSON and spreadsheet bytes into a [`RawTable`].
//!
//! No type inference here beyond per-cell coercion of CSV fields; see
//! [`crate::inference`] for column types.

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use serde::Serialize;
use serde_json::Value;
use std::io::Cursor;

use crate::error::{FormatError, FormatResult, ParseWarning};
use crate::models::{parse_number, CellValue};

/// Supported input formats, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
    /// `.xlsx` or `.xls`
    Excel,
}

impl FileFormat {
    /// Pick the format from a file name (case-insensitive extension).
    pub fn from_file_name(name: &str) -> FormatResult<Self> {
        let extension = format!(
            ".{}",
            name.rsplit('.').next().unwrap_or_default().to_lowercase()
        );

        match extension.as_str() {
            ".csv" => Ok(FileFormat::Csv),
            ".json" => Ok(FileFormat::Json),
            ".xlsx" | ".xls" => Ok(FileFormat::Excel),
            _ => Err(FormatError::UnsupportedExtension(extension)),
        }
    }

    /// Spreadsheets are read as binary, everything else as text.
    pub fn is_binary(&self) -> bool {
        matches!(self, FileFormat::Excel)
    }
}

/// Untyped 2D table: a header candidate plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub header: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Split a list of rows into header (first row) and data rows.
    pub fn from_rows(mut rows: Vec<Vec<CellValue>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }

    /// No header row at all.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }
}

/// Result of decoding with non-fatal diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DecodeOutput {
    pub table: RawTable,
    pub warnings: Vec<ParseWarning>,
}

/// Decode file content according to its format.
pub fn decode(bytes: &[u8], format: FileFormat) -> FormatResult<DecodeOutput> {
    match format {
        FileFormat::Csv => {
            let text = decode_text(bytes)?;
            Ok(decode_csv(&text))
        }
        FileFormat::Json => {
            let text = decode_text(bytes)?;
            Ok(DecodeOutput {
                table: decode_json(&text)?,
                warnings: Vec::new(),
            })
        }
        FileFormat::Excel => Ok(DecodeOutput {
            table: decode_spreadsheet(bytes)?,
            warnings: Vec::new(),
        }),
    }
}

// =============================================================================
// Text decoding
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> FormatResult<String> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).to_string(),
        },
        // WHATWG maps the latin-1 labels onto windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        other => {
            let enc = encoding_rs::Encoding::for_label(other.as_bytes())
                .ok_or_else(|| FormatError::Encoding(format!("unknown encoding '{}'", other)))?;
            enc.decode(bytes).0.to_string()
        }
    };

    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Detect the encoding and decode. Valid UTF-8 is never second-guessed.
pub fn decode_text(bytes: &[u8]) -> FormatResult<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.trim_start_matches('\u{feff}').to_string());
    }
    let encoding = detect_encoding(bytes);
    decode_content(bytes, &encoding)
}

// =============================================================================
// CSV
// =============================================================================

/// Parse comma-delimited text. The first record is the header candidate.
///
/// Blank lines are skipped. Rows whose width differs from the header are
/// kept and reported as warnings; unreadable records are skipped with a
/// warning.
pub fn decode_csv(content: &str) -> DecodeOutput {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let mut warnings = Vec::new();
    let mut expected_width: Option<usize> = None;

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx + 1);
                warnings.push(ParseWarning::new(line, e.to_string()));
                continue;
            }
        };

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);

        match expected_width {
            None => expected_width = Some(record.len()),
            Some(width) if width != record.len() => {
                warnings.push(ParseWarning::ragged(line, width, record.len()));
            }
            Some(_) => {}
        }

        rows.push(record.iter().map(coerce_field).collect());
    }

    DecodeOutput {
        table: RawTable::from_rows(rows),
        warnings,
    }
}

/// Dynamic typing of a CSV field: empty becomes null, full numbers become
/// numbers, `true`/`false` become booleans, anything else stays text.
pub fn coerce_field(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Null;
    }
    if let Some(n) = parse_number(field) {
        return CellValue::Number(n);
    }
    match field {
        "true" | "TRUE" | "True" => CellValue::Boolean(true),
        "false" | "FALSE" | "False" => CellValue::Boolean(false),
        _ => CellValue::Text(field.to_string()),
    }
}

// =============================================================================
// JSON
// =============================================================================

/// Parse a JSON array into a table.
///
/// - array of objects: keys of the first element form the header, every
///   element is projected onto them (missing keys are null)
/// - array of arrays: used as-is, first row is the header
/// - array of primitives: a single `value` column
pub fn decode_json(content: &str) -> FormatResult<RawTable> {
    let data: Value = serde_json::from_str(content)?;

    let items = match data {
        Value::Array(items) => items,
        _ => return Err(FormatError::NotAnArray),
    };

    let Some(first) = items.first() else {
        return Ok(RawTable::default());
    };

    let table = match first {
        Value::Object(first_obj) => {
            let keys: Vec<String> = first_obj.keys().cloned().collect();
            let rows = items
                .iter()
                .map(|item| {
                    keys.iter()
                        .map(|k| item.get(k).map(CellValue::from_json).unwrap_or_default())
                        .collect()
                })
                .collect();

            RawTable {
                header: keys.into_iter().map(CellValue::Text).collect(),
                rows,
            }
        }
        Value::Array(_) => RawTable::from_rows(
            items
                .iter()
                .map(|item| match item {
                    Value::Array(cells) => cells.iter().map(CellValue::from_json).collect(),
                    other => vec![CellValue::from_json(other)],
                })
                .collect(),
        ),
        _ => RawTable {
            header: vec![CellValue::from("value")],
            rows: items.iter().map(|v| vec![CellValue::from_json(v)]).collect(),
        },
    };

    Ok(table)
}

// =============================================================================
// Spreadsheets
// =============================================================================

/// Read the first sheet of an XLSX/XLS workbook. Rows whose cells are all
/// empty are dropped.
pub fn decode_spreadsheet(bytes: &[u8]) -> FormatResult<RawTable> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| FormatError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FormatError::EmptyWorkbook)?
        .map_err(|e| FormatError::Spreadsheet(e.to_string()))?;

    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(sheet_cell).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|cell| !cell.is_missing()))
        .collect();

    Ok(RawTable::from_rows(rows))
}

fn sheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => CellValue::Text(format_datetime(dt)),
            None => CellValue::Text(cell.to_string()),
        },
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        _ => CellValue::Null,
    }
}

fn format_datetime(dt: chrono::NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::from(s)
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_file_name("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_file_name("A.JSON").unwrap(), FileFormat::Json);
        assert_eq!(FileFormat::from_file_name("b.xlsx").unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::from_file_name("b.2024.xls").unwrap(), FileFormat::Excel);
        assert!(FileFormat::Excel.is_binary());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileFormat::from_file_name("notes.txt").unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedExtension(ref e) if e == ".txt"));
    }

    #[test]
    fn test_simple_csv() {
        let out = decode_csv("a,b\n1,x\n2,y\n3,z\n");

        assert_eq!(out.table.header, vec![text("a"), text("b")]);
        assert_eq!(out.table.rows.len(), 3);
        assert_eq!(out.table.rows[0], vec![num(1.0), text("x")]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_dynamic_typing() {
        assert_eq!(coerce_field("3.5"), num(3.5));
        assert_eq!(coerce_field("-2e2"), num(-200.0));
        assert_eq!(coerce_field("TRUE"), CellValue::Boolean(true));
        assert_eq!(coerce_field(""), CellValue::Null);
        assert_eq!(coerce_field("12 apples"), text("12 apples"));
        assert_eq!(coerce_field("Infinity"), text("Infinity"));
    }

    #[test]
    fn test_quoted_values() {
        let out = decode_csv("name,value\n\"Smith, J\",\"Hello World\"\n");
        assert_eq!(out.table.rows[0], vec![text("Smith, J"), text("Hello World")]);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let out = decode_csv("a,b\n1,2\n\n3,4\n\n");
        assert_eq!(out.table.rows.len(), 2);
    }

    #[test]
    fn test_ragged_rows_warn_and_continue() {
        let out = decode_csv("a,b,c\n1,2\n4,5,6,7\n8,9,10\n");

        assert_eq!(out.table.rows.len(), 3);
        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].line, 2);
        assert!(out.warnings[0].message.contains("Expected 3 fields but found 2"));
        assert_eq!(out.warnings[1].line, 3);
    }

    #[test]
    fn test_empty_csv() {
        let out = decode_csv("");
        assert!(out.table.is_empty());
    }

    #[test]
    fn test_json_objects() {
        let table = decode_json(r#"[{"x":1},{"x":2}]"#).unwrap();
        assert_eq!(table.header, vec![text("x")]);
        assert_eq!(table.rows, vec![vec![num(1.0)], vec![num(2.0)]]);
    }

    #[test]
    fn test_json_projects_onto_first_keys() {
        let table = decode_json(r#"[{"b":1,"a":"p"},{"a":"q","c":true}]"#).unwrap();

        // first-seen key order, not alphabetical
        assert_eq!(table.header, vec![text("b"), text("a")]);
        assert_eq!(table.rows[1], vec![CellValue::Null, text("q")]);
    }

    #[test]
    fn test_json_arrays() {
        let table = decode_json(r#"[["a","b"],[1,null],[2,"z"]]"#).unwrap();
        assert_eq!(table.header, vec![text("a"), text("b")]);
        assert_eq!(table.rows[0], vec![num(1.0), CellValue::Null]);
    }

    #[test]
    fn test_json_primitives() {
        let table = decode_json("[3, 4, \"five\"]").unwrap();
        assert_eq!(table.header, vec![text("value")]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2], vec![text("five")]);
    }

    #[test]
    fn test_json_nested_values_become_text() {
        let table = decode_json(r#"[{"tags":["a","b"]}]"#).unwrap();
        assert_eq!(table.rows[0], vec![text(r#"["a","b"]"#)]);
    }

    #[test]
    fn test_json_not_array() {
        let err = decode_json(r#"{"x":1}"#).unwrap_err();
        assert!(matches!(err, FormatError::NotAnArray));
    }

    #[test]
    fn test_json_empty_array() {
        assert!(decode_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(decode_json("[1,"), Err(FormatError::InvalidJson(_))));
    }

    #[test]
    fn test_garbage_spreadsheet() {
        let err = decode_spreadsheet(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, FormatError::Spreadsheet(_)));
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = "\u{feff}a,b\n1,2".as_bytes();
        let out = decode(bytes, FileFormat::Csv).unwrap();
        assert_eq!(out.table.header[0], text("a"));
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_uses_windows_1252_mapping() {
        // 0xA4 is the currency sign in latin-1 (the euro sign in 8859-15)
        assert_eq!(decode_content(&[0xA4], "iso-8859-1").unwrap(), "\u{a4}");
        assert_eq!(decode_content(&[0x80], "latin1").unwrap(), "\u{20ac}");
        assert_eq!(decode_content(&[0xA4], "iso-8859-15").unwrap(), "\u{20ac}");
    }

    // =========================================================================
    // Spreadsheets
    // =========================================================================

    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    fn two_sheet_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let first = workbook.add_worksheet();
        first.set_name("Orders").unwrap();
        first.write_string(0, 0, "when").unwrap();
        first.write_string(0, 1, "n").unwrap();
        first
            .write_datetime_with_format(1, 0, ExcelDateTime::from_ymd(2024, 1, 5).unwrap(), &date_format)
            .unwrap();
        first.write_number(1, 1, 3).unwrap();
        // row 2 left blank
        first.write_string(3, 0, "later").unwrap();
        first.write_number(3, 1, 4.5).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("Ignored").unwrap();
        second.write_string(0, 0, "other").unwrap();
        second.write_number(1, 0, 1).unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_spreadsheet_first_sheet_only() {
        let table = decode_spreadsheet(&two_sheet_workbook()).unwrap();

        assert_eq!(table.header, vec![text("when"), text("n")]);
        assert!(!table.rows.iter().flatten().any(|c| *c == text("other")));
    }

    #[test]
    fn test_spreadsheet_drops_blank_rows() {
        let table = decode_spreadsheet(&two_sheet_workbook()).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec![text("later"), num(4.5)]);
    }

    #[test]
    fn test_spreadsheet_date_cell_as_text() {
        let table = decode_spreadsheet(&two_sheet_workbook()).unwrap();

        assert_eq!(table.rows[0], vec![text("2024-01-05"), num(3.0)]);
    }

    #[test]
    fn test_spreadsheet_through_decode() {
        let out = decode(&two_sheet_workbook(), FileFormat::Excel).unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.table.rows.len(), 2);
    }

    #[test]
    fn test_empty_sheet_has_no_header() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = decode_spreadsheet(&bytes).unwrap();
        assert!(table.is_empty());
    }
}
