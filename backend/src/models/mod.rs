//! Domain models for the DataVision pipeline.
//!
//! - [`CellValue`] - a single untyped cell (number, text, boolean or null)
//! - [`ColumnType`] - inferred semantic type of a column
//! - [`Column`] - named, typed sequence of cell values
//! - [`Dataset`] - normalized table (columns + row objects)
//! - [`ColumnSchema`] - name and type of a column, as edited by users

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};

// =============================================================================
// Cell Values
// =============================================================================

/// A raw cell value.
///
/// Serialized untagged, so it reads and writes as a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Null or empty text.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric value of the cell, if it is a number or text that converts
    /// fully to a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Key identifying the value for distinct counting. `1` and `"1"` differ.
    pub fn identity_key(&self) -> String {
        match self {
            CellValue::Null => "z:".to_string(),
            CellValue::Boolean(b) => format!("b:{}", b),
            CellValue::Number(n) => format!("n:{}", n.to_bits()),
            CellValue::Text(s) => format!("t:{}", s),
        }
    }

    /// Convert a JSON value. Nested arrays and objects become their compact
    /// JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Boolean(*b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Parse text that converts fully to a finite number (surrounding
/// whitespace allowed). Empty text is not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// =============================================================================
// Column Types
// =============================================================================

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Category,
    String,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Category => "category",
            ColumnType::String => "string",
        }
    }

    /// Category and free text both count as categorical for charting.
    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnType::Category | ColumnType::String)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Columns and Datasets
// =============================================================================

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Type inferred at creation, kept when `column_type` is edited.
    pub original_type: ColumnType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            column_type,
            original_type: column_type,
            values,
        }
    }

    /// Number of null or empty values.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// Name and type of a column, without values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// A row object: column name to cell value, keys in column order.
pub type Row = IndexMap<String, CellValue>;

/// A normalized in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset, deriving rows by transposing the column values.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let rows = rows_from_columns(&columns);
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns_of_type(&self, column_type: ColumnType) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.column_type == column_type)
    }

    /// Current schema (names and types).
    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.columns
            .iter()
            .map(|c| ColumnSchema {
                name: c.name.clone(),
                column_type: c.column_type,
            })
            .collect()
    }

    /// Every column must hold one value per row. Datasets built by the
    /// assembler always do; client-supplied ones are checked before use.
    pub fn check_shape(&self) -> PipelineResult<()> {
        let expected = self.columns.first().map(|c| c.values.len()).unwrap_or(0);

        match self.columns.iter().find(|c| c.values.len() != expected) {
            Some(column) => Err(PipelineError::RaggedColumns {
                column: column.name.clone(),
                expected,
                found: column.values.len(),
            }),
            None => Ok(()),
        }
    }

    /// Apply a schema edit positionally: rename and retype columns, keep
    /// `original_type`, and rebuild the row objects.
    ///
    /// No validation happens here; see [`crate::validation::validate_schema`].
    pub fn apply_schema(&mut self, schema: &[ColumnSchema]) -> PipelineResult<()> {
        if schema.len() != self.columns.len() {
            return Err(PipelineError::SchemaMismatch {
                expected: self.columns.len(),
                found: schema.len(),
            });
        }

        for (column, edit) in self.columns.iter_mut().zip(schema) {
            column.name = edit.name.clone();
            column.column_type = edit.column_type;
        }
        self.rows = rows_from_columns(&self.columns);
        Ok(())
    }
}

/// Transpose column values into row objects. With repeated names the last
/// column wins.
fn rows_from_columns(columns: &[Column]) -> Vec<Row> {
    let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);

    (0..row_count)
        .map(|i| {
            columns
                .iter()
                .map(|c| (c.name.clone(), c.values.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_serializes_as_scalar() {
        let cells = vec![
            CellValue::Null,
            CellValue::Boolean(true),
            CellValue::Number(1.5),
            CellValue::Text("x".into()),
        ];
        let json = serde_json::to_value(&cells).unwrap();
        assert_eq!(json, json!([null, true, 1.5, "x"]));

        let back: Vec<CellValue> = serde_json::from_value(json).unwrap();
        assert_eq!(back, cells);
    }

    #[test]
    fn test_as_number() {
        assert_eq!(CellValue::from("  42 ").as_number(), Some(42.0));
        assert_eq!(CellValue::from("1e3").as_number(), Some(1000.0));
        assert_eq!(CellValue::from("inf").as_number(), None);
        assert_eq!(CellValue::from("NaN").as_number(), None);
        assert_eq!(CellValue::from("12abc").as_number(), None);
        assert_eq!(CellValue::from("").as_number(), None);
        assert_eq!(CellValue::Boolean(true).as_number(), None);
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(0.35).to_string(), "0.35");
        assert_eq!(CellValue::Null.to_string(), "");
    }

    #[test]
    fn test_identity_key_distinguishes_types() {
        assert_ne!(
            CellValue::Number(1.0).identity_key(),
            CellValue::from("1").identity_key()
        );
    }

    #[test]
    fn test_column_type_wire_format() {
        let schema = ColumnSchema { name: "a".into(), column_type: ColumnType::Category };
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, json!({ "name": "a", "type": "category" }));
    }

    #[test]
    fn test_rows_match_columns() {
        let ds = Dataset::new(
            "t",
            vec![
                Column::new("a", ColumnType::Number, vec![1.0.into(), 2.0.into()]),
                Column::new("b", ColumnType::String, vec!["x".into(), "y".into()]),
            ],
        );
        assert_eq!(ds.row_count(), 2);
        for row in &ds.rows {
            let keys: Vec<&String> = row.keys().collect();
            assert_eq!(keys, vec!["a", "b"]);
        }
        assert_eq!(ds.rows[1]["b"], CellValue::from("y"));
    }

    #[test]
    fn test_row_keys_follow_column_order() {
        let ds = Dataset::new(
            "t",
            vec![
                Column::new("zeta", ColumnType::Number, vec![1.0.into()]),
                Column::new("alpha", ColumnType::String, vec!["x".into()]),
            ],
        );
        let keys: Vec<&String> = ds.rows[0].keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let json = serde_json::to_string(&ds.rows[0]).unwrap();
        assert_eq!(json, r#"{"zeta":1.0,"alpha":"x"}"#);
    }

    #[test]
    fn test_check_shape() {
        let ds = Dataset::new(
            "t",
            vec![
                Column::new("a", ColumnType::Number, vec![1.0.into()]),
                Column::new("b", ColumnType::Number, vec![1.0.into(), 2.0.into(), 3.0.into()]),
            ],
        );
        let err = ds.check_shape().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RaggedColumns { ref column, expected: 1, found: 3 } if column == "b"
        ));

        let ok = Dataset::new("t", vec![Column::new("a", ColumnType::Number, vec![1.0.into()])]);
        assert!(ok.check_shape().is_ok());
        assert!(Dataset::new("empty", vec![]).check_shape().is_ok());
    }

    #[test]
    fn test_apply_schema_keeps_original_type() {
        let mut ds = Dataset::new(
            "t",
            vec![Column::new("code", ColumnType::Number, vec![1.0.into()])],
        );
        ds.apply_schema(&[ColumnSchema { name: "Code".into(), column_type: ColumnType::Category }])
            .unwrap();

        assert_eq!(ds.columns[0].column_type, ColumnType::Category);
        assert_eq!(ds.columns[0].original_type, ColumnType::Number);
        assert!(ds.rows[0].contains_key("Code"));
        assert!(!ds.rows[0].contains_key("code"));
    }

    #[test]
    fn test_apply_schema_length_mismatch() {
        let mut ds = Dataset::new("t", vec![Column::new("a", ColumnType::String, vec![])]);
        let err = ds.apply_schema(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { expected: 1, found: 0 }));
    }
}
