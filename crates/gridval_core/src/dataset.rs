//! Dataset representation for validation.
//!
//! This module provides the types the engine validates: cell values, rows
//! addressed by column name, and ordered datasets of rows.

use std::collections::HashMap;

/// A single cell value in a grid.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Null/missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp value (ISO 8601 string)
    Timestamp(String),
}

impl CellValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::String(_) => "string",
            CellValue::Int(_) => "int64",
            CellValue::Float(_) => "float64",
            CellValue::Bool(_) => "boolean",
            CellValue::Timestamp(_) => "timestamp",
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get this value as a timestamp string.
    pub fn as_timestamp(&self) -> Option<&str> {
        match self {
            CellValue::Timestamp(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value for messages and composite comparison keys.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Timestamp(ts) => ts.clone(),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else {
                    CellValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => CellValue::String(s),
            // Nested values are not addressable as grid cells; keep their
            // JSON rendering so nothing is silently dropped.
            other => CellValue::String(other.to_string()),
        }
    }
}

impl serde::Serialize for CellValue {
    /// Serializes to the value's JSON-natural form rather than a tagged
    /// enum, so reports stay readable.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::String(s) | CellValue::Timestamp(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(f) => serializer.serialize_f64(*f),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

impl From<&CellValue> for serde_json::Value {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Null => serde_json::Value::Null,
            CellValue::String(s) => serde_json::Value::String(s.clone()),
            CellValue::Int(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Value::from(*f),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Timestamp(ts) => serde_json::Value::String(ts.clone()),
        }
    }
}

/// A single row of grid data.
///
/// Carries a column-name to value map plus an optional stable key. The key
/// survives sorting and filtering in the hosting grid, so row-addressed
/// validation results can be re-joined to their rows after reordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridRow {
    key: Option<u64>,
    values: HashMap<String, CellValue>,
}

impl GridRow {
    /// Creates an empty row with no stable key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty row with a stable identity key.
    pub fn with_key(key: u64) -> Self {
        Self {
            key: Some(key),
            values: HashMap::new(),
        }
    }

    /// The stable identity key, if the hosting grid assigned one.
    pub fn key(&self) -> Option<u64> {
        self.key
    }

    /// Sets a cell value, returning the row for chaining.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Inserts a cell value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Gets a cell value by column name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Returns true if the row has a value (possibly null) for the column.
    pub fn contains_column(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Iterates over the column names present in this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of columns present in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<HashMap<String, CellValue>> for GridRow {
    fn from(values: HashMap<String, CellValue>) -> Self {
        Self { key: None, values }
    }
}

impl FromIterator<(String, CellValue)> for GridRow {
    fn from_iter<T: IntoIterator<Item = (String, CellValue)>>(iter: T) -> Self {
        Self {
            key: None,
            values: iter.into_iter().collect(),
        }
    }
}

/// An ordered, index-addressable collection of rows.
#[derive(Debug, Clone, Default)]
pub struct GridDataset {
    rows: Vec<GridRow>,
}

impl GridDataset {
    /// Creates a new empty dataset.
    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Creates a new dataset from rows.
    pub fn from_rows(rows: Vec<GridRow>) -> Self {
        Self { rows }
    }

    /// Returns the number of rows in the dataset.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over the rows.
    pub fn rows(&self) -> impl Iterator<Item = &GridRow> {
        self.rows.iter()
    }

    /// Returns the rows as a slice, in input order.
    pub fn as_slice(&self) -> &[GridRow] {
        &self.rows
    }

    /// Gets a specific row by index.
    pub fn get_row(&self, index: usize) -> Option<&GridRow> {
        self.rows.get(index)
    }

    /// The stable identity key of the row at `index`, if any.
    pub fn row_key(&self, index: usize) -> Option<u64> {
        self.rows.get(index).and_then(GridRow::key)
    }

    /// Adds a row to the dataset.
    pub fn add_row(&mut self, row: GridRow) {
        self.rows.push(row);
    }
}

impl FromIterator<GridRow> for GridDataset {
    fn from_iter<T: IntoIterator<Item = GridRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
