//! In-memory query results handed from the extractor to the loader.

use crate::error::SyncError;

use serde::Serialize;

/// Column metadata from the source query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// PostgreSQL type name
    pub type_name: String,
}

impl Column {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into() }
    }
}

/// A single scalar cell value.
///
/// Serializes to the JSON shape the Sheets values API accepts for RAW
/// input: `null`, a boolean, a number, or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL NULL, written as an empty cell
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point or numeric value
    Float(f64),
    /// Any other value in its text form
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Full result of the source query: column list plus every row.
///
/// Every row holds exactly one value per column, in projection order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    /// Create a result set, rejecting an empty column list or misaligned rows.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Result<Self, SyncError> {
        if columns.is_empty() {
            return Err(SyncError::internal("Query returned no columns"));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len())
        {
            return Err(SyncError::internal(format!(
                "Row {} has {} values but the query returned {} columns",
                index + 1,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Get column metadata.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get column names in projection order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the data rows.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Get the number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names with their types, e.g. `id:int4, amount:numeric`.
    pub fn describe_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.type_name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Header row, one text cell per column name.
    pub fn header_row(&self) -> Vec<CellValue> {
        self.columns.iter().map(|c| CellValue::Text(c.name.clone())).collect()
    }

    /// Split into the header row and the data rows.
    pub fn into_header_and_rows(self) -> (Vec<CellValue>, Vec<Vec<CellValue>>) {
        let header = self.header_row();
        (header, self.rows)
    }
}
