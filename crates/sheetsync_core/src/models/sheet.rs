//! Destination worksheet models.

use serde::{Deserialize, Serialize};

/// The destination worksheet: a named tab in a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSheet {
    /// Opaque spreadsheet identifier
    pub spreadsheet_id: String,
    /// Tab title
    pub title: String,
}

impl TargetSheet {
    /// Create a new target sheet reference.
    pub fn new(spreadsheet_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { spreadsheet_id: spreadsheet_id.into(), title: title.into() }
    }

    /// A1 range covering the whole sheet, e.g. `'SalesData'`.
    pub fn whole_range(&self) -> String {
        quote_title(&self.title)
    }

    /// A1 range anchored at a single cell, e.g. `'SalesData'!A2`.
    pub fn range_at(&self, cell: &str) -> String {
        format!("{}!{}", quote_title(&self.title), cell)
    }
}

/// Quote a sheet title for A1 notation, doubling embedded quotes.
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Grid dimensions requested when creating a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSize {
    /// Number of rows
    pub row_count: u32,
    /// Number of columns
    pub column_count: u32,
}

impl GridSize {
    /// Headroom for a result: data rows plus ten, columns plus one.
    pub fn for_result(rows: usize, columns: usize) -> Self {
        let clamp = |n: usize| u32::try_from(n).unwrap_or(u32::MAX).max(1);
        Self {
            row_count: clamp(rows.saturating_add(10)),
            column_count: clamp(columns.saturating_add(1)),
        }
    }

    /// Whether a header plus `rows` data rows of `columns` cells fit in this grid.
    pub fn fits(&self, rows: usize, columns: usize) -> bool {
        rows.saturating_add(1) <= self.row_count as usize && columns <= self.column_count as usize
    }

    /// The larger of each dimension.
    pub fn max(self, other: GridSize) -> GridSize {
        GridSize {
            row_count: self.row_count.max(other.row_count),
            column_count: self.column_count.max(other.column_count),
        }
    }
}

/// Sheet properties as reported by the Sheets API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    /// Numeric tab id within the spreadsheet
    #[serde(default)]
    pub sheet_id: i64,
    /// Tab title
    pub title: String,
    /// Grid dimensions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_properties: Option<GridSize>,
}

impl SheetProperties {
    /// Row count, if the service reported grid properties.
    pub fn row_count(&self) -> Option<u32> {
        self.grid_properties.map(|g| g.row_count)
    }

    /// Column count, if the service reported grid properties.
    pub fn column_count(&self) -> Option<u32> {
        self.grid_properties.map(|g| g.column_count)
    }
}
