//! Loads a result set into the destination worksheet.
//!
//! The sequence is fixed: find or create the sheet, grow its grid if the
//! result does not fit, clear it, write the header at A1, then write all
//! data rows at A2 in one call. There is no rollback; a failure after the
//! clear leaves the sheet empty until the job is rerun.

use crate::error::SyncError;
use crate::models::{GridSize, ResultSet, SheetProperties, TargetSheet};
use crate::services::retry::RetryPolicy;
use crate::services::sheets::SheetsApi;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// The sheet that was written
    pub sheet: SheetProperties,
    /// Whether the sheet had to be created
    pub created: bool,
    /// Number of data rows written (header excluded)
    pub rows_written: usize,
}

/// Writes result sets through a [`SheetsApi`].
pub struct Loader<A> {
    api: A,
    retry: RetryPolicy,
}

impl<A: SheetsApi> Loader<A> {
    /// Create a loader with the given retry policy.
    pub fn new(api: A, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Get the underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Replace the contents of `target` with the header and rows of `result`.
    pub async fn load(
        &self,
        target: &TargetSheet,
        result: ResultSet,
    ) -> Result<LoadSummary, SyncError> {
        let start = Instant::now();
        let (row_count, column_count) = (result.row_count(), result.columns().len());
        let size = GridSize::for_result(row_count, column_count);
        let (header, rows) = result.into_header_and_rows();

        let (mut sheet, created) = self.ensure_sheet(target, size).await?;

        if let Some(current) = sheet.grid_properties.filter(|g| !g.fits(row_count, column_count)) {
            let grown = current.max(size);
            let sheet_id = sheet.sheet_id;
            tracing::info!(
                title = %target.title,
                rows = grown.row_count,
                columns = grown.column_count,
                "Sheet too small for result, resizing"
            );
            self.retry.run("resize sheet", || self.api.resize_sheet(sheet_id, grown)).await?;
            sheet.grid_properties = Some(grown);
        }

        let whole = target.whole_range();
        self.retry.run("clear sheet", || self.api.clear_range(&whole)).await?;
        tracing::debug!(range = %whole, "Cleared sheet");

        let header_range = target.range_at("A1");
        let header_rows = [header];
        self.retry
            .run("write header", || self.api.write_range(&header_range, &header_rows))
            .await?;

        if rows.is_empty() {
            tracing::debug!(title = %target.title, "No data rows to write");
        } else {
            let rows_range = target.range_at("A2");
            self.retry.run("write rows", || self.api.write_range(&rows_range, &rows)).await?;
        }

        tracing::debug!(
            title = %target.title,
            rows_written = rows.len(),
            created,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sheet loaded"
        );

        Ok(LoadSummary { sheet, created, rows_written: rows.len() })
    }

    /// Find the target sheet, creating it when the lookup misses.
    ///
    /// Each attempt repeats the lookup, so an add whose reply was lost is
    /// found on retry instead of being sent twice.
    async fn ensure_sheet(
        &self,
        target: &TargetSheet,
        size: GridSize,
    ) -> Result<(SheetProperties, bool), SyncError> {
        let title = target.title.as_str();
        let add_sent = &AtomicBool::new(false);

        self.retry
            .run("ensure sheet", || async move {
                if let Some(sheet) = self.api.find_sheet(title).await? {
                    return Ok((sheet, add_sent.load(Ordering::Relaxed)));
                }

                tracing::info!(
                    title,
                    rows = size.row_count,
                    columns = size.column_count,
                    "Sheet not found, creating it"
                );
                add_sent.store(true, Ordering::Relaxed);
                let sheet = self.api.add_sheet(title, size).await?;
                Ok((sheet, true))
            })
            .await
    }
}
