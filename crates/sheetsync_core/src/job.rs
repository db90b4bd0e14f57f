//! The extract-then-load run.

use crate::error::SyncError;
use crate::models::{SyncConfig, TargetSheet};
use crate::services::credentials::{ServiceAccountKey, SHEETS_SCOPE};
use crate::services::extractor::{Extract, PostgresExtractor, SourceQuery};
use crate::services::loader::{LoadSummary, Loader};
use crate::services::retry::RetryPolicy;
use crate::services::sheets::{http_client, SheetsApi, SheetsClient};

use std::time::Instant;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Rows read from the source
    pub rows_extracted: usize,
    /// Result of the load stage
    pub load: LoadSummary,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

/// Run the full job against PostgreSQL and Google Sheets.
///
/// The source is read before any spreadsheet call is made.
pub async fn run(config: &SyncConfig) -> Result<JobSummary, SyncError> {
    let start = Instant::now();
    let extractor = PostgresExtractor::new(config.connection.clone());
    let query = SourceQuery::sales();

    tracing::info!(
        source = %config.connection.display_url(),
        query = query.sql(),
        "Fetching rows from source database"
    );
    let result = extractor.extract(&query).await?;
    let rows_extracted = result.row_count();
    tracing::info!(rows = rows_extracted, columns = result.columns().len(), "Retrieved rows");

    let key = ServiceAccountKey::from_file(&config.credentials_path)?;
    let http = http_client()?;
    let token = config
        .retry
        .run("fetch access token", || key.fetch_access_token(&http, SHEETS_SCOPE))
        .await?;

    let api = SheetsClient::new(http, token.access_token, &config.spreadsheet_id)?;
    let loader = Loader::new(api, config.retry);
    let target = config.target();

    tracing::info!(
        spreadsheet_id = %target.spreadsheet_id,
        sheet = %target.title,
        "Writing to Google Sheet"
    );
    let load = loader.load(&target, result).await?;

    let summary = JobSummary { rows_extracted, load, elapsed_ms: start.elapsed().as_millis() as u64 };
    tracing::info!(
        rows_written = summary.load.rows_written,
        created = summary.load.created,
        elapsed_ms = summary.elapsed_ms,
        "Done"
    );
    Ok(summary)
}

/// Run extract then load with injected stages.
pub async fn run_with<E, A>(
    extractor: &E,
    query: &SourceQuery,
    api: A,
    retry: RetryPolicy,
    target: &TargetSheet,
) -> Result<JobSummary, SyncError>
where
    E: Extract + ?Sized,
    A: SheetsApi,
{
    let start = Instant::now();
    tracing::debug!(source = extractor.name(), query = query.sql(), "Extracting");
    let result = extractor.extract(query).await?;
    let rows_extracted = result.row_count();

    let load = Loader::new(api, retry).load(target, result).await?;
    Ok(JobSummary { rows_extracted, load, elapsed_ms: start.elapsed().as_millis() as u64 })
}
