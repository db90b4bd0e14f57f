//! Services that move data from PostgreSQL into Google Sheets.
//!
//! This module contains the service layer:
//! - `extractor` - Reads the source query from PostgreSQL
//! - `credentials` - Service account keys and OAuth token exchange
//! - `sheets` - Google Sheets API v4 client
//! - `loader` - Replaces the target worksheet contents
//! - `retry` - Bounded retry with exponential backoff

pub mod credentials;
pub mod extractor;
pub mod loader;
pub mod retry;
pub mod sheets;

#[cfg(test)]
pub(crate) mod test_server;

pub use credentials::{AccessToken, ServiceAccountKey};
pub use extractor::{Extract, PostgresExtractor, SourceQuery};
pub use loader::{LoadSummary, Loader};
pub use retry::RetryPolicy;
pub use sheets::{SheetsApi, SheetsClient};
