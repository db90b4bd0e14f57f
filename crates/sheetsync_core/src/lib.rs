//! Core types and services for SheetSync.
//!
//! This crate copies the result of a PostgreSQL query into a Google Sheets worksheet:
//!
//! - **error**: Error categories for configuration, database and Sheets failures
//! - **models**: Configuration, result sets and sheet descriptors
//! - **services**: Extraction, authentication, the Sheets client and the loader
//! - **job**: The extract-then-load run
//! - **logging**: Structured logging setup

pub mod error;
pub mod job;
pub mod logging;
pub mod models;
pub mod services;

pub use error::SyncError;
pub use job::JobSummary;
pub use models::{
    CellValue, Column, ConnectionConfig, GridSize, ResultSet, SheetProperties, SslMode,
    SyncConfig, TargetSheet,
};
pub use services::{
    Extract, LoadSummary, Loader, PostgresExtractor, RetryPolicy, SheetsApi, SheetsClient,
    SourceQuery,
};
