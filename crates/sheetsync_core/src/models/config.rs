//! Run configuration built once at process start.

use crate::error::SyncError;
use crate::models::{ConnectionConfig, TargetSheet};
use crate::services::retry::RetryPolicy;

use std::path::PathBuf;

/// Source connection URL (required).
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Path to the service-account key file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_CREDS_JSON";
/// Destination spreadsheet identifier (required).
pub const SPREADSHEET_ID_ENV: &str = "SPREADSHEET_ID";
/// Destination worksheet title.
pub const TARGET_SHEET_ENV: &str = "TARGET_SHEET";
/// Attempts per remote call on transient failure.
pub const MAX_ATTEMPTS_ENV: &str = "SHEETSYNC_MAX_ATTEMPTS";

/// Default service-account key path.
pub const DEFAULT_CREDENTIALS_PATH: &str = "service-account.json";
/// Default destination worksheet title.
pub const DEFAULT_TARGET_SHEET: &str = "SalesData";

/// Everything one run needs, passed explicitly to both stages.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Source database connection
    pub connection: ConnectionConfig,
    /// Service-account key file
    pub credentials_path: PathBuf,
    /// Destination spreadsheet identifier
    pub spreadsheet_id: String,
    /// Destination worksheet title
    pub target_sheet: String,
    /// Retry policy for remote calls
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, SyncError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get(DATABASE_URL_ENV)
            .ok_or_else(|| SyncError::config(format!("{DATABASE_URL_ENV} is not set")))?;
        let connection = ConnectionConfig::parse(&database_url)?;

        let spreadsheet_id = get(SPREADSHEET_ID_ENV)
            .ok_or_else(|| SyncError::config(format!("{SPREADSHEET_ID_ENV} is not set")))?;

        let credentials_path =
            PathBuf::from(get(CREDENTIALS_ENV).unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.into()));
        let target_sheet = get(TARGET_SHEET_ENV).unwrap_or_else(|| DEFAULT_TARGET_SHEET.into());

        let retry = match get(MAX_ATTEMPTS_ENV) {
            Some(raw) => {
                let attempts: u32 = raw.trim().parse().map_err(|_| {
                    SyncError::config(format!("{MAX_ATTEMPTS_ENV} must be a positive integer"))
                })?;
                if attempts == 0 {
                    return Err(SyncError::config(format!("{MAX_ATTEMPTS_ENV} must be at least 1")));
                }
                RetryPolicy::default().with_max_attempts(attempts)
            }
            None => RetryPolicy::default(),
        };

        Ok(Self { connection, credentials_path, spreadsheet_id, target_sheet, retry })
    }

    /// The destination worksheet.
    pub fn target(&self) -> TargetSheet {
        TargetSheet::new(&self.spreadsheet_id, &self.target_sheet)
    }
}
