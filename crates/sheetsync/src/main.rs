//! SheetSync - copy the `sales` table from PostgreSQL into a Google Sheets worksheet.

use std::process::ExitCode;

use sheetsync_core::job;
use sheetsync_core::logging::{init_logging, LogConfig};
use sheetsync_core::{SyncConfig, SyncError};

fn main() -> ExitCode {
    let _logging_guard = init_logging(LogConfig::from_env());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting SheetSync");

    // Configuration errors are reported before any network activity
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => return report(&e),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => return report(&SyncError::from(e)),
    };

    match runtime.block_on(job::run(&config)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(error: &SyncError) -> ExitCode {
    match error.hint() {
        Some(hint) => tracing::error!(category = error.category(), hint, "{}", error),
        None => tracing::error!(category = error.category(), "{}", error),
    }
    ExitCode::FAILURE
}
