//! Error types for SheetSync.
//!
//! Every failure is fatal to the run. The variants follow the stage that
//! produced them so the binary can report a category and an actionable
//! hint before exiting.

use thiserror::Error;

/// Main error type for a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or malformed configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// Database unreachable, TLS failure, or login rejected.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// SQL execution error with PostgreSQL-specific details.
    #[error("Query error: {message}")]
    Query {
        /// PostgreSQL error message.
        message: String,
        /// Additional detail from PostgreSQL.
        detail: Option<String>,
        /// PostgreSQL hint.
        hint: Option<String>,
        /// Position in query (1-indexed).
        position: Option<usize>,
        /// PostgreSQL error code (e.g., "42P01").
        code: Option<String>,
    },

    /// Spreadsheet credentials invalid, unreadable, or rejected.
    #[error("Authentication error: {message}")]
    Auth {
        /// Human-readable error message.
        message: String,
        /// Actionable hint for the user.
        hint: Option<String>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Spreadsheet or sheet not found, not shared, or request refused.
    #[error("Access error: {message}")]
    Access {
        /// Human-readable error message.
        message: String,
        /// HTTP status returned by the service.
        status: Option<u16>,
    },

    /// Network or quota failure that may succeed if repeated.
    #[error("Transient service error: {message}")]
    Transient {
        /// Human-readable error message.
        message: String,
        /// HTTP status returned by the service, if any.
        status: Option<u16>,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SyncError {
    // ========== Constructors ==========

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), hint: None, source: None }
    }

    /// Create a new connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), hint: None, source: Some(Box::new(source)) }
    }

    /// Create a new query error with full PostgreSQL details.
    pub fn query(
        message: impl Into<String>,
        detail: Option<String>,
        hint: Option<String>,
        position: Option<usize>,
        code: Option<String>,
    ) -> Self {
        Self::Query { message: message.into(), detail, hint, position, code }
    }

    /// Create a new authentication error.
    pub fn auth(message: impl Into<String>, hint: Option<&str>) -> Self {
        Self::Auth { message: message.into(), hint: hint.map(String::from), source: None }
    }

    /// Create a new authentication error with source.
    pub fn auth_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Auth { message: message.into(), hint: None, source: Some(Box::new(source)) }
    }

    /// Create a new access error.
    pub fn access(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Access { message: message.into(), status }
    }

    /// Create a new transient error.
    pub fn transient(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transient { message: message.into(), status, source: None }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Classify a non-success HTTP status from the spreadsheet service.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Auth {
                message,
                hint: Some("The access token was rejected; check the service account key".into()),
                source: None,
            },
            408 | 429 => Self::transient(message, Some(status)),
            500..=599 => Self::transient(message, Some(status)),
            _ => Self::access(message, Some(status)),
        }
    }

    // ========== Methods ==========

    /// Whether repeating the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Configuration",
            Self::Connection { .. } => "Connection",
            Self::Query { .. } => "Query",
            Self::Auth { .. } => "Authentication",
            Self::Access { .. } => "Access",
            Self::Transient { .. } => "Transient",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Config { .. } => {
                Some("Set DATABASE_URL and SPREADSHEET_ID in the environment")
            }
            Self::Connection { hint, .. } => {
                hint.as_deref().or(Some("Check that the database server is reachable"))
            }
            Self::Query { hint, .. } => hint.as_deref(),
            Self::Auth { hint, .. } => {
                hint.as_deref().or(Some("Check the service account key file"))
            }
            Self::Access { status: Some(404), .. } => {
                Some("Check SPREADSHEET_ID and that the sheet is shared with the service account")
            }
            Self::Access { .. } => Some("Share the spreadsheet with the service account email"),
            Self::Transient { .. } => Some("The service may be overloaded; rerun the job later"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Get PostgreSQL error code (if applicable).
    pub fn pg_code(&self) -> Option<&str> {
        match self {
            Self::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Get HTTP status (if applicable).
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Access { status, .. } | Self::Transient { status, .. } => *status,
            _ => None,
        }
    }
}

// ========== Error Conversions ==========

/// Convert from tokio_postgres::Error to SyncError.
impl From<tokio_postgres::Error> for SyncError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let message = db_err.message().to_string();
            let code_str = db_err.code().code();

            // Invalid authorization (28xxx) and connection exceptions (08xxx)
            if code_str.starts_with("28") {
                return SyncError::Connection {
                    message,
                    hint: Some("Check the user name and password in DATABASE_URL".to_string()),
                    source: Some(Box::new(err)),
                };
            }
            if code_str.starts_with("08") {
                return SyncError::Connection { message, hint: None, source: Some(Box::new(err)) };
            }
            // 3D000: database in the URL does not exist
            if code_str == "3D000" {
                return SyncError::Connection {
                    message,
                    hint: Some("Check the database name in DATABASE_URL".to_string()),
                    source: Some(Box::new(err)),
                };
            }

            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos as usize),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });
            return SyncError::Query {
                message,
                detail: db_err.detail().map(String::from),
                hint: db_err.hint().map(String::from),
                position,
                code: Some(code_str.to_string()),
            };
        }

        if err.is_closed() {
            return SyncError::Connection {
                message: "Connection closed".to_string(),
                hint: None,
                source: Some(Box::new(err)),
            };
        }

        SyncError::Connection { message: err.to_string(), hint: None, source: Some(Box::new(err)) }
    }
}

/// Convert from reqwest::Error to SyncError.
impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let mut mapped = SyncError::from_status(status.as_u16(), err.to_string());
            if let SyncError::Transient { source, .. } = &mut mapped {
                *source = Some(Box::new(err));
            }
            return mapped;
        }

        if err.is_decode() || err.is_builder() {
            return SyncError::Internal {
                message: format!("Unexpected HTTP exchange: {err}"),
                source: Some(Box::new(err)),
            };
        }

        // Connect failures, timeouts, and dropped bodies
        SyncError::Transient {
            message: format!("Request failed: {err}"),
            status: None,
            source: Some(Box::new(err)),
        }
    }
}

/// Convert from std::io::Error to SyncError.
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Internal { message: format!("I/O error: {err}"), source: Some(Box::new(err)) }
    }
}

/// Convert from serde_json::Error to SyncError.
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Internal { message: format!("JSON error: {err}"), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(SyncError::from_status(401, "x"), SyncError::Auth { .. }));
        assert!(matches!(SyncError::from_status(403, "x"), SyncError::Access { .. }));
        assert!(matches!(SyncError::from_status(404, "x"), SyncError::Access { .. }));
        assert!(matches!(SyncError::from_status(400, "x"), SyncError::Access { .. }));
        assert!(SyncError::from_status(429, "x").is_transient());
        assert!(SyncError::from_status(408, "x").is_transient());
        assert!(SyncError::from_status(500, "x").is_transient());
        assert!(SyncError::from_status(503, "x").is_transient());
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(!SyncError::config("missing").is_transient());
        assert!(!SyncError::connection("refused").is_transient());
        assert!(!SyncError::auth("bad key", None).is_transient());
        assert!(!SyncError::access("denied", Some(403)).is_transient());
        assert!(SyncError::transient("quota", Some(429)).is_transient());
    }

    #[test]
    fn test_category_and_hint() {
        let err = SyncError::access("Requested entity was not found.", Some(404));
        assert_eq!(err.category(), "Access");
        assert!(err.hint().unwrap().contains("SPREADSHEET_ID"));
        assert_eq!(err.http_status(), Some(404));

        let err = SyncError::query(
            "relation \"sales\" does not exist",
            None,
            None,
            Some(15),
            Some("42P01".to_string()),
        );
        assert_eq!(err.category(), "Query");
        assert_eq!(err.pg_code(), Some("42P01"));
        assert_eq!(err.to_string(), "Query error: relation \"sales\" does not exist");
    }

    #[test]
    fn test_io_error_is_internal() {
        let err = SyncError::from(std::io::Error::other("runtime unavailable"));
        assert_eq!(err.category(), "Internal");
        assert!(err.to_string().contains("runtime unavailable"));
    }

    #[test]
    fn test_custom_hint_wins() {
        let err = SyncError::Connection {
            message: "password authentication failed".into(),
            hint: Some("Check the user name and password in DATABASE_URL".into()),
            source: None,
        };
        assert_eq!(err.hint(), Some("Check the user name and password in DATABASE_URL"));
        assert_eq!(
            SyncError::connection("refused").hint(),
            Some("Check that the database server is reachable")
        );
    }
}
