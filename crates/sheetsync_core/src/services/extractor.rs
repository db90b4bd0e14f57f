//! Source extraction from PostgreSQL.
//!
//! Opens one encrypted connection per call, reads the full result of the
//! source query into a [`ResultSet`], and closes the connection before
//! returning on both the success and error paths.

use crate::error::SyncError;
use crate::models::{CellValue, Column, ConnectionConfig, ResultSet, SslMode};

use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::{Duration, Instant};
use tokio_postgres::types::Type;
use tokio_postgres::{Client, SimpleQueryMessage};

/// The query read by the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    sql: String,
}

impl SourceQuery {
    /// Create a source query from SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    /// The fixed full-table read of `sales`.
    pub fn sales() -> Self {
        Self::new("SELECT * FROM sales;")
    }

    /// Get the SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Default for SourceQuery {
    fn default() -> Self {
        Self::sales()
    }
}

/// A source that materializes a query result in memory.
#[async_trait]
pub trait Extract: Send + Sync {
    /// Run the query and return every column and row.
    async fn extract(&self, query: &SourceQuery) -> Result<ResultSet, SyncError>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}

/// Extractor backed by a single tokio-postgres connection.
pub struct PostgresExtractor {
    config: ConnectionConfig,
}

impl PostgresExtractor {
    /// Create an extractor for the given connection.
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Build the tokio-postgres config.
    fn pg_config(&self) -> tokio_postgres::Config {
        let config = &self.config;
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.username);
        if let Some(password) = &config.password {
            pg_config.password(password);
        }
        pg_config.application_name(&config.application_name);
        pg_config.connect_timeout(Duration::from_secs(config.connect_timeout_secs as u64));
        pg_config.ssl_mode(match config.ssl_mode {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => {
                tokio_postgres::config::SslMode::Require
            }
        });
        pg_config
    }

    /// Build the TLS connector matching the configured SSL mode.
    fn tls_connector(&self) -> Result<MakeTlsConnector, SyncError> {
        let ssl_mode = self.config.ssl_mode;
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(!ssl_mode.verifies_certificate())
            .danger_accept_invalid_hostnames(!ssl_mode.verifies_hostname())
            .build()
            .map_err(|e| SyncError::connection_with_source("Failed to build TLS connector", e))?;
        Ok(MakeTlsConnector::new(connector))
    }
}

#[async_trait]
impl Extract for PostgresExtractor {
    async fn extract(&self, query: &SourceQuery) -> Result<ResultSet, SyncError> {
        let start = Instant::now();
        let tls = self.tls_connector()?;

        let (client, connection) = self.pg_config().connect(tls).await.map_err(|e| {
            let err = SyncError::from(e);
            tracing::error!(
                url = %self.config.display_url(),
                error = %err,
                "Failed to connect to source database"
            );
            err
        })?;

        tracing::debug!(
            host = %self.config.host,
            database = %self.config.database,
            ssl_mode = self.config.ssl_mode.as_str(),
            "Connected to source database"
        );

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "Database connection closed with error");
            }
        });

        let result = fetch_all(&client, query.sql()).await;

        // Dropping the last client handle terminates the session
        drop(client);
        if let Err(e) = driver.await {
            tracing::warn!(error = %e, "Database connection task failed");
        }

        match &result {
            Ok(rows) => tracing::debug!(
                row_count = rows.row_count(),
                columns = %rows.describe_columns(),
                execution_time_ms = start.elapsed().as_millis() as u64,
                "Source query completed"
            ),
            Err(e) => tracing::error!(error = %e, code = ?e.pg_code(), "Source query failed"),
        }

        result
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Read column metadata and every row of `sql`.
///
/// Column names and types come from the prepared statement so an empty
/// result still reports its columns; values are read in text form and
/// converted by declared type.
async fn fetch_all(client: &Client, sql: &str) -> Result<ResultSet, SyncError> {
    let statement = client.prepare(sql).await?;
    let columns: Vec<Column> = statement
        .columns()
        .iter()
        .map(|col| Column::new(col.name(), col.type_().name()))
        .collect();
    let types: Vec<Type> = statement.columns().iter().map(|col| col.type_().clone()).collect();

    let mut rows = Vec::new();
    for message in client.simple_query(sql).await? {
        if let SimpleQueryMessage::Row(row) = message {
            let values: Vec<CellValue> = (0..row.len())
                .map(|i| match types.get(i) {
                    Some(ty) => convert_value(ty, row.get(i)),
                    None => row.get(i).map_or(CellValue::Null, CellValue::from),
                })
                .collect();
            rows.push(values);
        }
    }

    ResultSet::new(columns, rows)
}

/// Convert a text-protocol value to a cell by its declared column type.
///
/// `numeric` values become numbers only when an `f64` holds them exactly;
/// anything wider keeps its digits as text.
pub fn convert_value(ty: &Type, raw: Option<&str>) -> CellValue {
    let Some(text) = raw else {
        return CellValue::Null;
    };

    if *ty == Type::BOOL {
        return match text {
            "t" => CellValue::Bool(true),
            "f" => CellValue::Bool(false),
            other => CellValue::from(other),
        };
    }

    if [Type::INT2, Type::INT4, Type::INT8, Type::OID].contains(ty) {
        return text.parse::<i64>().map_or_else(|_| CellValue::from(text), CellValue::Integer);
    }

    if [Type::FLOAT4, Type::FLOAT8].contains(ty) {
        return match text.parse::<f64>() {
            Ok(value) if value.is_finite() => CellValue::Float(value),
            _ => CellValue::from(text),
        };
    }

    if *ty == Type::NUMERIC {
        return match text.parse::<f64>() {
            Ok(value) if value.is_finite() && same_digits(text, &value.to_string()) => {
                CellValue::Float(value)
            }
            _ => CellValue::from(text),
        };
    }

    CellValue::from(text)
}

/// Compare decimal strings, ignoring trailing fractional zeros.
fn same_digits(a: &str, b: &str) -> bool {
    fn trim(s: &str) -> &str {
        let s = s.strip_prefix('+').unwrap_or(s);
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.')
        } else {
            s
        }
    }
    trim(a) == trim(b)
}
