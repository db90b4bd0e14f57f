//! Google Sheets API v4 client.
//!
//! [`SheetsApi`] is the seam the loader writes through; [`SheetsClient`]
//! implements it over HTTPS with a bearer token.

use crate::error::SyncError;
use crate::models::{CellValue, GridSize, SheetProperties};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Production API root.
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the loader needs from one spreadsheet.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Look up a sheet by exact title.
    async fn find_sheet(&self, title: &str) -> Result<Option<SheetProperties>, SyncError>;

    /// Add a sheet with the given title and grid size.
    async fn add_sheet(&self, title: &str, size: GridSize) -> Result<SheetProperties, SyncError>;

    /// Set the grid dimensions of an existing sheet.
    async fn resize_sheet(&self, sheet_id: i64, size: GridSize) -> Result<(), SyncError>;

    /// Clear every value in an A1 range.
    async fn clear_range(&self, range: &str) -> Result<(), SyncError>;

    /// Write rows starting at an A1 anchor, values taken as-is.
    async fn write_range(&self, range: &str, rows: &[Vec<CellValue>]) -> Result<(), SyncError>;
}

/// Build a reqwest client with the default request timeout.
pub fn http_client() -> Result<reqwest::Client, SyncError> {
    reqwest::Client::builder()
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .user_agent(concat!("sheetsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::Internal {
            message: format!("Failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

// ========== Wire types ==========

#[derive(Debug, Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    requests: Vec<SheetRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum SheetRequest<'a> {
    AddSheet { properties: NewSheetProperties<'a> },
    UpdateSheetProperties { properties: GridUpdate, fields: &'static str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewSheetProperties<'a> {
    title: &'a str,
    grid_properties: GridSize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GridUpdate {
    sheet_id: i64,
    grid_properties: GridSize,
}

/// Field mask limiting an update to the grid dimensions.
const GRID_SIZE_FIELDS: &str = "gridProperties(rowCount,columnCount)";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    #[serde(default)]
    add_sheet: Option<SheetEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<CellValue>],
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ========== Client ==========

/// HTTPS client bound to one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    spreadsheet_id: String,
    base_url: Url,
}

impl SheetsClient {
    /// Create a client for `spreadsheet_id` against the production API.
    pub fn new(
        http: reqwest::Client,
        access_token: impl Into<String>,
        spreadsheet_id: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let base_url = Url::parse(SHEETS_API_BASE)
            .map_err(|e| SyncError::internal(format!("Invalid Sheets API base URL: {e}")))?;
        Ok(Self::with_base_url(http, access_token, spreadsheet_id, base_url))
    }

    /// Create a client against a custom API root.
    pub fn with_base_url(
        http: reqwest::Client,
        access_token: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        base_url: Url,
    ) -> Self {
        Self {
            http,
            access_token: access_token.into(),
            spreadsheet_id: spreadsheet_id.into(),
            base_url,
        }
    }

    /// Spreadsheet resource URL, e.g. `.../spreadsheets/{id}:batchUpdate`.
    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, SyncError> {
        self.url(&[&format!("{}{suffix}", self.spreadsheet_id)])
    }

    /// Values resource URL, e.g. `.../spreadsheets/{id}/values/{range}:clear`.
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SyncError> {
        self.url(&[&self.spreadsheet_id, "values", &format!("{range}{suffix}")])
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::internal("Sheets API base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.access_token)
    }

    /// Map a non-success response to the error taxonomy.
    async fn check(response: Response, operation: &str) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(e) => match e.error.status {
                Some(code) => format!("{operation}: {} ({code})", e.error.message),
                None => format!("{operation}: {}", e.error.message),
            },
            Err(_) => format!("{operation}: HTTP {status}"),
        };

        tracing::warn!(operation, status = status.as_u16(), %message, "Sheets API request failed");
        Err(SyncError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn find_sheet(&self, title: &str) -> Result<Option<SheetProperties>, SyncError> {
        let mut url = self.spreadsheet_url("")?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let response = self.request(Method::GET, url).send().await?;
        let spreadsheet: SpreadsheetSheets =
            Self::check(response, "lookup sheet").await?.json().await?;

        let found = spreadsheet.sheets.into_iter().map(|s| s.properties).find(|p| p.title == title);
        tracing::debug!(title, found = found.is_some(), "Looked up sheet");
        Ok(found)
    }

    async fn add_sheet(&self, title: &str, size: GridSize) -> Result<SheetProperties, SyncError> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let body = BatchUpdateRequest {
            requests: vec![SheetRequest::AddSheet {
                properties: NewSheetProperties { title, grid_properties: size },
            }],
        };

        let response = self.request(Method::POST, url).json(&body).send().await?;
        let reply: BatchUpdateResponse = Self::check(response, "add sheet").await?.json().await?;

        reply
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|entry| entry.properties)
            .ok_or_else(|| SyncError::internal("addSheet reply carried no sheet properties"))
    }

    async fn resize_sheet(&self, sheet_id: i64, size: GridSize) -> Result<(), SyncError> {
        let url = self.spreadsheet_url(":batchUpdate")?;
        let body = BatchUpdateRequest {
            requests: vec![SheetRequest::UpdateSheetProperties {
                properties: GridUpdate { sheet_id, grid_properties: size },
                fields: GRID_SIZE_FIELDS,
            }],
        };

        let response = self.request(Method::POST, url).json(&body).send().await?;
        Self::check(response, "resize sheet").await?;
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> Result<(), SyncError> {
        let url = self.values_url(range, ":clear")?;
        let response = self.request(Method::POST, url).json(&serde_json::json!({})).send().await?;
        Self::check(response, "clear sheet").await?;
        Ok(())
    }

    async fn write_range(&self, range: &str, rows: &[Vec<CellValue>]) -> Result<(), SyncError> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueRange { range, major_dimension: "ROWS", values: rows };

        let response = self.request(Method::PUT, url).json(&body).send().await?;
        Self::check(response, "write values").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_server::TestServer;

    fn client() -> SheetsClient {
        SheetsClient::new(reqwest::Client::new(), "token", "1AbC-xyz").unwrap()
    }

    #[test]
    fn test_spreadsheet_urls() {
        let client = client();
        assert_eq!(
            client.spreadsheet_url("").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC-xyz"
        );
        assert_eq!(
            client.spreadsheet_url(":batchUpdate").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC-xyz:batchUpdate"
        );
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = client().values_url("'Sales Data'!A1", ":clear").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/1AbC-xyz/values/'Sales%20Data'!A1:clear"
        );

        let url = client().values_url("'Q1/Q2'!A2", "").unwrap();
        assert!(url.path().ends_with("/values/'Q1%2FQ2'!A2"), "{}", url.path());
    }

    #[test]
    fn test_add_sheet_body_shape() {
        let body = BatchUpdateRequest {
            requests: vec![SheetRequest::AddSheet {
                properties: NewSheetProperties {
                    title: "SalesData",
                    grid_properties: GridSize { row_count: 12, column_count: 4 },
                },
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "requests": [{
                    "addSheet": {
                        "properties": {
                            "title": "SalesData",
                            "gridProperties": { "rowCount": 12, "columnCount": 4 }
                        }
                    }
                }]
            })
        );
    }

    #[test]
    fn test_resize_body_shape() {
        let body = BatchUpdateRequest {
            requests: vec![SheetRequest::UpdateSheetProperties {
                properties: GridUpdate {
                    sheet_id: 7,
                    grid_properties: GridSize { row_count: 12, column_count: 26 },
                },
                fields: GRID_SIZE_FIELDS,
            }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "requests": [{
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": 7,
                            "gridProperties": { "rowCount": 12, "columnCount": 26 }
                        },
                        "fields": "gridProperties(rowCount,columnCount)"
                    }
                }]
            })
        );
    }

    #[test]
    fn test_value_range_body_shape() {
        let rows = vec![vec![CellValue::Integer(1), CellValue::Float(9.99), "2024-01-01".into()]];
        let body = ValueRange { range: "'SalesData'!A2", major_dimension: "ROWS", values: &rows };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "range": "'SalesData'!A2",
                "majorDimension": "ROWS",
                "values": [[1, 9.99, "2024-01-01"]]
            })
        );
    }

    #[test]
    fn test_parse_lookup_and_add_replies() {
        let lookup: SpreadsheetSheets = serde_json::from_str(
            r#"{"sheets": [
                {"properties": {"sheetId": 0, "title": "Sheet1"}},
                {"properties": {"sheetId": 7, "title": "SalesData",
                                "gridProperties": {"rowCount": 12, "columnCount": 4}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(lookup.sheets[1].properties.sheet_id, 7);

        let empty: SpreadsheetSheets = serde_json::from_str("{}").unwrap();
        assert!(empty.sheets.is_empty());

        let reply: BatchUpdateResponse = serde_json::from_str(
            r#"{"spreadsheetId": "1AbC", "replies": [
                {"addSheet": {"properties": {"sheetId": 42, "title": "SalesData"}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(reply.replies[0].add_sheet.as_ref().unwrap().properties.sheet_id, 42);
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.",
                       "status": "NOT_FOUND"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Requested entity was not found.");
        assert_eq!(parsed.error.status.as_deref(), Some("NOT_FOUND"));
    }

    fn served_client(server: &TestServer) -> SheetsClient {
        SheetsClient::with_base_url(
            reqwest::Client::new(),
            "token",
            "1AbC",
            server.url("/v4/spreadsheets/"),
        )
    }

    #[tokio::test]
    async fn test_lookup_sends_bearer_and_field_mask() {
        let server = TestServer::start(vec![(
            200,
            r#"{"sheets": [{"properties": {"sheetId": 7, "title": "SalesData",
                "gridProperties": {"rowCount": 12, "columnCount": 4}}}]}"#,
        )])
        .await;

        let sheet = served_client(&server).find_sheet("SalesData").await.unwrap().unwrap();
        assert_eq!(sheet.sheet_id, 7);
        assert_eq!(sheet.row_count(), Some(12));

        let requests = server.requests().await;
        assert!(
            requests[0].starts_with("GET /v4/spreadsheets/1AbC?fields=sheets.properties HTTP/1.1"),
            "{}",
            requests[0]
        );
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer token"));
    }

    #[tokio::test]
    async fn test_not_found_body_becomes_access_error() {
        let server = TestServer::start(vec![(
            404,
            r#"{"error": {"code": 404, "message": "Requested entity was not found.",
                "status": "NOT_FOUND"}}"#,
        )])
        .await;

        let err = served_client(&server).find_sheet("SalesData").await.unwrap_err();
        match &err {
            SyncError::Access { message, status } => {
                assert_eq!(*status, Some(404));
                assert!(message.contains("Requested entity was not found."), "{message}");
                assert!(message.contains("NOT_FOUND"), "{message}");
            }
            other => panic!("expected access error, got {other:?}"),
        }
        assert!(err.hint().unwrap().contains("SPREADSHEET_ID"));
    }

    #[tokio::test]
    async fn test_quota_exhausted_write_is_transient() {
        let server = TestServer::start(vec![(
            429,
            r#"{"error": {"code": 429, "message": "Quota exceeded",
                "status": "RESOURCE_EXHAUSTED"}}"#,
        )])
        .await;

        let rows = vec![vec![CellValue::Integer(1), CellValue::Float(9.99)]];
        let err = served_client(&server).write_range("'SalesData'!A2", &rows).await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
        assert_eq!(err.http_status(), Some(429));

        let requests = server.requests().await;
        assert!(
            requests[0]
                .starts_with("PUT /v4/spreadsheets/1AbC/values/'SalesData'!A2?valueInputOption=RAW"),
            "{}",
            requests[0]
        );
        assert!(requests[0].contains(r#""majorDimension":"ROWS""#));
    }

    #[tokio::test]
    async fn test_backend_error_is_transient() {
        let server = TestServer::start(vec![(503, r#"{"error": {"message": "Backend Error"}}"#)])
            .await;
        let err = served_client(&server).clear_range("'SalesData'").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.http_status(), Some(503));
    }

    #[tokio::test]
    async fn test_rejected_token_is_auth_error() {
        let server = TestServer::start(vec![(
            401,
            r#"{"error": {"code": 401, "message": "Request had invalid authentication credentials.",
                "status": "UNAUTHENTICATED"}}"#,
        )])
        .await;
        let err = served_client(&server).clear_range("'SalesData'").await.unwrap_err();
        assert!(matches!(err, SyncError::Auth { .. }), "{err:?}");

        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /v4/spreadsheets/1AbC/values/'SalesData':clear"));
    }

    #[tokio::test]
    async fn test_permission_denied_is_access_error() {
        let server = TestServer::start(vec![(
            403,
            r#"{"error": {"code": 403, "message": "The caller does not have permission",
                "status": "PERMISSION_DENIED"}}"#,
        )])
        .await;
        let err = served_client(&server)
            .add_sheet("SalesData", GridSize { row_count: 12, column_count: 4 })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Access { status: Some(403), .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_internal() {
        let server = TestServer::start(vec![(200, "not json")]).await;
        let err = served_client(&server).find_sheet("SalesData").await.unwrap_err();
        assert!(matches!(err, SyncError::Internal { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_add_and_resize_over_http() {
        let server = TestServer::start(vec![
            (
                200,
                r#"{"spreadsheetId": "1AbC", "replies": [
                    {"addSheet": {"properties": {"sheetId": 42, "title": "SalesData",
                        "gridProperties": {"rowCount": 12, "columnCount": 4}}}}]}"#,
            ),
            (200, r#"{"spreadsheetId": "1AbC", "replies": [{}]}"#),
        ])
        .await;
        let client = served_client(&server);

        let sheet = client
            .add_sheet("SalesData", GridSize { row_count: 12, column_count: 4 })
            .await
            .unwrap();
        assert_eq!(sheet.sheet_id, 42);
        client.resize_sheet(42, GridSize { row_count: 20, column_count: 4 }).await.unwrap();

        let requests = server.requests().await;
        assert!(requests[0].starts_with("POST /v4/spreadsheets/1AbC:batchUpdate"));
        assert!(requests[0].contains(r#""addSheet""#));
        assert!(requests[1].contains(r#""updateSheetProperties""#));
        assert!(requests[1].contains(r#""rowCount":20"#));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transient() {
        let client = SheetsClient::with_base_url(
            reqwest::Client::new(),
            "token",
            "1AbC",
            Url::parse("http://127.0.0.1:1/v4/spreadsheets/").unwrap(),
        );
        let err = client.find_sheet("SalesData").await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
