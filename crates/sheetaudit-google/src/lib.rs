//! Google Drive v3 and Sheets v4 client for sheetaudit.
//!
//! [`GoogleApi`] implements [`SpreadsheetApi`] for the audit engine and adds
//! the display views and single-file actions served next to the report.
//! Every call authenticates with the caller's [`Session`]; the client itself
//! holds no credential.
//!
//! Read requests are retried with exponential backoff on 429 and 5xx
//! responses, transport failures and timeouts. Mutations are sent once.

mod actions;
mod types;

use std::time::Duration;

pub use actions::DEFAULT_LINK_PAGE_SIZE;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use sheetaudit_core::{
    ApiError, ChildDocument, GoogleConfig, PermissionEntry, SPREADSHEET_MIME_TYPE, Session,
    SpreadsheetApi, SpreadsheetPage, SpreadsheetSummary, TabStructure, ValueGrid,
};
use tracing::{debug, instrument, warn};
pub use types::{CopiedFile, SpreadsheetDetails, SpreadsheetLink};
use types::{FileListResponse, PermissionListResponse, Spreadsheet, ValueRange};

const LISTING_FIELDS: &str = "nextPageToken, files(id, name, owners, shared)";
const CHILD_FIELDS: &str = "files(id, name)";
const PERMISSION_FIELDS: &str = "permissions(id, type, role, emailAddress, allowFileDiscovery)";
const STRUCTURE_FIELDS: &str = "sheets.properties";
const GRID_FIELDS: &str = "sheets(properties,data.rowData.values.userEnteredValue.formulaValue)";

/// Errors that can occur when constructing a [`GoogleApi`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// An endpoint is empty or not an absolute URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy)]
enum Service {
    Drive,
    Sheets,
}

impl Service {
    const fn name(self) -> &'static str {
        match self {
            Self::Drive => "Google Drive",
            Self::Sheets => "Google Sheets",
        }
    }
}

/// Client for the Google Drive and Sheets REST APIs.
#[derive(Debug, Clone)]
pub struct GoogleApi {
    http: reqwest::Client,
    drive_url: String,
    sheets_url: String,
    request_timeout: Duration,
    max_retries: usize,
}

impl GoogleApi {
    /// Builds a client from the `[google]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if an endpoint is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &GoogleConfig) -> Result<Self, ClientError> {
        let request_timeout = config.request_timeout();
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            drive_url: normalize_base_url(&config.drive_endpoint)?,
            sheets_url: normalize_base_url(&config.sheets_endpoint)?,
            request_timeout,
            max_retries: config.max_retries,
        })
    }

    fn base_url(&self, service: Service) -> &str {
        match service {
            Service::Drive => &self.drive_url,
            Service::Sheets => &self.sheets_url,
        }
    }

    fn url_with_segments(
        &self,
        service: Service,
        segments: &[&str],
    ) -> Result<reqwest::Url, ApiError> {
        let mut url = reqwest::Url::parse(self.base_url(service))
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::InvalidRequest("base_url must be an absolute URL".to_string())
            })?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Sends a GET request, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        service: Service,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url_with_segments(service, segments)?;

        let attempt = || async {
            let response = self
                .send_request(session, service, self.http.get(url.clone()).query(query))
                .await?;
            decode(response).await
        };

        attempt
            .retry(self.backoff())
            .when(ApiError::is_transient)
            .notify(|err, delay| {
                warn!(
                    service = service.name(),
                    path = url.path(),
                    error = %err,
                    delay_ms = delay.as_millis(),
                    "Retrying Google API request"
                );
            })
            .await
    }

    async fn send_request(
        &self,
        session: &Session,
        service: Service,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request
            .bearer_auth(session.access_token())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(
                service = service.name(),
                status = status.as_u16(),
                "Google API error"
            );
            Err(ApiError::Status {
                service: service.name(),
                status: status.as_u16(),
                body,
            })
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else {
            ApiError::Transport(error.to_string())
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

fn normalize_base_url(endpoint: &str) -> Result<String, ClientError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidEndpoint(
            "endpoint must not be empty".to_string(),
        ));
    }
    let normalized = trimmed.trim_end_matches('/');
    reqwest::Url::parse(normalized)
        .map_err(|e| ClientError::InvalidEndpoint(format!("{normalized}: {e}")))?;
    Ok(normalized.to_string())
}

/// A1 range covering a whole tab. Quotes inside the title are doubled.
fn whole_tab_range(tab_title: &str) -> String {
    format!("'{}'", tab_title.replace('\'', "''"))
}

#[async_trait]
impl SpreadsheetApi for GoogleApi {
    #[instrument(level = "debug", skip(self, session))]
    async fn list_spreadsheet_files(
        &self,
        session: &Session,
        page_token: Option<&str>,
    ) -> Result<SpreadsheetPage, ApiError> {
        let mut query = vec![
            ("q", format!("mimeType='{SPREADSHEET_MIME_TYPE}'")),
            ("fields", LISTING_FIELDS.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: FileListResponse<SpreadsheetSummary> = self
            .get_json(session, Service::Drive, &["files"], &query)
            .await?;

        Ok(SpreadsheetPage {
            files: response.files,
            next_page_token: response.next_page_token,
        })
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn list_child_documents(
        &self,
        session: &Session,
        parent_id: &str,
        mime_type: &str,
    ) -> Result<Vec<ChildDocument>, ApiError> {
        let query = [
            (
                "q",
                format!("'{parent_id}' in parents and mimeType='{mime_type}'"),
            ),
            ("fields", CHILD_FIELDS.to_string()),
        ];

        let response: FileListResponse<ChildDocument> = self
            .get_json(session, Service::Drive, &["files"], &query)
            .await?;
        Ok(response.files)
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn get_spreadsheet_structure(
        &self,
        session: &Session,
        spreadsheet_id: &str,
        include_grid_data: bool,
    ) -> Result<Vec<TabStructure>, ApiError> {
        let fields = if include_grid_data {
            GRID_FIELDS
        } else {
            STRUCTURE_FIELDS
        };
        let query = [
            ("includeGridData", include_grid_data.to_string()),
            ("fields", fields.to_string()),
        ];

        let spreadsheet: Spreadsheet = self
            .get_json(
                session,
                Service::Sheets,
                &["spreadsheets", spreadsheet_id],
                &query,
            )
            .await?;

        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(types::Sheet::into_tab_structure)
            .collect())
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn get_tab_values(
        &self,
        session: &Session,
        spreadsheet_id: &str,
        tab_title: &str,
    ) -> Result<ValueGrid, ApiError> {
        let range = whole_tab_range(tab_title);
        let response: ValueRange = self
            .get_json(
                session,
                Service::Sheets,
                &["spreadsheets", spreadsheet_id, "values", &range],
                &[],
            )
            .await?;
        Ok(response.values)
    }

    #[instrument(level = "debug", skip(self, session))]
    async fn list_permissions(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<Vec<PermissionEntry>, ApiError> {
        let response: PermissionListResponse = self
            .get_json(
                session,
                Service::Drive,
                &["files", file_id, "permissions"],
                &[("fields", PERMISSION_FIELDS.to_string())],
            )
            .await?;
        Ok(response.permissions)
    }
}
