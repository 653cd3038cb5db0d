//! The remote API seam used by the audit engine.

use std::{fmt, time::Duration};

use async_trait::async_trait;

use crate::{
    Session,
    model::{ChildDocument, PermissionEntry, SpreadsheetPage, TabStructure, ValueGrid},
};

/// MIME type of a spreadsheet document.
pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// MIME type of a bound script project.
pub const SCRIPT_MIME_TYPE: &str = "application/vnd.google-apps.script";

/// Errors returned by a [`SpreadsheetApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("{service} API request failed ({status}): {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The call exceeded its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::InvalidRequest(_) => false,
        }
    }
}

/// Narrow contract the engine relies on to query the provider.
///
/// Implementations must be thread-safe (`Send + Sync`). Every method takes
/// the caller's [`Session`]; implementations must not cache or mutate it.
#[async_trait]
pub trait SpreadsheetApi: fmt::Debug + Send + Sync {
    /// Lists one page of spreadsheet documents with
    /// `id, name, owners, shared`.
    async fn list_spreadsheet_files(
        &self,
        session: &Session,
        page_token: Option<&str>,
    ) -> Result<SpreadsheetPage, ApiError>;

    /// Lists documents of `mime_type` whose parent is `parent_id`.
    async fn list_child_documents(
        &self,
        session: &Session,
        parent_id: &str,
        mime_type: &str,
    ) -> Result<Vec<ChildDocument>, ApiError>;

    /// Fetches the tab structure of a spreadsheet. Formula grids are only
    /// populated when `include_grid_data` is set.
    async fn get_spreadsheet_structure(
        &self,
        session: &Session,
        spreadsheet_id: &str,
        include_grid_data: bool,
    ) -> Result<Vec<TabStructure>, ApiError>;

    /// Fetches the rendered values of a whole tab.
    async fn get_tab_values(
        &self,
        session: &Session,
        spreadsheet_id: &str,
        tab_title: &str,
    ) -> Result<ValueGrid, ApiError>;

    /// Lists the permissions granted on a file.
    async fn list_permissions(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<Vec<PermissionEntry>, ApiError>;
}
