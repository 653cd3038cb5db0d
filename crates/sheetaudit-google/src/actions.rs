//! Display views and single-file actions.
//!
//! These are one-call passthroughs with no aggregation logic. They are not
//! part of the audit and never feed into a report.

use serde::de::DeserializeOwned;
use serde_json::json;
use sheetaudit_core::{ApiError, PermissionType, SPREADSHEET_MIME_TYPE, Session, SpreadsheetApi};
use tracing::{info, instrument};

use crate::{
    GoogleApi, Service, decode,
    types::{CopiedFile, FileListResponse, FileMetadata, SpreadsheetDetails, SpreadsheetLink},
};

const LINK_FIELDS: &str = "nextPageToken, files(id, name, webViewLink)";
const DETAIL_FIELDS: &str = "id,name,webViewLink,createdTime,modifiedTime,owners";

/// Page size of the display listing when none is given.
pub const DEFAULT_LINK_PAGE_SIZE: u32 = 50;

fn require(value: &str, name: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidRequest(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}

impl GoogleApi {
    /// Lists spreadsheets for display, most recently modified first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `page_size` is not between 1 and 1000 or the
    /// Drive request fails.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn list_spreadsheet_links(
        &self,
        session: &Session,
        page_size: u32,
    ) -> Result<Vec<SpreadsheetLink>, ApiError> {
        if !(1..=1000).contains(&page_size) {
            return Err(ApiError::InvalidRequest(
                "page_size must be between 1 and 1000".to_string(),
            ));
        }

        let query = [
            ("q", format!("mimeType='{SPREADSHEET_MIME_TYPE}'")),
            ("pageSize", page_size.to_string()),
            ("fields", LINK_FIELDS.to_string()),
            ("orderBy", "modifiedTime desc".to_string()),
        ];

        let response: FileListResponse<SpreadsheetLink> = self
            .get_json(session, Service::Drive, &["files"], &query)
            .await?;
        Ok(response.files)
    }

    /// Fetches file metadata and tab structure of one spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `spreadsheet_id` is empty or either request
    /// fails.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn spreadsheet_details(
        &self,
        session: &Session,
        spreadsheet_id: &str,
    ) -> Result<SpreadsheetDetails, ApiError> {
        require(spreadsheet_id, "spreadsheet_id")?;

        let path = ["files", spreadsheet_id];
        let query = [("fields", DETAIL_FIELDS.to_string())];
        let metadata = self.get_json::<FileMetadata>(session, Service::Drive, &path, &query);
        let structure = self.get_spreadsheet_structure(session, spreadsheet_id, false);
        let (metadata, structure) = futures::join!(metadata, structure);
        let (metadata, structure) = (metadata?, structure?);

        let tabs: Vec<_> = structure.into_iter().map(|s| s.tab).collect();
        Ok(SpreadsheetDetails {
            id: metadata.id,
            name: metadata.name,
            web_view_link: metadata.web_view_link,
            created_time: metadata.created_time,
            modified_time: metadata.modified_time,
            owners: metadata.owners,
            sheet_count: tabs.len(),
            tabs,
        })
    }

    /// Renames a file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if either argument is empty or the update fails.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn rename_file(
        &self,
        session: &Session,
        file_id: &str,
        new_name: &str,
    ) -> Result<(), ApiError> {
        require(file_id, "file_id")?;
        require(new_name, "new_name")?;

        let _: FileMetadataStub = self
            .send_json(
                session,
                self.http
                    .patch(self.url_with_segments(Service::Drive, &["files", file_id])?)
                    .json(&json!({ "name": new_name })),
            )
            .await?;

        info!(file_id, "Renamed file");
        Ok(())
    }

    /// Copies a file as `Copy of <name>`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `file_id` is empty, the source cannot be read
    /// or the copy fails.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn copy_file(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<CopiedFile, ApiError> {
        require(file_id, "file_id")?;

        let source: FileMetadataStub = self
            .get_json(
                session,
                Service::Drive,
                &["files", file_id],
                &[("fields", "name".to_string())],
            )
            .await?;

        let copy: CopiedFile = self
            .send_json(
                session,
                self.http
                    .post(self.url_with_segments(Service::Drive, &["files", file_id, "copy"])?)
                    .query(&[("fields", "id,name")])
                    .json(&json!({ "name": format!("Copy of {}", source.name) })),
            )
            .await?;

        info!(file_id, new_file_id = %copy.id, "Copied file");
        Ok(copy)
    }

    /// Moves a file to the trash.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `file_id` is empty or the update fails.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn trash_file(&self, session: &Session, file_id: &str) -> Result<(), ApiError> {
        require(file_id, "file_id")?;

        let _: FileMetadataStub = self
            .send_json(
                session,
                self.http
                    .patch(self.url_with_segments(Service::Drive, &["files", file_id])?)
                    .json(&json!({ "trashed": true })),
            )
            .await?;

        info!(file_id, "Trashed file");
        Ok(())
    }

    /// Deletes every `anyone` permission on a file and returns how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if `file_id` is empty, the permissions cannot be
    /// listed or a deletion fails. Deletions already made are not undone.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn remove_public_access(
        &self,
        session: &Session,
        file_id: &str,
    ) -> Result<usize, ApiError> {
        require(file_id, "file_id")?;

        let permissions = self.list_permissions(session, file_id).await?;
        let mut removed = 0;
        for permission in permissions
            .iter()
            .filter(|p| p.type_ == PermissionType::Anyone)
        {
            let url = self.url_with_segments(
                Service::Drive,
                &["files", file_id, "permissions", &permission.id],
            )?;
            self.send_request(session, Service::Drive, self.http.delete(url))
                .await?;
            removed += 1;
        }

        info!(file_id, removed, "Removed public access");
        Ok(removed)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send_request(session, Service::Drive, request).await?;
        decode(response).await
    }
}

/// Minimal file resource returned by metadata updates.
#[derive(Debug, serde::Deserialize)]
struct FileMetadataStub {
    #[serde(default)]
    name: String,
}
