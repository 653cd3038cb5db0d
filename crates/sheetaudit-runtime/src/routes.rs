use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use sheetaudit_core::{ApiError, AuditReport};
use sheetaudit_google::{DEFAULT_LINK_PAGE_SIZE, SpreadsheetDetails};
use tracing::{debug, info, warn};

use crate::{ActionError, AppState, Authenticated, auth::expired_session_cookie};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileRequest {
    #[serde(default)]
    file_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenameRequest {
    #[serde(default)]
    file_id: String,
    #[serde(default)]
    new_name: String,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Unwraps a JSON body, answering a malformed one with `message`.
fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    message: &'static str,
) -> Result<T, ActionError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        debug!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Rejected request body"
        );
        ActionError::BadRequest(message)
    })
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn audit(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> (StatusCode, Json<AuditReport>) {
    let report = state.auditor().run_audit(&session).await;
    let status = if report.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

pub(crate) async fn list_spreadsheets(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Value>, ActionError> {
    let Query(query) = query.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected query string");
        ActionError::BadRequest("Invalid page size")
    })?;
    let page_size = query.page_size.unwrap_or(DEFAULT_LINK_PAGE_SIZE);
    match state
        .google()
        .list_spreadsheet_links(&session, page_size)
        .await
    {
        Ok(spreadsheets) => Ok(Json(json!({ "spreadsheets": spreadsheets }))),
        Err(ApiError::InvalidRequest(_)) => Err(ActionError::BadRequest("Invalid page size")),
        Err(e) => {
            warn!(error = %e, "Failed to fetch spreadsheets");
            Err(ActionError::upstream("Failed to fetch spreadsheets"))
        }
    }
}

pub(crate) async fn spreadsheet_details(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SpreadsheetDetails>, ActionError> {
    match state.google().spreadsheet_details(&session, &id).await {
        Ok(details) => Ok(Json(details)),
        Err(ApiError::Status { status: 404, .. }) => {
            Err(ActionError::NotFound("Spreadsheet not found"))
        }
        Err(e) => {
            warn!(spreadsheet_id = %id, error = %e, "Failed to fetch spreadsheet details");
            Err(ActionError::upstream("Failed to fetch spreadsheet details"))
        }
    }
}

pub(crate) async fn rename(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    request: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Value>, ActionError> {
    let request = json_body(request, "Missing file ID or new name")?;
    if is_blank(&request.file_id) || is_blank(&request.new_name) {
        return Err(ActionError::BadRequest("Missing file ID or new name"));
    }

    state
        .google()
        .rename_file(&session, &request.file_id, &request.new_name)
        .await
        .map_err(|e| {
            warn!(file_id = %request.file_id, error = %e, "Failed to rename file");
            ActionError::upstream("Failed to rename file")
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "File renamed successfully",
    })))
}

pub(crate) async fn copy(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    request: Result<Json<FileRequest>, JsonRejection>,
) -> Result<Json<Value>, ActionError> {
    let request = json_body(request, "Missing file ID")?;
    if is_blank(&request.file_id) {
        return Err(ActionError::BadRequest("Missing file ID"));
    }

    let copy = state
        .google()
        .copy_file(&session, &request.file_id)
        .await
        .map_err(|e| {
            warn!(file_id = %request.file_id, error = %e, "Failed to copy file");
            ActionError::upstream("Failed to copy file")
        })?;

    info!(file_id = %request.file_id, new_file_id = %copy.id, "Copy requested");
    Ok(Json(json!({
        "success": true,
        "newFileId": copy.id,
        "newFileName": copy.name,
    })))
}

pub(crate) async fn trash(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    request: Result<Json<FileRequest>, JsonRejection>,
) -> Result<Json<Value>, ActionError> {
    let request = json_body(request, "Missing file ID")?;
    if is_blank(&request.file_id) {
        return Err(ActionError::BadRequest("Missing file ID"));
    }

    state
        .google()
        .trash_file(&session, &request.file_id)
        .await
        .map_err(|e| {
            warn!(file_id = %request.file_id, error = %e, "Failed to trash file");
            ActionError::Upstream {
                message: "Failed to trash file",
                details: Some(e.to_string()),
            }
        })?;

    Ok(Json(json!({
        "success": true,
        "message": "File moved to trash successfully",
    })))
}

pub(crate) async fn remove_public(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    request: Result<Json<FileRequest>, JsonRejection>,
) -> Result<Json<Value>, ActionError> {
    let request = json_body(request, "Invalid file ID")?;
    if is_blank(&request.file_id) {
        return Err(ActionError::BadRequest("Invalid file ID"));
    }

    state
        .google()
        .remove_public_access(&session, &request.file_id)
        .await
        .map_err(|e| {
            warn!(file_id = %request.file_id, error = %e, "Failed to remove public access");
            ActionError::upstream("Failed to remove public access")
        })?;

    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(json!({
            "success": true,
            "message": "Logged out successfully",
        })),
    )
}
