use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Rejection returned by every route. The body is always `{ "error": ... }`,
/// including for malformed JSON bodies and query strings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ActionError {
    /// No session could be established for the request.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The request body or parameters were missing or invalid.
    #[error("{0}")]
    BadRequest(&'static str),

    /// The provider reported that the file does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The provider call failed.
    #[error("{message}")]
    Upstream {
        message: &'static str,
        details: Option<String>,
    },
}

impl ActionError {
    pub fn upstream(message: &'static str) -> Self {
        Self::Upstream {
            message,
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Upstream {
                details: Some(details),
                ..
            } => json!({ "error": self.to_string(), "details": details }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
