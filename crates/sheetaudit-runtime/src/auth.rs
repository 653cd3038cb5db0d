//! Session extraction for incoming requests.
//!
//! A request is authenticated by, in order:
//!
//! 1. an `Authorization: Bearer <token>` header
//! 2. a `google_access_token` cookie
//! 3. the default session the service was started with, if any

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use sheetaudit_core::Session;

use crate::{ActionError, AppState};

/// Name of the cookie that carries the provider access token.
pub const ACCESS_TOKEN_COOKIE: &str = "google_access_token";

/// Extractor that resolves the caller's [`Session`] or rejects with 401.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Session);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ActionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        session_from_headers(&parts.headers)
            .or_else(|| state.default_session().cloned())
            .map(Self)
            .ok_or(ActionError::Unauthenticated)
    }
}

/// `Set-Cookie` value that expires the access token cookie.
pub(crate) fn expired_session_cookie() -> String {
    format!(
        "{ACCESS_TOKEN_COOKIE}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; \
         HttpOnly; SameSite=Lax"
    )
}

fn session_from_headers(headers: &HeaderMap) -> Option<Session> {
    if let Some(session) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(Session::from_bearer_header)
    {
        return Some(session);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .and_then(|(_, token)| Session::new(token).ok())
}
