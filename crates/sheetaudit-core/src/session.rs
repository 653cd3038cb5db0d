//! Authenticated session handed to the engine by the caller.

use std::{fmt, sync::Arc};

/// Errors that can occur when constructing a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The supplied access token was empty or whitespace.
    #[error("access_token must not be empty")]
    EmptyToken,
}

/// An immutable bearer credential.
///
/// The engine never acquires, refreshes or mutates credentials. A session is
/// passed by reference into every remote call and is cheap to clone.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access_token: Arc<str>,
}

impl Session {
    /// Creates a session from a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] if the token is blank.
    pub fn new(access_token: impl AsRef<str>) -> Result<Self, SessionError> {
        let token = access_token.as_ref().trim();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(Self {
            access_token: Arc::from(token),
        })
    }

    /// Parses an `Authorization` header value of the form `Bearer <token>`.
    pub fn from_bearer_header(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        Self::new(token).ok()
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}
