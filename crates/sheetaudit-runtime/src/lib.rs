//! HTTP service for sheetaudit.
//!
//! Serves the audit report next to the display views and single-file
//! actions:
//!
//! | route                    | method | body                         |
//! |--------------------------|--------|------------------------------|
//! | `/health`                | GET    |                              |
//! | `/audit`                 | GET    |                              |
//! | `/spreadsheets`          | GET    | `?pageSize=N`                |
//! | `/spreadsheets/{id}`     | GET    |                              |
//! | `/rename`                | POST   | `{ "fileId", "newName" }`    |
//! | `/copy`                  | POST   | `{ "fileId" }`               |
//! | `/trash`                 | POST   | `{ "fileId" }`               |
//! | `/remove-public`         | POST   | `{ "fileId" }`               |
//! | `/logout`                | POST   |                              |
//!
//! Every route except `/health` and `/logout` requires a session; see [`Authenticated`].

mod auth;
mod error;
mod routes;

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use sheetaudit_core::{AuditOptions, Auditor, Config, Session};
use sheetaudit_google::{ClientError, GoogleApi};
use tokio::net::TcpListener;
use tracing::info;

pub use auth::{ACCESS_TOKEN_COOKIE, Authenticated};
pub use error::ActionError;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    auditor: Auditor,
    google: Arc<GoogleApi>,
    default_session: Option<Session>,
}

impl AppState {
    pub fn new(google: GoogleApi, options: AuditOptions) -> Self {
        let google = Arc::new(google);
        Self {
            auditor: Auditor::new(google.clone(), options),
            google,
            default_session: None,
        }
    }

    /// Builds the provider client and auditor from a loaded config.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the `[google]` section is unusable.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Ok(Self::new(
            GoogleApi::new(&config.google)?,
            config.audit.clone(),
        ))
    }

    /// Session used when a request carries no credential of its own.
    #[must_use]
    pub fn with_default_session(mut self, session: Session) -> Self {
        self.default_session = Some(session);
        self
    }

    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    pub fn google(&self) -> &GoogleApi {
        &self.google
    }

    pub fn default_session(&self) -> Option<&Session> {
        self.default_session.as_ref()
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/audit", get(routes::audit))
        .route("/spreadsheets", get(routes::list_spreadsheets))
        .route("/spreadsheets/{id}", get(routes::spreadsheet_details))
        .route("/rename", post(routes::rename))
        .route("/copy", post(routes::copy))
        .route("/trash", post(routes::trash))
        .route("/remove-public", post(routes::remove_public))
        .route("/logout", post(routes::logout))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` completes, then drains
/// in-flight requests.
///
/// # Errors
///
/// Returns an I/O error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Starting sheetaudit server");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("sheetaudit server stopped");
    Ok(())
}
