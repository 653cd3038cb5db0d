//! CLI command implementations.

pub mod audit;
pub mod describe;
pub mod list;
pub mod schema;
pub mod serve;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use sheetaudit_core::{Config, CredentialsConfig, Session};
use sheetaudit_google::GoogleApi;

/// Access token options shared by every command that calls Google.
#[derive(Args)]
pub struct TokenArgs {
    /// Google OAuth access token. Falls back to the credentials file.
    #[arg(long, env = "SHEETAUDIT_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

impl TokenArgs {
    /// Resolves a token from the flag or environment, then the credentials
    /// file. Returns `None` when neither provides one.
    pub fn session(&self) -> Result<Option<Session>> {
        let token = match self.access_token.as_deref() {
            Some(token) => Some(token.to_string()),
            None => CredentialsConfig::load_resolved()
                .context("failed to load credentials")?
                .and_then(|creds| creds.google_access_token().map(str::to_string)),
        };

        token
            .map(|token| Session::new(token).context("invalid access token"))
            .transpose()
    }

    pub fn require_session(&self) -> Result<Session> {
        match self.session()? {
            Some(session) => Ok(session),
            None => bail!(
                "no access token: pass --access-token, set SHEETAUDIT_ACCESS_TOKEN, or add \
                 [google] access_token to the credentials file"
            ),
        }
    }
}

/// Loads the project config from `path` or the usual search locations.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load_or_default(path).context("failed to load sheetaudit config")
}

pub fn google_client(config: &Config) -> Result<GoogleApi> {
    GoogleApi::new(&config.google).context("failed to create Google API client")
}
