//! Configuration for sheetaudit.
//!
//! # Configuration Types
//!
//! - **Config**: project settings from `sheetaudit.toml` (server address,
//!   audit tuning, provider endpoints)
//! - **`CredentialsConfig`**: the provider access token from
//!   `~/.config/sheetaudit/credentials.toml`
//!
//! # Resolution Algorithm
//!
//! The project config is resolved in this order:
//!
//! 1. `SHEETAUDIT_CONFIG_PATH` environment variable
//! 2. Current directory
//! 3. Parent directories (walk up to filesystem root)
//!
//! Credentials are read from `SHEETAUDIT_CREDENTIALS_PATH` or the XDG config
//! directory. Missing files are not errors.
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:3000"
//!
//! [audit]
//! fan_out = 4
//! tab_concurrency = 4
//! call_timeout_secs = 30
//! max_list_pages = 1
//!
//! [google]
//! drive_endpoint = "https://www.googleapis.com/drive/v3"
//! sheets_endpoint = "https://sheets.googleapis.com/v4"
//! request_timeout_secs = 30
//! max_retries = 2
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "sheetaudit.toml";
const CONFIG_PATH_ENV: &str = "SHEETAUDIT_CONFIG_PATH";
const CREDENTIALS_PATH_ENV: &str = "SHEETAUDIT_CREDENTIALS_PATH";

/// Default Google Drive v3 endpoint.
pub const DEFAULT_DRIVE_ENDPOINT: &str = "https://www.googleapis.com/drive/v3";

/// Default Google Sheets v4 endpoint.
pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error when a config file is malformed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file not found.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Project configuration from `sheetaudit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub audit: AuditOptions,
    pub google: GoogleConfig,
}

impl Config {
    /// Loads and validates a config file from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if:
    /// - The file cannot be read (returns `NotFound` variant)
    /// - The file cannot be parsed as TOML
    /// - A value fails validation
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|_e| ConfigError::NotFound(path.to_path_buf()))?;

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the project config, returning `None` when no file exists.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read, parsed or
    /// validated.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
            && path.exists()
        {
            return Self::load(path).map(Some);
        }

        let current = std::env::current_dir()?;
        Self::resolve_from(&current)
    }

    /// Searches `start` and its ancestors for `sheetaudit.toml`.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be loaded.
    pub fn resolve_from(start: &Path) -> Result<Option<Self>, ConfigError> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Self::load(candidate).map(Some);
            }
        }
        Ok(None)
    }

    /// Loads an explicit path when given, otherwise resolves, otherwise
    /// falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a config file exists but cannot be
    /// loaded.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::load_resolved()?.unwrap_or_default()),
        }
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audit.validate()?;
        self.google.validate()?;
        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "server.addr must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:3000`.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Tuning knobs for one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditOptions {
    /// Spreadsheets enriched concurrently.
    pub fan_out: usize,

    /// Tabs blank-checked concurrently within one spreadsheet.
    pub tab_concurrency: usize,

    /// Time budget for every remote call, in seconds.
    pub call_timeout_secs: u64,

    /// Listing pages walked before the listing is truncated.
    ///
    /// The default of one page keeps the listing to the provider's first
    /// result page.
    pub max_list_pages: usize,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            fan_out: 4,
            tab_concurrency: 4,
            call_timeout_secs: 30,
            max_list_pages: 1,
        }
    }
}

impl AuditOptions {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any knob is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("audit.fan_out", self.fan_out == 0),
            ("audit.tab_concurrency", self.tab_concurrency == 0),
            ("audit.call_timeout_secs", self.call_timeout_secs == 0),
            ("audit.max_list_pages", self.max_list_pages == 0),
        ];
        match checks.iter().find(|(_, bad)| *bad) {
            Some((name, _)) => Err(ConfigError::Invalid(format!("{name} must be at least 1"))),
            None => Ok(()),
        }
    }
}

/// Google API endpoints and client behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub drive_endpoint: String,
    pub sheets_endpoint: String,
    /// Whole-request timeout applied by the HTTP client, in seconds.
    pub request_timeout_secs: u64,
    /// Retries for 429 and 5xx responses.
    pub max_retries: usize,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            drive_endpoint: DEFAULT_DRIVE_ENDPOINT.to_string(),
            sheets_endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl GoogleConfig {
    /// Points both services at the same base URL.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            drive_endpoint: endpoint.clone(),
            sheets_endpoint: endpoint,
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty endpoints or a zero
    /// timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drive_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "google.drive_endpoint must not be empty".to_string(),
            ));
        }
        if self.sheets_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "google.sheets_endpoint must not be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "google.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credentials configuration from `~/.config/sheetaudit/credentials.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub google: Option<GoogleCredentials>,
}

/// Stored Google credential.
#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleCredentials {
    pub access_token: String,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl CredentialsConfig {
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads credentials from the env override or the XDG config directory.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Option<Self>, ConfigError> {
        let path = std::env::var_os(CREDENTIALS_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|dir| dir.join("sheetaudit/credentials.toml")));

        match path {
            Some(path) if path.exists() => Self::load(path).map(Some),
            _ => Ok(None),
        }
    }

    pub fn google_access_token(&self) -> Option<&str> {
        self.google
            .as_ref()
            .map(|google| google.access_token.as_str())
            .filter(|token| !token.trim().is_empty())
    }
}
