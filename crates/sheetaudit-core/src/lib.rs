//! Core engine for the spreadsheet governance audit.
//!
//! Given an authenticated [`Session`] and a [`SpreadsheetApi`] implementation,
//! the [`Auditor`] enumerates every spreadsheet the session can see, runs the
//! per-spreadsheet enrichment pipeline over each of them, and assembles a
//! single [`AuditReport`].
//!
//! # Key Components
//!
//! - **Remote API seam**: [`SpreadsheetApi`] is the only way the engine talks
//!   to the provider. Every call receives the immutable [`Session`].
//! - **Per-Sheet Inspector**: [`SheetInspector`] detects blank tabs and scans
//!   formulas for cross-spreadsheet imports.
//! - **Per-Spreadsheet Enricher**: [`Enricher`] drives an explicit
//!   [`EnrichmentState`] machine for one spreadsheet.
//! - **Audit Aggregator**: [`Auditor`] lists, fans out and merges.
//! - **Failure policy**: every remote [`Operation`] carries a
//!   [`FailurePolicy`] that decides how far a failure is allowed to travel.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use sheetaudit_core::{AuditOptions, Auditor, Session};
//!
//! # async fn example(api: Arc<dyn sheetaudit_core::SpreadsheetApi>) -> Result<(), Box<dyn std::error::Error>> {
//! let auditor = Auditor::new(api, AuditOptions::default());
//! let session = Session::new("ya29.token")?;
//! let report = auditor.run_audit(&session).await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod api;
mod config;
mod enricher;
mod inspector;
mod model;
mod policy;
mod session;

#[cfg(test)]
mod testing;

pub use aggregator::Auditor;
pub use api::{ApiError, SCRIPT_MIME_TYPE, SPREADSHEET_MIME_TYPE, SpreadsheetApi};
pub use config::{
    AuditOptions, Config, ConfigError, CredentialsConfig, GoogleConfig, GoogleCredentials,
    ServerConfig,
};
pub use enricher::{AccessSummary, Enricher, EnrichmentState, EnrichmentTask, Findings};
pub use inspector::{
    EXTERNAL_IMPORT_MARKER, SheetInspector, is_external_import, scan_external_connections,
};
pub use model::{
    AuditReport, AuditedSpreadsheet, ChildDocument, EnrichedSpreadsheetRecord, ExternalConnection,
    FailedSpreadsheet, LISTING_FAILED_MESSAGE, NO_SPREADSHEETS_MESSAGE, OwnerRef, PermissionEntry,
    PermissionRole, PermissionType, RECORD_FAILED_MESSAGE, SheetTab, SpreadsheetPage,
    SpreadsheetSummary, TabStructure, ValueGrid,
};
pub use policy::{FailurePolicy, Operation, StageError};
pub use session::{Session, SessionError};
