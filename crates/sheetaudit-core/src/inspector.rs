//! Per-tab checks: blank detection and external-import scanning.
//!
//! The two checks are independent. Blank detection reads rendered values,
//! the formula scan reads formula source, so a tab whose only formula renders
//! nothing can be both blank and carry an external connection.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream};
use tracing::{debug, warn};

use crate::{
    AuditOptions, Session, SpreadsheetApi,
    model::{ExternalConnection, SheetTab, TabStructure},
    policy::{Operation, bounded},
};

/// Function name that marks a cross-spreadsheet import.
pub const EXTERNAL_IMPORT_MARKER: &str = "IMPORTRANGE";

/// Inspects the tabs of one spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetInspector {
    api: Arc<dyn SpreadsheetApi>,
    call_timeout: Duration,
    tab_concurrency: usize,
}

impl SheetInspector {
    pub fn new(api: Arc<dyn SpreadsheetApi>, options: &AuditOptions) -> Self {
        Self {
            api,
            call_timeout: options.call_timeout(),
            tab_concurrency: options.tab_concurrency.max(1),
        }
    }

    /// Returns `true` if the tab's rendered value grid has zero rows.
    ///
    /// Never fails: a read error or timeout is logged and answered with
    /// `false` so a transient fault cannot mislabel a tab as blank.
    pub async fn is_blank(&self, session: &Session, spreadsheet_id: &str, tab_title: &str) -> bool {
        let result = bounded(
            Operation::CheckBlank,
            self.call_timeout,
            self.api.get_tab_values(session, spreadsheet_id, tab_title),
        )
        .await;

        match result {
            Ok(values) => {
                debug!(
                    spreadsheet_id,
                    tab_title,
                    rows = values.len(),
                    "Checked tab values"
                );
                values.is_empty()
            }
            Err(e) => {
                warn!(
                    spreadsheet_id,
                    tab_title,
                    operation = %e.operation,
                    policy = ?e.policy(),
                    error = %e.source,
                    "Blank check failed, treating tab as not blank"
                );
                false
            }
        }
    }

    /// Titles of the blank tabs among `tabs`, in tab order.
    ///
    /// Tabs are checked concurrently up to the configured bound; each check
    /// is isolated from the others.
    pub async fn blank_tabs(
        &self,
        session: &Session,
        spreadsheet_id: &str,
        tabs: &[SheetTab],
    ) -> Vec<String> {
        let checks: Vec<_> = tabs
            .iter()
            .map(|tab| async move {
                self.is_blank(session, spreadsheet_id, &tab.title)
                    .await
                    .then(|| tab.title.clone())
            })
            .collect();
        let checks: Vec<Option<String>> = stream::iter(checks)
        .buffered(self.tab_concurrency)
        .collect()
        .await;

        checks.into_iter().flatten().collect()
    }
}

/// Case-insensitive check for the import marker.
pub fn is_external_import(formula: &str) -> bool {
    formula.to_uppercase().contains(EXTERNAL_IMPORT_MARKER)
}

/// Every cell formula in `tabs` that imports data from another spreadsheet,
/// in tab, row and column order.
pub fn scan_external_connections(tabs: &[TabStructure]) -> Vec<ExternalConnection> {
    tabs.iter()
        .flat_map(|structure| {
            structure
                .formulas
                .iter()
                .flatten()
                .flatten()
                .filter(|formula| is_external_import(formula))
                .map(|formula| ExternalConnection {
                    sheet_title: structure.tab.title.clone(),
                    formula: formula.clone(),
                })
        })
        .collect()
}
