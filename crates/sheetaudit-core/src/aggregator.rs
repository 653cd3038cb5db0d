use std::sync::Arc;

use futures::{StreamExt, stream};
use tracing::{debug, error, info, instrument};

use crate::{
    AuditOptions, Enricher, Session, SpreadsheetApi,
    model::{AuditReport, EnrichedSpreadsheetRecord, SpreadsheetSummary},
    policy::{Operation, StageError, bounded},
};

/// Runs a full audit for one session.
///
/// Holds no per-request state; a single `Auditor` can serve any number of
/// concurrent audits.
#[derive(Debug, Clone)]
pub struct Auditor {
    api: Arc<dyn SpreadsheetApi>,
    enricher: Enricher,
    options: AuditOptions,
}

impl Auditor {
    pub fn new(api: Arc<dyn SpreadsheetApi>, options: AuditOptions) -> Self {
        Self {
            enricher: Enricher::new(api.clone(), &options),
            api,
            options,
        }
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Lists every visible spreadsheet and enriches each one.
    ///
    /// Always returns a well-formed report. A listing failure is the only
    /// outcome that turns the whole report into an error.
    #[instrument(skip_all, fields(fan_out = self.options.fan_out))]
    pub async fn run_audit(&self, session: &Session) -> AuditReport {
        let summaries = match self.list_all(session).await {
            Ok(summaries) => summaries,
            Err(e) => {
                error!(
                    operation = %e.operation,
                    policy = ?e.policy(),
                    error = %e.source,
                    "Failed to list spreadsheets"
                );
                return AuditReport::listing_failed();
            }
        };

        if summaries.is_empty() {
            info!("No spreadsheets found");
            return AuditReport::empty();
        }

        info!(count = summaries.len(), "Auditing spreadsheets");

        let enrichments: Vec<_> = summaries
            .iter()
            .map(|summary| self.enricher.enrich(session, summary))
            .collect();
        let spreadsheets: Vec<EnrichedSpreadsheetRecord> = stream::iter(enrichments)
            .buffered(self.options.fan_out.max(1))
        .collect()
        .await;

        let failed = spreadsheets
            .iter()
            .filter(|record| record.is_failed())
            .count();
        info!(
            audited = spreadsheets.len() - failed,
            failed, "Audit finished"
        );

        AuditReport::Spreadsheets { spreadsheets }
    }

    async fn list_all(&self, session: &Session) -> Result<Vec<SpreadsheetSummary>, StageError> {
        let mut summaries = Vec::new();
        let mut page_token: Option<String> = None;

        for page_number in 1..=self.options.max_list_pages.max(1) {
            let page = bounded(
                Operation::ListSpreadsheets,
                self.options.call_timeout(),
                self.api
                    .list_spreadsheet_files(session, page_token.as_deref()),
            )
            .await?;

            debug!(
                page = page_number,
                files = page.files.len(),
                has_more = page.next_page_token.is_some(),
                "Listed spreadsheet page"
            );

            summaries.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(summaries),
            }
        }

        debug!(
            max_list_pages = self.options.max_list_pages,
            "Stopped listing at page limit"
        );
        Ok(summaries)
    }
}
