//! Per-spreadsheet enrichment pipeline.
//!
//! Each spreadsheet is driven through an explicit [`EnrichmentState`]
//! machine:
//!
//! ```text
//! Pending ──fetch structure──▶ StructureFetched ──fan-out──▶ Enriching ──▶ Done
//!    │                               │
//!    └──────────────▶ Failed ◀───────┘
//! ```
//!
//! Only the structural path (structure, scripts, permissions) can move a
//! task to `Failed`. Blank checks fail open and the formula scan degrades to
//! an empty list.

use std::{mem, sync::Arc, time::Duration};

use tracing::{debug, instrument, warn};

use crate::{
    AuditOptions, SCRIPT_MIME_TYPE, Session, SheetInspector, SpreadsheetApi,
    inspector::scan_external_connections,
    model::{
        AuditedSpreadsheet, EnrichedSpreadsheetRecord, ExternalConnection, PermissionEntry,
        PermissionRole, SheetTab, SpreadsheetSummary,
    },
    policy::{Operation, StageError, bounded},
};

/// Access exposure derived from a file's permission list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSummary {
    pub owner_emails: Vec<String>,
    pub viewer_emails: Vec<String>,
    pub public_view_allowed: bool,
}

impl AccessSummary {
    /// Classifies permissions by role.
    ///
    /// Owners and readers are only listed when the provider disclosed an
    /// email. Writers, commenters and shared-drive roles are neither.
    pub fn from_permissions(permissions: &[PermissionEntry]) -> Self {
        let emails_with_role = |role: PermissionRole| {
            permissions
                .iter()
                .filter(|entry| entry.role == role)
                .filter_map(PermissionEntry::known_email)
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        Self {
            owner_emails: emails_with_role(PermissionRole::Owner),
            viewer_emails: emails_with_role(PermissionRole::Reader),
            public_view_allowed: permissions
                .iter()
                .any(PermissionEntry::is_public_discoverable),
        }
    }
}

/// Everything gathered after the structure fetch succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub appscript_present: bool,
    pub blank_sheets: Vec<String>,
    pub access: AccessSummary,
    pub external_connections: Vec<ExternalConnection>,
}

/// State of one spreadsheet's enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentState {
    Pending,
    StructureFetched {
        tabs: Vec<SheetTab>,
    },
    Enriching {
        tabs: Vec<SheetTab>,
        findings: Findings,
    },
    Done(AuditedSpreadsheet),
    Failed(StageError),
}

impl EnrichmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::StructureFetched { .. } => "structure_fetched",
            Self::Enriching { .. } => "enriching",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Drives one spreadsheet through its [`EnrichmentState`] machine.
#[derive(Debug)]
pub struct EnrichmentTask<'a> {
    enricher: &'a Enricher,
    session: &'a Session,
    summary: &'a SpreadsheetSummary,
    state: EnrichmentState,
}

impl EnrichmentTask<'_> {
    pub fn state(&self) -> &EnrichmentState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Performs one transition. Terminal states are left unchanged.
    pub async fn step(&mut self) {
        let current = mem::replace(&mut self.state, EnrichmentState::Pending);
        let from = current.name();

        self.state = match current {
            EnrichmentState::Pending => self.fetch_structure().await,
            EnrichmentState::StructureFetched { tabs } => self.gather_findings(tabs).await,
            EnrichmentState::Enriching { tabs, findings } => {
                EnrichmentState::Done(self.assemble(&tabs, findings))
            }
            terminal @ (EnrichmentState::Done(_) | EnrichmentState::Failed(_)) => terminal,
        };

        debug!(
            spreadsheet_id = %self.summary.id,
            from,
            to = self.state.name(),
            "Enrichment step"
        );
    }

    /// Steps until a terminal state and converts it into a record.
    pub async fn run(mut self) -> EnrichedSpreadsheetRecord {
        while !self.is_terminal() {
            self.step().await;
        }

        match self.state {
            EnrichmentState::Done(record) => EnrichedSpreadsheetRecord::Audited(record),
            _ => EnrichedSpreadsheetRecord::failed(self.summary),
        }
    }

    async fn fetch_structure(&self) -> EnrichmentState {
        let enricher = self.enricher;
        let result = bounded(
            Operation::FetchStructure,
            enricher.call_timeout,
            enricher
                .api
                .get_spreadsheet_structure(self.session, &self.summary.id, false),
        )
        .await;

        match result {
            Ok(structure) => EnrichmentState::StructureFetched {
                tabs: structure.into_iter().map(|s| s.tab).collect(),
            },
            Err(e) => self.fail(e),
        }
    }

    async fn gather_findings(&self, tabs: Vec<SheetTab>) -> EnrichmentState {
        let enricher = self.enricher;
        let session = self.session;
        let id = self.summary.id.as_str();

        let scripts = bounded(
            Operation::ListScripts,
            enricher.call_timeout,
            enricher
                .api
                .list_child_documents(session, id, SCRIPT_MIME_TYPE),
        );
        let blanks = enricher.inspector.blank_tabs(session, id, &tabs);
        let permissions = bounded(
            Operation::ListPermissions,
            enricher.call_timeout,
            enricher.api.list_permissions(session, id),
        );
        let formulas = self.external_connections();

        let (scripts, blank_sheets, permissions, external_connections) =
            futures::join!(scripts, blanks, permissions, formulas);

        let scripts = match scripts {
            Ok(scripts) => scripts,
            Err(e) => return self.fail(e),
        };
        let permissions = match permissions {
            Ok(permissions) => permissions,
            Err(e) => return self.fail(e),
        };

        EnrichmentState::Enriching {
            tabs,
            findings: Findings {
                appscript_present: !scripts.is_empty(),
                blank_sheets,
                access: AccessSummary::from_permissions(&permissions),
                external_connections,
            },
        }
    }

    async fn external_connections(&self) -> Vec<ExternalConnection> {
        let enricher = self.enricher;
        let result = bounded(
            Operation::ScanFormulas,
            enricher.call_timeout,
            enricher
                .api
                .get_spreadsheet_structure(self.session, &self.summary.id, true),
        )
        .await;

        match result {
            Ok(structure) => scan_external_connections(&structure),
            Err(e) => {
                warn!(
                    spreadsheet_id = %self.summary.id,
                    operation = %e.operation,
                    policy = ?e.policy(),
                    error = %e.source,
                    "Formula scan failed, reporting no external connections"
                );
                Vec::new()
            }
        }
    }

    fn assemble(&self, tabs: &[SheetTab], findings: Findings) -> AuditedSpreadsheet {
        let summary = self.summary;
        AuditedSpreadsheet {
            name: summary.name.clone(),
            id: summary.id.clone(),
            sheet_count: tabs.len(),
            shared: summary.shared,
            owners: summary.joined_owner_emails(),
            appscript_present: findings.appscript_present,
            blank_sheets: findings.blank_sheets,
            owner_emails: findings.access.owner_emails,
            viewer_emails: findings.access.viewer_emails,
            public_view_allowed: findings.access.public_view_allowed,
            external_connections: findings.external_connections,
        }
    }

    fn fail(&self, error: StageError) -> EnrichmentState {
        warn!(
            spreadsheet_id = %self.summary.id,
            spreadsheet_name = %self.summary.name,
            operation = %error.operation,
            policy = ?error.policy(),
            error = %error.source,
            "Spreadsheet enrichment failed"
        );
        EnrichmentState::Failed(error)
    }
}

/// Enriches one spreadsheet at a time.
#[derive(Debug, Clone)]
pub struct Enricher {
    api: Arc<dyn SpreadsheetApi>,
    inspector: SheetInspector,
    call_timeout: Duration,
}

impl Enricher {
    pub fn new(api: Arc<dyn SpreadsheetApi>, options: &AuditOptions) -> Self {
        Self {
            inspector: SheetInspector::new(api.clone(), options),
            api,
            call_timeout: options.call_timeout(),
        }
    }

    /// Creates a task in the `Pending` state without doing any I/O.
    pub fn task<'a>(
        &'a self,
        session: &'a Session,
        summary: &'a SpreadsheetSummary,
    ) -> EnrichmentTask<'a> {
        EnrichmentTask {
            enricher: self,
            session,
            summary,
            state: EnrichmentState::Pending,
        }
    }

    /// Runs the full pipeline for `summary`. Never fails; structural errors
    /// produce the failure variant.
    #[instrument(
        skip_all,
        fields(spreadsheet_id = %summary.id, spreadsheet_name = %summary.name)
    )]
    pub async fn enrich(
        &self,
        session: &Session,
        summary: &SpreadsheetSummary,
    ) -> EnrichedSpreadsheetRecord {
        self.task(session, summary).run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ApiError, FailurePolicy, PermissionType,
        testing::{FakeApi, FakeSpreadsheet, FakeTab, permission, session},
    };

    fn summary(id: &str, name: &str) -> SpreadsheetSummary {
        SpreadsheetSummary {
            id: id.to_string(),
            name: name.to_string(),
            shared: true,
            owners: vec![crate::OwnerRef {
                display_name: "Alice".to_string(),
                email_address: "alice@example.com".to_string(),
            }],
        }
    }

    fn enricher(api: FakeApi) -> (Arc<FakeApi>, Enricher) {
        let api = Arc::new(api);
        let enricher = Enricher::new(api.clone(), &AuditOptions::default());
        (api, enricher)
    }

    fn budget_spreadsheet() -> FakeSpreadsheet {
        FakeSpreadsheet::new()
            .with_tab(FakeTab::new("Summary").with_value_rows(4))
            .with_tab(FakeTab::new("Scratch"))
            .with_tab(
                FakeTab::new("Data")
                    .with_value_rows(10)
                    .with_formulas(vec![vec![
                        Some("=IMPORTRANGE(\"url\",\"Sheet1!A:B\")"),
                        Some("=SUM(A1:A2)"),
                    ]]),
            )
            .with_scripts(1)
            .with_permission(permission(
                PermissionType::User,
                PermissionRole::Owner,
                Some("alice@example.com"),
                None,
            ))
            .with_permission(permission(
                PermissionType::User,
                PermissionRole::Reader,
                Some("bob@example.com"),
                None,
            ))
            .with_permission(permission(
                PermissionType::User,
                PermissionRole::Writer,
                Some("carol@example.com"),
                None,
            ))
    }

    #[test]
    fn test_access_summary_classifies_roles() {
        let access = AccessSummary::from_permissions(&[
            permission(
                PermissionType::User,
                PermissionRole::Owner,
                Some("owner@example.com"),
                None,
            ),
            permission(
                PermissionType::User,
                PermissionRole::Reader,
                Some("reader@example.com"),
                None,
            ),
            permission(
                PermissionType::Domain,
                PermissionRole::Reader,
                None,
                Some(false),
            ),
            permission(
                PermissionType::User,
                PermissionRole::Commenter,
                Some("commenter@example.com"),
                None,
            ),
            permission(
                PermissionType::User,
                PermissionRole::FileOrganizer,
                Some("organizer@example.com"),
                None,
            ),
        ]);

        assert_eq!(access.owner_emails, vec!["owner@example.com".to_string()]);
        assert_eq!(access.viewer_emails, vec!["reader@example.com".to_string()]);
        assert!(!access.public_view_allowed);
    }

    #[test]
    fn test_public_view_requires_discoverable_anyone_grant() {
        let link_only = permission(
            PermissionType::Anyone,
            PermissionRole::Reader,
            None,
            Some(false),
        );
        assert!(!AccessSummary::from_permissions(&[link_only.clone()]).public_view_allowed);

        let discoverable = permission(
            PermissionType::Anyone,
            PermissionRole::Reader,
            None,
            Some(true),
        );
        assert!(AccessSummary::from_permissions(&[link_only, discoverable]).public_view_allowed);

        let domain = permission(
            PermissionType::Domain,
            PermissionRole::Reader,
            None,
            Some(true),
        );
        assert!(!AccessSummary::from_permissions(&[domain]).public_view_allowed);
    }

    #[tokio::test]
    async fn test_enrich_builds_full_record() {
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet("s1", budget_spreadsheet()));

        let record = enricher.enrich(&session(), &summary("s1", "Budget")).await;

        let EnrichedSpreadsheetRecord::Audited(record) = record else {
            panic!("expected audited record, got {record:?}");
        };
        assert_eq!(record.name, "Budget");
        assert_eq!(record.id, "s1");
        assert_eq!(record.sheet_count, 3);
        assert!(record.shared);
        assert_eq!(record.owners, "alice@example.com");
        assert!(record.appscript_present);
        assert_eq!(record.blank_sheets, vec!["Scratch".to_string()]);
        assert_eq!(record.owner_emails, vec!["alice@example.com".to_string()]);
        assert_eq!(record.viewer_emails, vec!["bob@example.com".to_string()]);
        assert!(!record.public_view_allowed);
        assert_eq!(
            record.external_connections,
            vec![ExternalConnection {
                sheet_title: "Data".to_string(),
                formula: "=IMPORTRANGE(\"url\",\"Sheet1!A:B\")".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_step_walks_states_in_order() {
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet("s1", budget_spreadsheet()));
        let session = session();
        let summary = summary("s1", "Budget");
        let mut task = enricher.task(&session, &summary);

        assert_eq!(task.state(), &EnrichmentState::Pending);

        task.step().await;
        let EnrichmentState::StructureFetched { tabs } = task.state() else {
            panic!("expected StructureFetched, got {:?}", task.state());
        };
        assert_eq!(tabs.len(), 3);

        task.step().await;
        let EnrichmentState::Enriching { findings, .. } = task.state() else {
            panic!("expected Enriching, got {:?}", task.state());
        };
        assert!(findings.appscript_present);

        task.step().await;
        assert!(matches!(task.state(), EnrichmentState::Done(_)));
        assert!(task.is_terminal());

        task.step().await;
        assert!(matches!(task.state(), EnrichmentState::Done(_)));
    }

    #[tokio::test]
    async fn test_structure_failure_yields_failed_record() {
        let (api, enricher) = enricher(FakeApi::new().with_spreadsheet(
            "s1",
            budget_spreadsheet().failing(Operation::FetchStructure),
        ));
        let session = session();
        let summary = summary("s1", "Budget");
        let mut task = enricher.task(&session, &summary);

        task.step().await;
        let EnrichmentState::Failed(error) = task.state() else {
            panic!("expected Failed, got {:?}", task.state());
        };
        assert_eq!(error.operation, Operation::FetchStructure);
        assert_eq!(error.policy(), FailurePolicy::Isolate);

        let record = task.run().await;
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "name": "Budget",
                "id": "s1",
                "error": "Failed to process this spreadsheet",
            })
        );
        assert_eq!(api.calls(Operation::ListScripts), 0);
    }

    #[tokio::test]
    async fn test_script_listing_failure_is_structural() {
        let (_, enricher) = enricher(
            FakeApi::new()
                .with_spreadsheet("s1", budget_spreadsheet().failing(Operation::ListScripts)),
        );

        let record = enricher.enrich(&session(), &summary("s1", "Budget")).await;
        assert!(record.is_failed());
    }

    #[tokio::test]
    async fn test_permission_failure_is_structural() {
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet(
            "s1",
            budget_spreadsheet().failing(Operation::ListPermissions),
        ));

        let record = enricher.enrich(&session(), &summary("s1", "Budget")).await;
        assert!(record.is_failed());
    }

    #[tokio::test]
    async fn test_formula_scan_failure_degrades_to_empty() {
        let (_, enricher) = enricher(
            FakeApi::new()
                .with_spreadsheet("s1", budget_spreadsheet().failing(Operation::ScanFormulas)),
        );

        let record = enricher.enrich(&session(), &summary("s1", "Budget")).await;
        let EnrichedSpreadsheetRecord::Audited(record) = record else {
            panic!("expected audited record, got {record:?}");
        };
        assert!(record.external_connections.is_empty());
        assert_eq!(record.sheet_count, 3);
    }

    #[tokio::test]
    async fn test_failing_blank_check_only_drops_that_tab() {
        let spreadsheet = FakeSpreadsheet::new()
            .with_tab(FakeTab::new("Empty One"))
            .with_tab(FakeTab::new("Broken").failing_values())
            .with_tab(FakeTab::new("Empty Two"));
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet("s1", spreadsheet));

        let record = enricher.enrich(&session(), &summary("s1", "Tabs")).await;
        let EnrichedSpreadsheetRecord::Audited(record) = record else {
            panic!("expected audited record, got {record:?}");
        };
        assert_eq!(
            record.blank_sheets,
            vec!["Empty One".to_string(), "Empty Two".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_structure_timeout_behaves_like_failure() {
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet(
            "s1",
            budget_spreadsheet().hanging(Operation::FetchStructure),
        ));
        let session = session();
        let summary = summary("s1", "Budget");
        let mut task = enricher.task(&session, &summary);

        task.step().await;
        let EnrichmentState::Failed(error) = task.state() else {
            panic!("expected Failed, got {:?}", task.state());
        };
        assert!(matches!(error.source, ApiError::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_formula_scan_timeout_degrades() {
        let (_, enricher) = enricher(
            FakeApi::new()
                .with_spreadsheet("s1", budget_spreadsheet().hanging(Operation::ScanFormulas)),
        );

        let record = enricher.enrich(&session(), &summary("s1", "Budget")).await;
        let EnrichedSpreadsheetRecord::Audited(record) = record else {
            panic!("expected audited record, got {record:?}");
        };
        assert!(record.external_connections.is_empty());
    }

    #[tokio::test]
    async fn test_formula_that_renders_nothing_is_blank_and_connected() {
        let spreadsheet = FakeSpreadsheet::new().with_tab(
            FakeTab::new("Import")
                .with_formulas(vec![vec![Some("=IMPORTRANGE(\"url\",\"A1:A1\")")]]),
        );
        let (_, enricher) = enricher(FakeApi::new().with_spreadsheet("s1", spreadsheet));

        let record = enricher.enrich(&session(), &summary("s1", "Import")).await;
        let EnrichedSpreadsheetRecord::Audited(record) = record else {
            panic!("expected audited record, got {record:?}");
        };
        assert_eq!(record.blank_sheets, vec!["Import".to_string()]);
        assert_eq!(record.external_connections.len(), 1);
    }
}
