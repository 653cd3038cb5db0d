//! In-memory [`SpreadsheetApi`] used by the engine tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use serde_json::json;

use crate::{
    ApiError, Session, SpreadsheetApi,
    model::{
        ChildDocument, OwnerRef, PermissionEntry, PermissionRole, PermissionType, SheetTab,
        SpreadsheetPage, SpreadsheetSummary, TabStructure, ValueGrid,
    },
    policy::Operation,
};

pub(crate) fn session() -> Session {
    Session::new("test-token").unwrap()
}

pub(crate) fn permission(
    type_: PermissionType,
    role: PermissionRole,
    email: Option<&str>,
    allow_file_discovery: Option<bool>,
) -> PermissionEntry {
    PermissionEntry {
        id: format!("perm-{}", email.unwrap_or("anon")),
        type_,
        role,
        email_address: email.map(str::to_string),
        allow_file_discovery,
    }
}

fn injected(operation: Operation) -> ApiError {
    ApiError::Status {
        service: "Fake",
        status: 500,
        body: format!("injected {operation} failure"),
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTab {
    title: String,
    value_rows: usize,
    formulas: Vec<Vec<Option<String>>>,
    fail_values: bool,
    hang_values: bool,
}

impl FakeTab {
    pub(crate) fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn with_value_rows(mut self, rows: usize) -> Self {
        self.value_rows = rows;
        self
    }

    pub(crate) fn with_formulas(mut self, rows: Vec<Vec<Option<&str>>>) -> Self {
        self.formulas = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.map(str::to_string)).collect())
            .collect();
        self
    }

    pub(crate) fn failing_values(mut self) -> Self {
        self.fail_values = true;
        self
    }

    pub(crate) fn hanging_values(mut self) -> Self {
        self.hang_values = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSpreadsheet {
    name: String,
    shared: bool,
    owners: Vec<OwnerRef>,
    tabs: Vec<FakeTab>,
    scripts: usize,
    permissions: Vec<PermissionEntry>,
    failures: HashSet<Operation>,
    hangs: HashSet<Operation>,
    delay: Option<Duration>,
}

impl FakeSpreadsheet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub(crate) fn with_owner(mut self, email: &str) -> Self {
        self.shared = true;
        self.owners.push(OwnerRef {
            display_name: email.to_string(),
            email_address: email.to_string(),
        });
        self
    }

    pub(crate) fn with_tab(mut self, tab: FakeTab) -> Self {
        self.tabs.push(tab);
        self
    }

    pub(crate) fn with_scripts(mut self, count: usize) -> Self {
        self.scripts = count;
        self
    }

    pub(crate) fn with_permission(mut self, entry: PermissionEntry) -> Self {
        self.permissions.push(entry);
        self
    }

    pub(crate) fn failing(mut self, operation: Operation) -> Self {
        self.failures.insert(operation);
        self
    }

    pub(crate) fn hanging(mut self, operation: Operation) -> Self {
        self.hangs.insert(operation);
        self
    }

    /// Delays the structure fetch.
    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn tabs(&self) -> impl Iterator<Item = SheetTab> + '_ {
        self.tabs.iter().zip(0_i64..).map(|(tab, index)| SheetTab {
            title: tab.title.clone(),
            sheet_id: index * 100,
            index,
            row_count: 1000,
            column_count: 26,
        })
    }

    async fn gate(&self, operation: Operation) -> Result<(), ApiError> {
        if self.hangs.contains(&operation) {
            std::future::pending::<()>().await;
        }
        if self.failures.contains(&operation) {
            return Err(injected(operation));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    spreadsheets: Vec<(String, FakeSpreadsheet)>,
    page_size: Option<usize>,
    fail_listing: bool,
    hang_listing: bool,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_spreadsheet(mut self, id: &str, spreadsheet: FakeSpreadsheet) -> Self {
        self.spreadsheets.push((id.to_string(), spreadsheet));
        self
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn hanging_listing(mut self) -> Self {
        self.hang_listing = true;
        self
    }

    pub(crate) fn calls(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, operation: Operation) {
        *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    }

    fn spreadsheet(&self, id: &str) -> Result<&FakeSpreadsheet, ApiError> {
        self.spreadsheets
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, spreadsheet)| spreadsheet)
            .ok_or_else(|| ApiError::Status {
                service: "Fake",
                status: 404,
                body: format!("no spreadsheet {id}"),
            })
    }
}

#[async_trait]
impl SpreadsheetApi for FakeApi {
    async fn list_spreadsheet_files(
        &self,
        _session: &Session,
        page_token: Option<&str>,
    ) -> Result<SpreadsheetPage, ApiError> {
        self.record(Operation::ListSpreadsheets);
        if self.hang_listing {
            std::future::pending::<()>().await;
        }
        if self.fail_listing {
            return Err(injected(Operation::ListSpreadsheets));
        }

        let start: usize = page_token
            .map(str::parse::<usize>)
            .transpose()
            .map_err(|_| ApiError::InvalidRequest("bad page token".to_string()))?
            .unwrap_or(0);
        let page_size = self.page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(page_size).min(self.spreadsheets.len());

        let files = self.spreadsheets[start..end]
            .iter()
            .map(|(id, spreadsheet)| SpreadsheetSummary {
                id: id.clone(),
                name: if spreadsheet.name.is_empty() {
                    id.clone()
                } else {
                    spreadsheet.name.clone()
                },
                shared: spreadsheet.shared,
                owners: spreadsheet.owners.clone(),
            })
            .collect();
        let next_page_token = (end < self.spreadsheets.len()).then(|| end.to_string());

        Ok(SpreadsheetPage {
            files,
            next_page_token,
        })
    }

    async fn list_child_documents(
        &self,
        _session: &Session,
        parent_id: &str,
        _mime_type: &str,
    ) -> Result<Vec<ChildDocument>, ApiError> {
        self.record(Operation::ListScripts);
        let spreadsheet = self.spreadsheet(parent_id)?;
        spreadsheet.gate(Operation::ListScripts).await?;

        Ok((0..spreadsheet.scripts)
            .map(|i| ChildDocument {
                id: format!("{parent_id}-script-{i}"),
                name: format!("Script {i}"),
            })
            .collect())
    }

    async fn get_spreadsheet_structure(
        &self,
        _session: &Session,
        spreadsheet_id: &str,
        include_grid_data: bool,
    ) -> Result<Vec<TabStructure>, ApiError> {
        let operation = if include_grid_data {
            Operation::ScanFormulas
        } else {
            Operation::FetchStructure
        };
        self.record(operation);
        let spreadsheet = self.spreadsheet(spreadsheet_id)?;
        if !include_grid_data && let Some(delay) = spreadsheet.delay {
            tokio::time::sleep(delay).await;
        }
        spreadsheet.gate(operation).await?;

        Ok(spreadsheet
            .tabs()
            .zip(&spreadsheet.tabs)
            .map(|(tab, fake)| {
                let structure = TabStructure::new(tab);
                if include_grid_data {
                    structure.with_formulas(fake.formulas.clone())
                } else {
                    structure
                }
            })
            .collect())
    }

    async fn get_tab_values(
        &self,
        _session: &Session,
        spreadsheet_id: &str,
        tab_title: &str,
    ) -> Result<ValueGrid, ApiError> {
        self.record(Operation::CheckBlank);
        let spreadsheet = self.spreadsheet(spreadsheet_id)?;
        let tab = spreadsheet
            .tabs
            .iter()
            .find(|tab| tab.title == tab_title)
            .ok_or_else(|| ApiError::Status {
                service: "Fake",
                status: 400,
                body: format!("Unable to parse range: {tab_title}"),
            })?;

        if tab.hang_values {
            std::future::pending::<()>().await;
        }
        if tab.fail_values {
            return Err(injected(Operation::CheckBlank));
        }

        Ok((0..tab.value_rows)
            .map(|row| vec![json!(format!("r{row}"))])
            .collect())
    }

    async fn list_permissions(
        &self,
        _session: &Session,
        file_id: &str,
    ) -> Result<Vec<PermissionEntry>, ApiError> {
        self.record(Operation::ListPermissions);
        let spreadsheet = self.spreadsheet(file_id)?;
        spreadsheet.gate(Operation::ListPermissions).await?;
        Ok(spreadsheet.permissions.clone())
    }
}
