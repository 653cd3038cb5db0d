//! Request-scoped data model for the audit.
//!
//! Every value here is built fresh for one audit run and discarded once the
//! report has been returned.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Message returned when the listing call finds nothing to audit.
pub const NO_SPREADSHEETS_MESSAGE: &str = "No spreadsheets found.";

/// Report-level error when the initial listing call fails.
pub const LISTING_FAILED_MESSAGE: &str = "Failed to list spreadsheets";

/// Record-level error when the structural path of one spreadsheet fails.
pub const RECORD_FAILED_MESSAGE: &str = "Failed to process this spreadsheet";

/// Owner of a file as reported by the listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRef {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email_address: String,
}

/// One spreadsheet as returned by the listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub owners: Vec<OwnerRef>,
}

impl SpreadsheetSummary {
    /// Owner emails joined with `", "`. An owner without an address keeps an
    /// empty slot so the owner count stays visible.
    pub fn joined_owner_emails(&self) -> String {
        self.owners
            .iter()
            .map(|owner| owner.email_address.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One page of the spreadsheet listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetPage {
    pub files: Vec<SpreadsheetSummary>,
    pub next_page_token: Option<String>,
}

/// A child document (script project) attached to a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChildDocument {
    pub id: String,
    pub name: String,
}

/// A tab inside a spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetTab {
    pub title: String,
    pub sheet_id: i64,
    pub index: i64,
    pub row_count: i64,
    pub column_count: i64,
}

/// Structure of one tab, optionally with the formula source of every cell.
///
/// `formulas` is empty unless grid data was requested. Each inner vector is a
/// row; `None` marks a cell without a formula.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStructure {
    pub tab: SheetTab,
    pub formulas: Vec<Vec<Option<String>>>,
}

impl TabStructure {
    pub fn new(tab: SheetTab) -> Self {
        Self {
            tab,
            formulas: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_formulas(mut self, formulas: Vec<Vec<Option<String>>>) -> Self {
        self.formulas = formulas;
        self
    }
}

/// Rendered values of a tab, row by row.
pub type ValueGrid = Vec<Vec<serde_json::Value>>;

/// Principal kind of a permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    User,
    Group,
    Domain,
    Anyone,
}

/// Role granted by a permission.
///
/// Shared-drive roles are accepted so a listing never fails to decode, but
/// they are neither owners nor viewers for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PermissionRole {
    Owner,
    Organizer,
    FileOrganizer,
    Writer,
    Commenter,
    Reader,
}

/// An access-control grant on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: PermissionType,
    pub role: PermissionRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_file_discovery: Option<bool>,
}

impl PermissionEntry {
    /// Email of the grantee, if the provider disclosed a non-empty one.
    pub fn known_email(&self) -> Option<&str> {
        self.email_address
            .as_deref()
            .filter(|email| !email.trim().is_empty())
    }

    /// True for an `anyone` grant that is discoverable by search.
    pub fn is_public_discoverable(&self) -> bool {
        self.type_ == PermissionType::Anyone && self.allow_file_discovery == Some(true)
    }
}

/// A formula that pulls data from another spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalConnection {
    pub sheet_title: String,
    pub formula: String,
}

/// Successful enrichment of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditedSpreadsheet {
    pub name: String,
    pub id: String,
    pub sheet_count: usize,
    pub shared: bool,
    pub owners: String,
    pub appscript_present: bool,
    pub blank_sheets: Vec<String>,
    pub owner_emails: Vec<String>,
    pub viewer_emails: Vec<String>,
    pub public_view_allowed: bool,
    pub external_connections: Vec<ExternalConnection>,
}

/// Degraded record for a spreadsheet whose structural path failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FailedSpreadsheet {
    pub name: String,
    pub id: String,
    pub error: String,
}

/// Outcome for one spreadsheet. Exactly one variant is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EnrichedSpreadsheetRecord {
    Audited(AuditedSpreadsheet),
    Failed(FailedSpreadsheet),
}

impl EnrichedSpreadsheetRecord {
    pub(crate) fn failed(summary: &SpreadsheetSummary) -> Self {
        Self::Failed(FailedSpreadsheet {
            name: summary.name.clone(),
            id: summary.id.clone(),
            error: RECORD_FAILED_MESSAGE.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Audited(record) => &record.id,
            Self::Failed(record) => &record.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Audited(record) => &record.name,
            Self::Failed(record) => &record.name,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// The audit result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AuditReport {
    /// One record per listed spreadsheet, in listing order.
    Spreadsheets {
        spreadsheets: Vec<EnrichedSpreadsheetRecord>,
    },
    /// The listing succeeded but returned nothing.
    Empty { message: String },
    /// The listing itself failed.
    Failed { error: String },
}

impl AuditReport {
    pub fn empty() -> Self {
        Self::Empty {
            message: NO_SPREADSHEETS_MESSAGE.to_string(),
        }
    }

    pub fn listing_failed() -> Self {
        Self::Failed {
            error: LISTING_FAILED_MESSAGE.to_string(),
        }
    }

    /// True only for the report-level listing failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Records of the report; empty for the message and failure shapes.
    pub fn records(&self) -> &[EnrichedSpreadsheetRecord] {
        match self {
            Self::Spreadsheets { spreadsheets } => spreadsheets,
            Self::Empty { .. } | Self::Failed { .. } => &[],
        }
    }
}
