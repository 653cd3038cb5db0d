//! Failure containment policy for each remote operation.
//!
//! The engine distinguishes four severities. Each [`Operation`] is bound to
//! exactly one [`FailurePolicy`]:
//!
//! | operation          | policy     |
//! |--------------------|------------|
//! | list spreadsheets  | `Escalate` |
//! | fetch structure    | `Isolate`  |
//! | list scripts       | `Isolate`  |
//! | list permissions   | `Isolate`  |
//! | check blank        | `FailOpen` |
//! | scan formulas      | `Degrade`  |

use std::{fmt, future::Future, time::Duration};

use crate::ApiError;

/// What a failed operation is allowed to affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The whole report becomes a failure.
    Escalate,
    /// Only the current spreadsheet's record becomes a failure.
    Isolate,
    /// The check answers its negative outcome and carries on.
    FailOpen,
    /// The finding is replaced by an empty result.
    Degrade,
}

/// A remote operation performed during an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListSpreadsheets,
    FetchStructure,
    ListScripts,
    ListPermissions,
    CheckBlank,
    ScanFormulas,
}

impl Operation {
    pub const fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::ListSpreadsheets => FailurePolicy::Escalate,
            Self::FetchStructure | Self::ListScripts | Self::ListPermissions => {
                FailurePolicy::Isolate
            }
            Self::CheckBlank => FailurePolicy::FailOpen,
            Self::ScanFormulas => FailurePolicy::Degrade,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListSpreadsheets => "list_spreadsheets",
            Self::FetchStructure => "fetch_structure",
            Self::ListScripts => "list_scripts",
            Self::ListPermissions => "list_permissions",
            Self::CheckBlank => "check_blank",
            Self::ScanFormulas => "scan_formulas",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {source}")]
pub struct StageError {
    pub operation: Operation,
    #[source]
    pub source: ApiError,
}

impl StageError {
    pub fn new(operation: Operation, source: ApiError) -> Self {
        Self { operation, source }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.operation.failure_policy()
    }
}

/// Runs one remote call under the per-call time budget.
///
/// An elapsed budget becomes [`ApiError::Timeout`], so callers handle it like
/// any other failure of `operation`.
pub(crate) async fn bounded<T, F>(
    operation: Operation,
    limit: Duration,
    call: F,
) -> Result<T, StageError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|source| StageError::new(operation, source)),
        Err(_) => Err(StageError::new(operation, ApiError::Timeout(limit))),
    }
}
