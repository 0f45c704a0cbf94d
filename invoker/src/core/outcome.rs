//! Per-item outcomes and the aggregated run report.

use serde::{Deserialize, Serialize};

/// Error attached to a completed invocation that did not exit cleanly
/// (killed by a signal, timed out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// What the build tool reported for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Process exit code; 0 means success.
    pub exit_code: i32,
    pub execution_error: Option<ExecutionError>,
}

impl InvocationResult {
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            execution_error: None,
        }
    }

    pub fn exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            execution_error: None,
        }
    }
}

/// How one item ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success,
    NonZeroExit {
        exit_code: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_error: Option<ExecutionError>,
    },
    /// The build tool could not be started at all.
    LaunchFailure { message: String },
}

impl ItemOutcome {
    pub fn from_result(result: InvocationResult) -> Self {
        if result.exit_code == 0 {
            return Self::Success;
        }
        Self::NonZeroExit {
            exit_code: result.exit_code,
            execution_error: result.execution_error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    /// Zero-based position in the item list.
    pub index: usize,
    pub item: String,
    pub command_line: String,
    pub outcome: ItemOutcome,
    pub duration_ms: u64,
}

/// Ordered outcomes for every item of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// True when the run was skipped by configuration.
    #[serde(default)]
    pub skipped: bool,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|report| report.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|report| !report.outcome.is_success())
    }

    pub fn outcomes(&self) -> Vec<&ItemOutcome> {
        self.items.iter().map(|report| &report.outcome).collect()
    }
}
