use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Result of one controller invocation for one rule.
///
/// `Deferred` counts as a success for the build as a whole: the rule did not
/// run this pass but has arranged for another pass to happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassOutcome {
    Success {
        /// Dependencies registered for the first time during this invocation.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        new_dependencies: Vec<Utf8PathBuf>,

        /// Set when the run succeeded with a caveat (e.g. missing output recovered).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,

        /// The trigger was touched so the driver schedules another pass.
        #[serde(default)]
        rerun_requested: bool,
    },
    Deferred {
        reason: String,
    },
    Failed {
        failure: FailureKind,
        reason: String,
    },
}

/// Why a rule failed for the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// A required upstream artifact is entirely absent.
    FatalPrecondition,
    /// The tool ran and exited nonzero; `status` is passed through verbatim.
    ToolExecution { status: i32 },
}

impl PassOutcome {
    pub fn success(new_dependencies: Vec<Utf8PathBuf>) -> Self {
        PassOutcome::Success {
            new_dependencies,
            reason: None,
            rerun_requested: false,
        }
    }

    /// Success that still needs another pass to settle.
    pub fn recovered(reason: impl Into<String>) -> Self {
        PassOutcome::Success {
            new_dependencies: Vec::new(),
            reason: Some(reason.into()),
            rerun_requested: true,
        }
    }

    /// Success without running anything (rule inactive for this document).
    pub fn skipped(reason: impl Into<String>) -> Self {
        PassOutcome::Success {
            new_dependencies: Vec::new(),
            reason: Some(reason.into()),
            rerun_requested: false,
        }
    }

    pub fn deferred(reason: impl Into<String>) -> Self {
        PassOutcome::Deferred {
            reason: reason.into(),
        }
    }

    pub fn fatal_precondition(reason: impl Into<String>) -> Self {
        PassOutcome::Failed {
            failure: FailureKind::FatalPrecondition,
            reason: reason.into(),
        }
    }

    pub fn tool_failed(status: i32) -> Self {
        PassOutcome::Failed {
            failure: FailureKind::ToolExecution { status },
            reason: format!("tool exited with status {status}"),
        }
    }

    /// True for `Success` and `Deferred`; the build keeps going.
    pub fn is_success(&self) -> bool {
        !matches!(self, PassOutcome::Failed { .. })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, PassOutcome::Deferred { .. })
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self {
            PassOutcome::Failed { failure, .. } => Some(*failure),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PassOutcome::Success { reason, .. } => reason.as_deref(),
            PassOutcome::Deferred { reason } | PassOutcome::Failed { reason, .. } => Some(reason),
        }
    }

    pub fn new_dependencies(&self) -> &[Utf8PathBuf] {
        match self {
            PassOutcome::Success {
                new_dependencies, ..
            } => new_dependencies,
            _ => &[],
        }
    }

    /// Whether the external driver should run another pass because of this outcome.
    pub fn requests_another_pass(&self) -> bool {
        match self {
            PassOutcome::Success {
                new_dependencies,
                rerun_requested,
                ..
            } => *rerun_requested || !new_dependencies.is_empty(),
            PassOutcome::Deferred { .. } => true,
            PassOutcome::Failed { .. } => false,
        }
    }

    /// Recommended process exit code.
    ///
    /// Tool failures pass the tool's status through; a fatal precondition maps to 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            PassOutcome::Success { .. } | PassOutcome::Deferred { .. } => 0,
            PassOutcome::Failed {
                failure: FailureKind::FatalPrecondition,
                ..
            } => 2,
            PassOutcome::Failed {
                failure: FailureKind::ToolExecution { status },
                ..
            } => {
                if *status == 0 {
                    1
                } else {
                    *status
                }
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PassOutcome::Success { .. } => "success",
            PassOutcome::Deferred { .. } => "deferred",
            PassOutcome::Failed { .. } => "failed",
        }
    }
}
