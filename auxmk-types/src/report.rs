use crate::outcome::PassOutcome;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Summary of one pass over all active rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub pass: u32,

    #[serde(default)]
    pub run: RunInfo,

    #[serde(default)]
    pub rules: Vec<RuleOutcome>,

    /// True when any rule deferred, recovered, or registered a new dependency.
    pub another_pass_needed: bool,
}

impl PassReport {
    pub fn new(tool: ToolInfo, pass: u32) -> Self {
        Self {
            schema: crate::schema::AUXMK_PASS_V1.to_string(),
            tool,
            pass,
            run: RunInfo::default(),
            rules: vec![],
            another_pass_needed: false,
        }
    }

    pub fn push(&mut self, rule: impl Into<String>, outcome: PassOutcome) {
        self.another_pass_needed |= outcome.requests_another_pass();
        self.rules.push(RuleOutcome {
            rule: rule.into(),
            outcome,
        });
    }

    /// Failures, in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.rules.iter().filter(|r| !r.outcome.is_success())
    }

    /// Exit code of the first failing rule, or 0.
    pub fn exit_code(&self) -> i32 {
        self.failures()
            .next()
            .map(|r| r.outcome.exit_code())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub outcome: PassOutcome,
}

/// On-disk form of the build system's tracked-file set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFiles {
    pub schema: String,

    #[serde(default)]
    pub paths: BTreeSet<Utf8PathBuf>,
}

impl Default for TrackedFiles {
    fn default() -> Self {
        Self {
            schema: crate::schema::AUXMK_TRACKED_V1.to_string(),
            paths: BTreeSet::new(),
        }
    }
}
