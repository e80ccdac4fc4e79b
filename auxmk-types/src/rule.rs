use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Serializable description of a build rule (everything except its action).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Tool identity, e.g. "pythontex".
    pub name: String,

    /// File whose modification time governs whether the rule must run.
    pub trigger: Utf8PathBuf,

    /// File the tool is expected to produce.
    pub output: Utf8PathBuf,

    /// Rule whose output must be present and stable before this one runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

impl RuleSpec {
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            trigger: trigger.into(),
            output: output.into(),
            gate: None,
        }
    }

    pub fn gated_by(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }
}
