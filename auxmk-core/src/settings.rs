//! Clap-free settings for configuring a build session and running passes.

use auxmk_domain::{ScanPolicy, TriggerPattern};
use auxmk_status::DEFAULT_MARKER;
use camino::Utf8PathBuf;

/// Job name used when neither a job nor a primary file is known.
pub const DEFAULT_JOB: &str = "main";

/// Settings for a build session.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub project_root: Utf8PathBuf,

    /// Primary document, relative to `project_root`. `None` when unknown.
    pub main: Option<Utf8PathBuf>,
    /// Job name; defaults to the primary file's stem.
    pub job: Option<String>,

    // Scanning
    pub scan_policy: ScanPolicy,

    // Status files
    pub status_marker: String,

    /// Registered after the built-in catalog, so same-named entries replace built-ins.
    pub rules: Vec<RuleSettings>,

    // Persistence
    pub state_dir: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            main: None,
            job: None,
            scan_policy: ScanPolicy::default(),
            status_marker: DEFAULT_MARKER.to_string(),
            rules: Vec::new(),
            state_dir: Utf8PathBuf::from(".auxmk"),
            out_dir: Utf8PathBuf::from(".auxmk"),
        }
    }
}

impl RunSettings {
    /// Explicit job, else the primary file's stem, else [`DEFAULT_JOB`].
    pub fn job_name(&self) -> String {
        self.job
            .clone()
            .or_else(|| {
                self.main
                    .as_ref()
                    .and_then(|m| m.file_stem())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEFAULT_JOB.to_string())
    }
}

/// A rule override or additional rule.
///
/// Unset fields fall back to the built-in rule of the same name. `{job}` in
/// paths and command arguments is replaced by the job name. An empty `gate`
/// removes the built-in gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSettings {
    pub name: String,
    pub trigger: Option<String>,
    pub output: Option<String>,
    pub gate: Option<String>,
    pub command: Option<Vec<String>>,
    pub patterns: Option<Vec<TriggerPattern>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_prefers_explicit_then_main_stem() {
        let mut s = RunSettings::default();
        assert_eq!(s.job_name(), "main");

        s.main = Some(Utf8PathBuf::from("thesis/notes.tex"));
        assert_eq!(s.job_name(), "notes");

        s.job = Some("final".to_string());
        assert_eq!(s.job_name(), "final");
    }
}
