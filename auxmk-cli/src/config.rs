//! Configuration file loading for auxmk.
//!
//! Discovers and loads `auxmk.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use auxmk_core::settings::{RuleSettings, RunSettings};
use auxmk_domain::{ScanPolicy, TriggerPattern};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "auxmk.toml";

/// Top-level configuration from auxmk.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuxmkConfig {
    /// Where the persisted tracked-dependency set lives.
    pub state_dir: Option<Utf8PathBuf>,

    pub project: ProjectConfig,

    pub scan: ScanConfig,

    pub status: StatusConfig,

    /// Rule overrides and additional rules, keyed by rule name.
    pub rules: BTreeMap<String, RuleConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Primary document, relative to the project root.
    pub main: Option<Utf8PathBuf>,

    /// Job name (defaults to the primary file's stem).
    pub job: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// What to assume when the primary file is unknown.
    pub policy: Option<ScanPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Status-line marker, e.g. `\XSIM`.
    pub marker: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub trigger: Option<String>,
    pub output: Option<String>,
    /// Gating rule; an empty string removes a built-in gate.
    pub gate: Option<String>,
    pub command: Option<Vec<String>>,
    pub patterns: Option<Vec<TriggerPattern>>,
}

/// Discover the auxmk.toml config file.
///
/// Returns `None` if no config file is found in the project root.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an auxmk.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<AuxmkConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<AuxmkConfig> {
    let config: AuxmkConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<AuxmkConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(AuxmkConfig::default()),
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub main: Option<Utf8PathBuf>,
    pub job: Option<String>,
    pub policy: Option<ScanPolicy>,
    pub out_dir: Option<Utf8PathBuf>,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: AuxmkConfig,
}

impl ConfigMerger {
    pub fn new(config: AuxmkConfig) -> Self {
        Self { config }
    }

    /// Produce run settings. CLI values win; unset values fall back to the
    /// config file, then to [`RunSettings::default`].
    pub fn merge(self, project_root: Utf8PathBuf, cli: &CliOverrides) -> RunSettings {
        let defaults = RunSettings::default();
        let state_dir = self.config.state_dir.unwrap_or(defaults.state_dir);
        // Relative paths resolve against the project root, not the cwd.
        let out_dir = match &cli.out_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => project_root.join(dir),
            None => project_root.join(&state_dir),
        };

        let rules = self
            .config
            .rules
            .into_iter()
            .map(|(name, r)| RuleSettings {
                name,
                trigger: r.trigger,
                output: r.output,
                gate: r.gate,
                command: r.command,
                patterns: r.patterns,
            })
            .collect();

        RunSettings {
            main: cli.main.clone().or(self.config.project.main),
            job: cli.job.clone().or(self.config.project.job),
            scan_policy: cli
                .policy
                .or(self.config.scan.policy)
                .unwrap_or(defaults.scan_policy),
            status_marker: self
                .config
                .status
                .marker
                .unwrap_or(defaults.status_marker),
            rules,
            state_dir,
            out_dir,
            project_root,
        }
    }
}
