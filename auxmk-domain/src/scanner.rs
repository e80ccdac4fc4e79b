//! Static inspection of the document source.
//!
//! Decides whether an auxiliary tool is needed at all by looking for named
//! trigger patterns in the primary file and everything it includes.
//!
//! ## Design notes
//!
//! - Inclusion is followed with an explicit work list and a visited set, so
//!   self- or mutually-including files terminate and deep inclusion graphs do
//!   not grow the call stack.
//! - TeX comments are stripped before matching; `\%` is not a comment.
//! - A missing included file is skipped. A missing or unknown *entry* file is
//!   decided by [`ScanPolicy`].

use crate::ports::SourceView;
use crate::registry::{RegistryError, RuleRegistry};
use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// What to conclude when the primary file cannot be determined or read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// Assume the tool is needed.
    #[default]
    FailOpen,
    /// Assume the tool is not needed.
    FailClosed,
}

impl ScanPolicy {
    pub fn verdict_for_unknown_entry(self) -> bool {
        matches!(self, ScanPolicy::FailOpen)
    }
}

/// Named source patterns that mark a tool as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerPattern {
    /// `\usepackage{pythontex}` (possibly among other packages).
    PythontexPackage,
    /// `\begin{pycode}` and friends.
    PythontexEnvironment,
    /// `\py{..}`, `\pyc{..}`, `\sympy{..}` and friends.
    PythontexInlineCommand,
    /// `\usepackage{xsim}`.
    XsimPackage,
    /// `\begin{exercise}` / `\begin{solution}`.
    ExerciseEnvironment,
}

static PYTHONTEX_PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\usepackage\s*(?:\[[^\]]*\])?\s*\{[^}]*\bpythontex\b[^}]*\}")
        .expect("valid regex")
});
static PYTHONTEX_ENV_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\\begin\s*\{(?:pycode|pyblock|pysub|pyverbatim|pyconsole|pycell|sympycode|sympyblock|pylabcode|pylabblock)\}",
    )
    .expect("valid regex")
});
static PYTHONTEX_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:py|sympy|pylab)[cbsv]?\s*\{").expect("valid regex")
});
static XSIM_PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\usepackage\s*(?:\[[^\]]*\])?\s*\{[^}]*\bxsim\b[^}]*\}").expect("valid regex")
});
static EXERCISE_ENV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\begin\s*\{(?:exercise|solution)\}").expect("valid regex"));
static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:input|include|subfile)\s*\{([^}]+)\}").expect("valid regex")
});

impl TriggerPattern {
    pub const ALL: &'static [TriggerPattern] = &[
        TriggerPattern::PythontexPackage,
        TriggerPattern::PythontexEnvironment,
        TriggerPattern::PythontexInlineCommand,
        TriggerPattern::XsimPackage,
        TriggerPattern::ExerciseEnvironment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TriggerPattern::PythontexPackage => "pythontex-package",
            TriggerPattern::PythontexEnvironment => "pythontex-environment",
            TriggerPattern::PythontexInlineCommand => "pythontex-inline-command",
            TriggerPattern::XsimPackage => "xsim-package",
            TriggerPattern::ExerciseEnvironment => "exercise-environment",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    fn regex(self) -> &'static Regex {
        match self {
            TriggerPattern::PythontexPackage => &PYTHONTEX_PACKAGE_RE,
            TriggerPattern::PythontexEnvironment => &PYTHONTEX_ENV_RE,
            TriggerPattern::PythontexInlineCommand => &PYTHONTEX_INLINE_RE,
            TriggerPattern::XsimPackage => &XSIM_PACKAGE_RE,
            TriggerPattern::ExerciseEnvironment => &EXERCISE_ENV_RE,
        }
    }

    pub fn matches(self, line: &str) -> bool {
        self.regex().is_match(line)
    }
}

/// Work-list scanner over one source tree.
///
/// The visited set persists across [`SourceScanner::scan`] calls, so a file
/// is read at most once per scanner.
pub struct SourceScanner<'a> {
    view: &'a dyn SourceView,
    patterns: &'a [TriggerPattern],
    visited: BTreeSet<Utf8PathBuf>,
}

impl<'a> SourceScanner<'a> {
    pub fn new(view: &'a dyn SourceView, patterns: &'a [TriggerPattern]) -> Self {
        Self {
            view,
            patterns,
            visited: BTreeSet::new(),
        }
    }

    pub fn visited(&self) -> &BTreeSet<Utf8PathBuf> {
        &self.visited
    }

    /// True if `entry` or any file it includes matches one of the patterns.
    pub fn scan(&mut self, entry: &Utf8Path) -> bool {
        let mut work = vec![entry.to_path_buf()];

        while let Some(path) = work.pop() {
            if !self.visited.insert(path.clone()) {
                debug!(path = %path, "already scanned");
                continue;
            }
            let contents = match self.view.read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    debug!(path = %path, error = %e, "skipping unreadable source");
                    continue;
                }
            };

            let mut includes = Vec::new();
            for line in contents.lines() {
                let line = strip_comment(line);
                if let Some(p) = self.patterns.iter().find(|p| p.matches(line)) {
                    debug!(path = %path, pattern = p.name(), "trigger pattern found");
                    return true;
                }
                includes.extend(
                    INCLUDE_RE
                        .captures_iter(line)
                        .map(|cap| include_path(&cap[1])),
                );
            }
            // Reversed so the first inclusion is scanned next.
            work.extend(includes.into_iter().rev());
        }

        false
    }
}

/// Decide whether a tool is needed, applying `policy` when the entry is unknown or unreadable.
pub fn scan_for_trigger(
    view: &dyn SourceView,
    entry: Option<&Utf8Path>,
    patterns: &[TriggerPattern],
    policy: ScanPolicy,
) -> bool {
    let Some(entry) = entry else {
        debug!(?policy, "primary file unknown");
        return policy.verdict_for_unknown_entry();
    };
    if !view.exists(entry) {
        warn!(path = %entry, ?policy, "primary file not found");
        return policy.verdict_for_unknown_entry();
    }
    SourceScanner::new(view, patterns).scan(entry)
}

/// Set every rule's active flag from a scan of the document source.
///
/// Rules without patterns are always active.
pub fn activate_rules(
    registry: &RuleRegistry,
    view: &dyn SourceView,
    entry: Option<&Utf8Path>,
    policy: ScanPolicy,
) -> Result<BTreeMap<String, bool>, RegistryError> {
    let mut verdicts = BTreeMap::new();
    for rule in registry.iter() {
        let needed = rule.patterns().is_empty()
            || scan_for_trigger(view, entry, rule.patterns(), policy);
        rule.set_active(needed)?;
        debug!(rule = rule.name(), needed, "rule activation");
        verdicts.insert(rule.name().to_string(), needed);
    }
    Ok(verdicts)
}

fn include_path(raw: &str) -> Utf8PathBuf {
    let mut path = Utf8PathBuf::from(raw.trim());
    if path.extension().is_none() {
        path.set_extension("tex");
    }
    path
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'%' => return &line[..i],
            _ => i += 1,
        }
    }
    line
}
