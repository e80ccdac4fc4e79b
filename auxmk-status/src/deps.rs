use camino::Utf8PathBuf;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static DEPENDENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"dependency:\s*'([^']*)'\s*;").expect("valid dependency regex"));

/// Extract `dependency: 'PATH';` declarations from tool output.
///
/// Paths come back in first-seen order without duplicates; empty paths are dropped.
pub fn parse_dependency_declarations(contents: &str) -> Vec<Utf8PathBuf> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for line in contents.lines() {
        for cap in DEPENDENCY_RE.captures_iter(line) {
            let path = cap[1].trim();
            if path.is_empty() || !seen.insert(path.to_string()) {
                continue;
            }
            out.push(Utf8PathBuf::from(path));
        }
    }
    out
}
