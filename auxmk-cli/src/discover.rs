//! Primary-file discovery.
//!
//! When no primary file is configured, the project root is searched for
//! `*.tex` files that declare `\documentclass`. Exactly one such file is the
//! primary file; none or several means unknown.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::{debug, warn};

pub fn discover_primary_file(project_root: &Utf8Path) -> anyhow::Result<Option<Utf8PathBuf>> {
    let pattern = format!("{}/*.tex", glob::Pattern::escape(project_root.as_str()));
    let mut candidates = Vec::new();

    for entry in glob::glob(&pattern).with_context(|| format!("glob {}", pattern))? {
        let path = entry.context("read project directory")?;
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            debug!("skipping non-UTF-8 path");
            continue;
        };
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path, error = %e, "skipping unreadable file");
                continue;
            }
        };
        if declares_document_class(&contents) {
            let rel = path
                .strip_prefix(project_root)
                .unwrap_or(path.as_path())
                .to_path_buf();
            candidates.push(rel);
        }
    }

    match candidates.len() {
        0 => {
            debug!(root = %project_root, "no primary file found");
            Ok(None)
        }
        1 => Ok(candidates.pop()),
        _ => {
            warn!(?candidates, "several candidate primary files; set [project] main");
            Ok(None)
        }
    }
}

fn declares_document_class(contents: &str) -> bool {
    contents
        .lines()
        .any(|line| line.trim_start().starts_with(r"\documentclass"))
}
