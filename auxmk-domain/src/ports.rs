use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeMap;

/// Read-only access to the document's project directory.
///
/// Relative paths resolve against [`SourceView::root`].
pub trait SourceView {
    fn root(&self) -> &Utf8Path;

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String>;

    fn exists(&self, rel: &Utf8Path) -> bool;
}

/// The build system's tracked-file set.
///
/// Registrations are monotonic: nothing is ever untracked within a session.
pub trait DependencyTracker {
    /// Track `path`. Returns `true` if it was not tracked before.
    fn mark_dependency_tracked(&mut self, path: &Utf8Path) -> bool;

    fn is_tracked(&self, path: &Utf8Path) -> bool;

    fn tracked_count(&self) -> usize;
}

/// File-system backed `SourceView`.
#[derive(Debug, Clone)]
pub struct FsSourceView {
    root: Utf8PathBuf,
}

impl FsSourceView {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn abs(&self, rel: &Utf8Path) -> Utf8PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.root.join(rel)
        }
    }
}

impl SourceView for FsSourceView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        let abs = self.abs(rel);
        fs::read_to_string(&abs).with_context(|| format!("read {}", abs))
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.abs(rel).is_file()
    }
}

/// In-memory `SourceView` for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceView {
    root: Utf8PathBuf,
    files: BTreeMap<Utf8PathBuf, String>,
}

impl InMemorySourceView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, rel: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(rel.into(), contents.into());
        self
    }
}

impl SourceView for InMemorySourceView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_to_string(&self, rel: &Utf8Path) -> anyhow::Result<String> {
        self.files
            .get(rel)
            .cloned()
            .with_context(|| format!("read {}", rel))
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.files.contains_key(rel)
    }
}
