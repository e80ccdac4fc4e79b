//! Port traits abstracting side effects away from the controller.

use auxmk_domain::DependencyTracker;
use camino::Utf8Path;

/// The external build system the controller cooperates with.
///
/// Scheduling another pass is implicit: the driver sees a touched trigger or
/// a newly tracked dependency and re-runs.
pub trait BuildSystem: DependencyTracker {
    /// Bump the modification time of `path` so the driver re-evaluates it.
    fn touch_file(&mut self, path: &Utf8Path) -> anyhow::Result<()>;

    /// Make registrations durable. A no-op for in-memory systems.
    fn persist(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
