//! BDD harness (cucumber-rs).
//!
//! This crate exists to keep scenario tests isolated from the production crates.
//! It only carries the project-directory fixtures the step definitions share.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Modification time given to fixture files so a later touch is observable.
pub const FIXTURE_MTIME_SECS: u64 = 1_000_000;

/// A fresh project directory with a UTF-8 root path.
pub fn temp_project() -> (TempDir, Utf8PathBuf) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8 temp path");
    (td, root)
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Utf8Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(&path, contents).expect("write fixture");
}

/// Write a fixture and backdate it to [`FIXTURE_MTIME_SECS`].
pub fn write_backdated(root: &Utf8Path, rel: &str, contents: &str) -> SystemTime {
    write_file(root, rel, contents);
    let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(FIXTURE_MTIME_SECS);
    std::fs::File::options()
        .write(true)
        .open(root.join(rel))
        .expect("open fixture")
        .set_modified(mtime)
        .expect("backdate fixture");
    mtime
}

/// Strip the common indentation gherkin leaves on doc strings.
pub fn dedent(doc: &str) -> String {
    doc.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("{l}\n"))
        .collect()
}
