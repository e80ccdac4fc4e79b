//! Default filesystem-backed port implementations.

use crate::ports::{BuildSystem, WritePort};
use anyhow::Context;
use auxmk_domain::{DependencyTracker, ToolAction};
use auxmk_types::report::TrackedFiles;
use auxmk_types::schema::AUXMK_TRACKED_V1;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::collections::BTreeSet;
use std::process::Command;
use std::time::SystemTime;
use tracing::{debug, warn};

/// File name of the persisted tracked set inside the state directory.
pub const TRACKED_FILE_NAME: &str = "tracked.json";

/// Build system backed by the project directory.
///
/// The tracked set is loaded from `<state_dir>/tracked.json` and written back
/// by [`BuildSystem::persist`], so registrations survive across invocations.
#[derive(Debug, Clone)]
pub struct FsBuildSystem {
    root: Utf8PathBuf,
    state_file: Utf8PathBuf,
    tracked: BTreeSet<Utf8PathBuf>,
}

impl FsBuildSystem {
    /// Open the build state under `root`, starting empty when none was saved yet.
    pub fn load(root: Utf8PathBuf, state_dir: &Utf8Path) -> anyhow::Result<Self> {
        let state_dir = if state_dir.is_absolute() {
            state_dir.to_path_buf()
        } else {
            root.join(state_dir)
        };
        let state_file = state_dir.join(TRACKED_FILE_NAME);

        let tracked = if state_file.is_file() {
            let raw = fs::read_to_string(&state_file)
                .with_context(|| format!("read {}", state_file))?;
            let saved: TrackedFiles = serde_json::from_str(&raw)
                .with_context(|| format!("parse {}", state_file))?;
            if saved.schema != AUXMK_TRACKED_V1 {
                warn!(path = %state_file, schema = %saved.schema, "unexpected tracked-set schema");
            }
            saved.paths
        } else {
            BTreeSet::new()
        };
        debug!(path = %state_file, count = tracked.len(), "loaded tracked set");

        Ok(Self {
            root,
            state_file,
            tracked,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn state_file(&self) -> &Utf8Path {
        &self.state_file
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Utf8Path> {
        self.tracked.iter().map(|p| p.as_path())
    }

    fn abs(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl DependencyTracker for FsBuildSystem {
    fn mark_dependency_tracked(&mut self, path: &Utf8Path) -> bool {
        self.tracked.insert(path.to_path_buf())
    }

    fn is_tracked(&self, path: &Utf8Path) -> bool {
        self.tracked.contains(path)
    }

    fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

impl BuildSystem for FsBuildSystem {
    fn touch_file(&mut self, path: &Utf8Path) -> anyhow::Result<()> {
        let abs = self.abs(path);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&abs)
            .with_context(|| format!("open {}", abs))?;
        file.file()
            .set_modified(SystemTime::now())
            .with_context(|| format!("touch {}", abs))?;
        debug!(path = %abs, "touched");
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        let saved = TrackedFiles {
            schema: AUXMK_TRACKED_V1.to_string(),
            paths: self.tracked.clone(),
        };
        let json = serde_json::to_string_pretty(&saved).context("serialize tracked set")?;
        FsWritePort.write_file(&self.state_file, json.as_bytes())
    }
}

/// In-memory build system for embedding and testing.
///
/// Records touched paths in order instead of changing modification times.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBuildSystem {
    tracked: BTreeSet<Utf8PathBuf>,
    touched: Vec<Utf8PathBuf>,
}

impl InMemoryBuildSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touched(&self) -> &[Utf8PathBuf] {
        &self.touched
    }
}

impl DependencyTracker for InMemoryBuildSystem {
    fn mark_dependency_tracked(&mut self, path: &Utf8Path) -> bool {
        self.tracked.insert(path.to_path_buf())
    }

    fn is_tracked(&self, path: &Utf8Path) -> bool {
        self.tracked.contains(path)
    }

    fn tracked_count(&self) -> usize {
        self.tracked.len()
    }
}

impl BuildSystem for InMemoryBuildSystem {
    fn touch_file(&mut self, path: &Utf8Path) -> anyhow::Result<()> {
        self.touched.push(path.to_path_buf());
        Ok(())
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// Runs an external command in the project directory.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    cwd: Utf8PathBuf,
}

impl CommandAction {
    /// `None` when `argv` is empty.
    pub fn from_argv(argv: &[String], cwd: impl Into<Utf8PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.into(),
        })
    }
}

impl ToolAction for CommandAction {
    fn run(&self) -> anyhow::Result<i32> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .status()
            .with_context(|| format!("spawn {}", self.program))?;
        // Killed by a signal: no code to pass through.
        Ok(status.code().unwrap_or(1))
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
