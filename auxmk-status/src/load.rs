use auxmk_types::status::{ItemState, StatusSnapshot};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use thiserror::Error;
use tracing::debug;

/// Marker written by the exercise package in front of every status block.
pub const DEFAULT_MARKER: &str = r"\XSIM";

const PAIR_SEPARATOR: &str = "||";
const VALUE_SEPARATOR: &str = "==";

/// Line notation of a status file: `MARKER{section}{id=={true}||...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFormat {
    pub marker: String,
}

impl Default for StatusFormat {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl StatusFormat {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusLoadError {
    /// The primary pass has not (yet) produced the status file.
    #[error("status file not found: {path}: {message}")]
    FileNotFound { path: Utf8PathBuf, message: String },
}

/// Parse one section out of status-file contents.
///
/// A line may hold several blocks, and text may follow a block. Later blocks
/// for the same section overwrite earlier ones entry by entry.
pub fn parse_section(contents: &str, format: &StatusFormat, section: &str) -> StatusSnapshot {
    let prefix = format!("{}{{{}}}{{", format.marker, section);
    let mut entries = Vec::new();

    for (lineno, line) in contents.lines().enumerate() {
        let mut rest = line;
        while let Some(start) = rest.find(&prefix) {
            let body = &rest[start + prefix.len()..];
            let Some(end) = block_end(body) else {
                debug!(line = lineno + 1, section, "unterminated status block");
                break;
            };
            parse_pairs(&body[..end], lineno + 1, &mut entries);
            rest = &body[end + 1..];
        }
    }

    StatusSnapshot::from_entries(section, entries)
}

/// Byte offset of the `}` closing a block whose opening `{` precedes `body`.
fn block_end(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in body.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_pairs(block: &str, line: usize, entries: &mut Vec<(String, ItemState)>) {
    for pair in block.split(PAIR_SEPARATOR) {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((id, value)) = pair.split_once(VALUE_SEPARATOR) else {
            debug!(line, pair, "skipping pair without separator");
            continue;
        };
        let Some(state) = ItemState::from_token(value) else {
            debug!(line, pair, "skipping pair with non-boolean value");
            continue;
        };
        let id = id.trim();
        if id.is_empty() {
            continue;
        }
        entries.push((id.to_string(), state));
    }
}

/// Read a status file and parse one section from it.
pub fn load_snapshot(
    path: &Utf8Path,
    format: &StatusFormat,
    section: &str,
) -> Result<StatusSnapshot, StatusLoadError> {
    let contents = read(path)?;
    Ok(parse_section(&contents, format, section))
}

/// Read a status file once and parse several sections from it.
pub fn load_snapshots(
    path: &Utf8Path,
    format: &StatusFormat,
    sections: &[&str],
) -> Result<Vec<StatusSnapshot>, StatusLoadError> {
    let contents = read(path)?;
    Ok(sections
        .iter()
        .map(|s| parse_section(&contents, format, s))
        .collect())
}

fn read(path: &Utf8Path) -> Result<String, StatusLoadError> {
    debug!(path = %path, "reading status file");
    fs::read_to_string(path).map_err(|e| StatusLoadError::FileNotFound {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
