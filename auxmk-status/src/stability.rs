use crate::load::{StatusFormat, StatusLoadError, load_snapshots};
use auxmk_types::status::{ItemState, SECTION_PRINT, SECTION_PRINTED, StatusSnapshot};
use camino::Utf8Path;
use serde::Serialize;

/// Items acted upon in the pass just completed but flagged to be skipped next pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StabilityReport {
    pub unstable_items: Vec<String>,
}

impl StabilityReport {
    pub fn is_unstable(&self) -> bool {
        !self.unstable_items.is_empty()
    }
}

/// True if any id is `true` in `printed` and `false` in `print`.
///
/// An id missing from `print` never makes the pair unstable.
pub fn is_unstable(printed: &StatusSnapshot, print: &StatusSnapshot) -> bool {
    printed
        .iter()
        .any(|(id, state)| flips_off(state, print.get(id)))
}

/// Like [`is_unstable`], but collects every mismatching id for diagnostics.
pub fn check_stability(printed: &StatusSnapshot, print: &StatusSnapshot) -> StabilityReport {
    StabilityReport {
        unstable_items: printed
            .iter()
            .filter(|(id, state)| flips_off(*state, print.get(id)))
            .map(|(id, _)| id.to_string())
            .collect(),
    }
}

/// Load both sections of a status file fresh and compare them.
pub fn check_file(
    path: &Utf8Path,
    format: &StatusFormat,
) -> Result<StabilityReport, StatusLoadError> {
    let snaps = load_snapshots(path, format, &[SECTION_PRINTED, SECTION_PRINT])?;
    Ok(check_stability(&snaps[0], &snaps[1]))
}

fn flips_off(printed: ItemState, next: Option<ItemState>) -> bool {
    printed == ItemState::True && next == Some(ItemState::False)
}
