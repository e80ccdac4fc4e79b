//! Shared DTOs (schemas-as-code) for the auxmk workspace.
//!
//! # Design constraints
//! - Pass reports and the tracked-dependency file are serialized to disk and
//!   read by external build drivers.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod outcome;
pub mod report;
pub mod rule;
pub mod status;

/// Schema identifiers.
pub mod schema {
    pub const AUXMK_PASS_V1: &str = "auxmk.pass.v1";
    pub const AUXMK_TRACKED_V1: &str = "auxmk.tracked.v1";
}
