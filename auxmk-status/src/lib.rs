//! Status-file ingestion for auxiliary tools.
//!
//! The exercise tool writes lines such as
//! `\XSIM{printed}{exercise-5=={true}||exercise-6=={true}}` during every
//! typesetting pass. This crate turns those lines into [`StatusSnapshot`]s,
//! compares the `printed` and `print` sections for stability, and extracts
//! `dependency: 'PATH';` declarations from tool output.
//!
//! Parsing is tolerant: unrelated lines and malformed pairs are skipped
//! silently. Only a missing or unreadable file is an error.
//!
//! [`StatusSnapshot`]: auxmk_types::status::StatusSnapshot

mod deps;
mod load;
mod stability;

pub use deps::parse_dependency_declarations;
pub use load::{
    DEFAULT_MARKER, StatusFormat, StatusLoadError, load_snapshot, load_snapshots, parse_section,
};
pub use stability::{StabilityReport, check_file, check_stability, is_unstable};
