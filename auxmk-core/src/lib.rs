//! Embeddable core library for auxmk.
//!
//! Provides a clap-free, I/O-abstracted entry point for driving auxiliary
//! tools between typesetting passes.
//!
//! # Port traits
//!
//! Side effects go through the port traits in [`ports`]:
//! - [`BuildSystem`](ports::BuildSystem): tracked-file set and trigger touching
//! - [`WritePort`](ports::WritePort): write files and create directories
//!
//! Reads go through [`SourceView`](auxmk_domain::SourceView). The [`adapters`]
//! module provides default filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`run_rule`](controller::run_rule): one controller invocation for one rule
//! - [`run_pass`](pipeline::run_pass): every active rule, in gate order, plus a report

pub mod adapters;
pub mod controller;
pub mod pipeline;
pub mod ports;
pub mod session;
pub mod settings;

pub use controller::{ControllerError, ControllerPorts, run_rule};
pub use session::BuildSession;

// Re-exports so embedders don't need the lower crates directly.
pub use auxmk_domain::{FsSourceView, InMemorySourceView, RuleRegistry, SourceView, ToolAction};
pub use auxmk_types::outcome::{FailureKind, PassOutcome};
