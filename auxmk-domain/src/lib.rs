//! Domain logic: which auxiliary rules exist and which of them a document needs.
//!
//! This crate owns *what* can run and *whether* it is needed. It does not own
//! *when* a rule runs within a pass; that's the controller in `auxmk-core`.

mod catalog;
mod ports;
mod registry;
mod scanner;

pub use catalog::{RULE_CATALOG, RuleTemplate, expand_job, lookup_template};
pub use ports::{DependencyTracker, FsSourceView, InMemorySourceView, SourceView};
pub use registry::{BuildRule, FnAction, NoopAction, RegistryError, RuleRegistry, ToolAction};
pub use scanner::{ScanPolicy, SourceScanner, TriggerPattern, activate_rules, scan_for_trigger};
