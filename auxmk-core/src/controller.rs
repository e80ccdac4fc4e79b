//! The re-run controller: one invocation of one rule within a pass.
//!
//! ```text
//! CheckPreconditions ──► Deferred
//!        │
//!        └──► Executing ──► Success | Failed
//! ```
//!
//! Waiting is never done in-process. A rule that cannot run yet touches its
//! trigger and returns, leaving the external driver to schedule another pass.

use crate::ports::WritePort;
use crate::session::BuildSession;
use anyhow::Context;
use auxmk_domain::{RegistryError, SourceView};
use auxmk_status::{
    StatusFormat, StatusLoadError, check_stability, parse_dependency_declarations, parse_section,
};
use auxmk_types::outcome::PassOutcome;
use auxmk_types::rule::RuleSpec;
use auxmk_types::status::{SECTION_PRINT, SECTION_PRINTED};
use tracing::{debug, info, warn};

/// Runtime faults. Domain outcomes such as deferral or tool failure are
/// [`PassOutcome`] values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("unknown rule '{name}'")]
    UnknownRule { name: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ControllerError {
    /// 2 = rule configuration is unusable, 1 = runtime error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ControllerError::UnknownRule { .. } | ControllerError::Registry(_) => 2,
            ControllerError::Internal(_) => 1,
        }
    }
}

/// I/O the controller needs besides the session's build system.
pub struct ControllerPorts<'a> {
    pub view: &'a dyn SourceView,
    pub writer: &'a dyn WritePort,
    pub status_format: &'a StatusFormat,
}

enum GateState {
    Open,
    Missing(String),
    Unstable(Vec<String>),
}

/// Invoke rule `name` once for the current pass.
///
/// A second call within the same pass returns the recorded outcome without
/// running anything.
pub fn run_rule(
    session: &mut BuildSession,
    ports: &ControllerPorts<'_>,
    name: &str,
) -> Result<PassOutcome, ControllerError> {
    if let Some(previous) = session.outcome(name) {
        debug!(rule = name, pass = session.pass(), "outcome already recorded this pass");
        return Ok(previous.clone());
    }

    let outcome = evaluate(session, ports, name)?;
    session.record(name, outcome.clone());
    Ok(outcome)
}

fn evaluate(
    session: &mut BuildSession,
    ports: &ControllerPorts<'_>,
    name: &str,
) -> Result<PassOutcome, ControllerError> {
    let rule = session
        .registry()
        .lookup(name)
        .map_err(|_| ControllerError::UnknownRule {
            name: name.to_string(),
        })?;
    let spec = rule.spec().clone();

    if !rule.is_active() {
        debug!(rule = name, "not needed by this document");
        return Ok(PassOutcome::skipped("not needed by this document"));
    }

    // CheckPreconditions
    if !ports.view.exists(&spec.trigger) {
        warn!(rule = name, trigger = %spec.trigger, "trigger file missing");
        return Ok(PassOutcome::fatal_precondition(format!(
            "trigger file {} not found",
            spec.trigger
        )));
    }

    if let Some(gate) = spec.gate.as_deref() {
        match check_gate(session, ports, gate) {
            GateState::Open => {}
            GateState::Missing(reason) => {
                warn!(rule = name, gate, %reason, "gate precondition failed");
                return Ok(PassOutcome::fatal_precondition(reason));
            }
            GateState::Unstable(items) => {
                request_rerun(session, ports, &spec)?;
                warn!(
                    rule = name,
                    gate,
                    items = %items.join(", "),
                    "gate state unstable, deferring to next pass"
                );
                return Ok(PassOutcome::deferred(format!(
                    "{} state unstable: {}",
                    gate,
                    items.join(", ")
                )));
            }
        }
    }

    // Executing
    let action = session.registry().lookup(name)?.action();
    info!(rule = name, action = %action.describe(), "running tool");
    let status = action
        .run()
        .with_context(|| format!("run rule {}", name))?;
    if status != 0 {
        warn!(rule = name, status, "tool failed");
        return Ok(PassOutcome::tool_failed(status));
    }

    if !ports.view.exists(&spec.output) {
        request_rerun(session, ports, &spec)?;
        warn!(
            rule = name,
            output = %spec.output,
            "expected output missing after run, retrying next pass"
        );
        return Ok(PassOutcome::recovered(format!(
            "output {} missing after run",
            spec.output
        )));
    }

    let contents = ports.view.read_to_string(&spec.output)?;
    let mut new_dependencies = Vec::new();
    for path in parse_dependency_declarations(&contents) {
        if session.register_dependency(name, &path) {
            info!(rule = name, path = %path, "tracking new dependency");
            new_dependencies.push(path);
        }
    }
    info!(rule = name, new = new_dependencies.len(), "rule succeeded");
    Ok(PassOutcome::success(new_dependencies))
}

fn check_gate(session: &BuildSession, ports: &ControllerPorts<'_>, gate: &str) -> GateState {
    let Ok(gate_rule) = session.registry().lookup(gate) else {
        return GateState::Missing(format!("gating rule '{}' is not registered", gate));
    };
    if !gate_rule.is_active() {
        debug!(gate, "gating rule inactive, ignoring gate");
        return GateState::Open;
    }

    let output = gate_rule.output();
    if !ports.view.exists(output) {
        return GateState::Missing(format!(
            "output {} of gating rule '{}' not found; the typesetting pass did not produce it",
            output, gate
        ));
    }
    let contents = match ports.view.read_to_string(output) {
        Ok(c) => c,
        Err(e) => {
            let err = StatusLoadError::FileNotFound {
                path: output.to_path_buf(),
                message: format!("{e:#}"),
            };
            return GateState::Missing(err.to_string());
        }
    };

    let printed = parse_section(&contents, ports.status_format, SECTION_PRINTED);
    let print = parse_section(&contents, ports.status_format, SECTION_PRINT);
    let report = check_stability(&printed, &print);
    if report.is_unstable() {
        GateState::Unstable(report.unstable_items)
    } else {
        debug!(gate, items = printed.len(), "gate state stable");
        GateState::Open
    }
}

/// Force another pass: touch the trigger and make sure an output file exists.
fn request_rerun(
    session: &mut BuildSession,
    ports: &ControllerPorts<'_>,
    spec: &RuleSpec,
) -> Result<(), ControllerError> {
    session.build_system_mut().touch_file(&spec.trigger)?;
    if !ports.view.exists(&spec.output) {
        let placeholder = ports.view.root().join(&spec.output);
        ports.writer.write_file(&placeholder, b"")?;
        debug!(path = %placeholder, "wrote placeholder output");
    }
    Ok(())
}
