//! Session setup and whole-pass execution, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: file access goes through the
//! [`SourceView`] and the port traits.

use crate::adapters::CommandAction;
use crate::controller::{ControllerError, ControllerPorts, run_rule};
use crate::ports::{BuildSystem, WritePort};
use crate::session::BuildSession;
use crate::settings::{RuleSettings, RunSettings};
use anyhow::Context;
use auxmk_domain::{
    BuildRule, NoopAction, RULE_CATALOG, RuleRegistry, SourceView, ToolAction, activate_rules,
    expand_job, lookup_template,
};
use auxmk_types::report::{PassReport, ToolInfo};
use auxmk_types::rule::RuleSpec;
use camino::Utf8Path;
use chrono::Utc;
use tracing::{debug, info};

/// File name of the pass report inside the output directory.
pub const PASS_REPORT_FILE_NAME: &str = "pass.json";

/// Build the registry for `settings` and scan the source to activate rules.
///
/// Built-in rules are registered first, then rules from settings, so a
/// configured rule replaces the built-in of the same name.
pub fn configure_session(
    settings: &RunSettings,
    view: &dyn SourceView,
    build: Box<dyn BuildSystem>,
) -> Result<BuildSession, ControllerError> {
    let job = settings.job_name();
    let mut registry = RuleRegistry::new();

    for template in RULE_CATALOG {
        let action = command_action(&template.command(&job), settings);
        registry.register_rule(
            BuildRule::new(template.spec(&job), action)
                .with_patterns(template.patterns.iter().copied()),
        );
    }
    for rule in &settings.rules {
        registry.register_rule(configured_rule(rule, &job, settings)?);
    }

    // Fails early on gate cycles or gates naming unknown rules.
    let order = registry.execution_order()?;
    debug!(?order, job = %job, "rules registered");

    let verdicts = activate_rules(
        &registry,
        view,
        settings.main.as_deref(),
        settings.scan_policy,
    )?;
    info!(?verdicts, "rules activated");

    Ok(BuildSession::new(registry, build))
}

/// Run one pass: every active rule once, gates first.
pub fn run_pass(
    session: &mut BuildSession,
    ports: &ControllerPorts<'_>,
    tool: ToolInfo,
) -> Result<PassReport, ControllerError> {
    let pass = session.begin_pass();
    let mut report = PassReport::new(tool, pass);
    report.run.started_at = Some(Utc::now());

    let order = session.registry().execution_order()?;
    for name in order {
        if !session.registry().lookup(&name)?.is_active() {
            debug!(rule = %name, "inactive, not run");
            continue;
        }
        let outcome = run_rule(session, ports, &name)?;
        report.push(name, outcome);
    }

    session.build_system().persist()?;
    report.run.ended_at = Some(Utc::now());
    info!(
        pass,
        rules = report.rules.len(),
        another_pass_needed = report.another_pass_needed,
        "pass finished"
    );
    Ok(report)
}

/// Write `pass.json` to the output directory.
pub fn write_pass_report(
    report: &PassReport,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;
    let json = serde_json::to_string_pretty(report).context("serialize pass report")?;
    writer.write_file(&out_dir.join(PASS_REPORT_FILE_NAME), json.as_bytes())
}

fn command_action(argv: &[String], settings: &RunSettings) -> Box<dyn ToolAction> {
    match CommandAction::from_argv(argv, settings.project_root.clone()) {
        Some(cmd) => Box::new(cmd),
        None => Box::new(NoopAction),
    }
}

fn configured_rule(
    rule: &RuleSettings,
    job: &str,
    settings: &RunSettings,
) -> Result<BuildRule, ControllerError> {
    let template = lookup_template(&rule.name);
    let expand = |s: &str| expand_job(s, job);

    let trigger = match (&rule.trigger, template) {
        (Some(t), _) => expand(t.as_str()),
        (None, Some(t)) => expand(t.trigger),
        (None, None) => {
            return Err(anyhow::anyhow!("rule '{}' needs a trigger", rule.name).into());
        }
    };
    let output = match (&rule.output, template) {
        (Some(o), _) => expand(o.as_str()),
        (None, Some(t)) => expand(t.output),
        (None, None) => {
            return Err(anyhow::anyhow!("rule '{}' needs an output", rule.name).into());
        }
    };
    let gate = match (&rule.gate, template) {
        (Some(g), _) if g.is_empty() => None,
        (Some(g), _) => Some(g.clone()),
        (None, Some(t)) => t.gate.map(str::to_string),
        (None, None) => None,
    };
    let command: Vec<String> = match (&rule.command, template) {
        (Some(c), _) => c.iter().map(|a| expand(a.as_str())).collect(),
        (None, Some(t)) => t.command(job),
        (None, None) => Vec::new(),
    };
    let patterns = match (&rule.patterns, template) {
        (Some(p), _) => p.clone(),
        (None, Some(t)) => t.patterns.to_vec(),
        (None, None) => Vec::new(),
    };

    let mut spec = RuleSpec::new(rule.name.clone(), trigger, output);
    spec.gate = gate;
    debug!(rule = %rule.name, ?command, "configured rule");
    Ok(BuildRule::new(spec, command_action(&command, settings)).with_patterns(patterns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FsWritePort, InMemoryBuildSystem};
    use auxmk_domain::{InMemorySourceView, ScanPolicy, TriggerPattern};
    use auxmk_status::StatusFormat;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "auxmk".to_string(),
            version: Some("test".to_string()),
        }
    }

    #[test]
    fn configured_rule_overrides_builtin_fields() {
        let settings = RunSettings {
            main: Some("doc.tex".into()),
            rules: vec![RuleSettings {
                name: "pythontex".to_string(),
                command: Some(vec!["pythontex3".into(), "--interpreter".into(), "{job}".into()]),
                gate: Some(String::new()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let view = InMemorySourceView::new().with_file("doc.tex", "\\usepackage{pythontex}\n");
        let session =
            configure_session(&settings, &view, Box::new(InMemoryBuildSystem::new())).unwrap();

        let rule = session.registry().lookup("pythontex").unwrap();
        assert_eq!(rule.trigger(), "doc.pytxcode");
        assert_eq!(rule.gate(), None);
        assert_eq!(rule.action().describe(), "pythontex3 --interpreter doc");
        assert!(rule.is_active());
        assert!(!session.registry().lookup("xsim").unwrap().is_active());
    }

    #[test]
    fn custom_rule_requires_paths() {
        let settings = RunSettings {
            rules: vec![RuleSettings {
                name: "asymptote".to_string(),
                output: Some("{job}.pre".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = configure_session(
            &settings,
            &InMemorySourceView::new(),
            Box::new(InMemoryBuildSystem::new()),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("trigger"));
    }

    #[test]
    fn custom_rule_with_unknown_gate_is_rejected() {
        let settings = RunSettings {
            rules: vec![RuleSettings {
                name: "asymptote".to_string(),
                trigger: Some("{job}.asy".to_string()),
                output: Some("{job}-1.pdf".to_string()),
                gate: Some("metapost".to_string()),
                patterns: Some(vec![TriggerPattern::PythontexPackage]),
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = configure_session(
            &settings,
            &InMemorySourceView::new(),
            Box::new(InMemoryBuildSystem::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ControllerError::Registry(_)));
    }

    #[test]
    fn pass_runs_gate_first_and_writes_report() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        std::fs::write(root.join("doc.tex"), "\\usepackage{xsim}\n").unwrap();
        std::fs::write(
            root.join("doc.xsim"),
            "\\XSIM{printed}{a=={true}}\n\\XSIM{print}{a=={true}}\n",
        )
        .unwrap();

        let settings = RunSettings {
            project_root: root.clone(),
            main: Some("doc.tex".into()),
            scan_policy: ScanPolicy::FailClosed,
            ..Default::default()
        };
        let view = auxmk_domain::FsSourceView::new(root.clone());
        let mut session =
            configure_session(&settings, &view, Box::new(InMemoryBuildSystem::new())).unwrap();

        let format = StatusFormat::default();
        let ports = ControllerPorts {
            view: &view,
            writer: &FsWritePort,
            status_format: &format,
        };
        let report = run_pass(&mut session, &ports, tool()).unwrap();

        assert_eq!(report.pass, 1);
        let ran: Vec<&str> = report.rules.iter().map(|r| r.rule.as_str()).collect();
        assert_eq!(ran, vec!["xsim"]);
        assert_eq!(report.exit_code(), 0);
        assert!(!report.another_pass_needed);
        assert!(report.run.started_at.is_some());

        let out_dir = root.join(".auxmk");
        write_pass_report(&report, &out_dir, &FsWritePort).unwrap();
        let raw = std::fs::read_to_string(out_dir.join(PASS_REPORT_FILE_NAME)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema"], "auxmk.pass.v1");
        assert_eq!(value["rules"][0]["outcome"]["status"], "success");
    }
}
