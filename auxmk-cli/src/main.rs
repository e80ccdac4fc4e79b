mod config;
mod discover;
mod explain;

use anyhow::Context;
use auxmk_core::adapters::{FsBuildSystem, FsWritePort, InMemoryBuildSystem};
use auxmk_core::pipeline::{configure_session, run_pass, write_pass_report};
use auxmk_core::settings::RunSettings;
use auxmk_core::{ControllerError, ControllerPorts, run_rule};
use auxmk_domain::{FsSourceView, RULE_CATALOG, ScanPolicy};
use auxmk_status::{StatusFormat, StatusLoadError, check_file};
use auxmk_types::outcome::PassOutcome;
use auxmk_types::report::ToolInfo;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "auxmk",
    version,
    about = "Re-run controller for LaTeX auxiliary tools (pythontex, xsim)."
)]
struct Cli {
    /// Project root containing the document (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    project_root: Utf8PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan the document source and report which rules are needed.
    Scan(ScanArgs),
    /// Parse a status file and report whether it is stable.
    Status(StatusArgs),
    /// Invoke the re-run controller for one rule.
    Run(RunArgs),
    /// Run every active rule once and write pass.json.
    Pass(PassArgs),
    /// List built-in rules.
    ListRules(ListRulesArgs),
    /// Explain what a built-in rule does and when it is active.
    Explain(ExplainArgs),
}

#[derive(Debug, Parser)]
struct ScanArgs {
    /// Primary file, relative to the project root.
    #[arg(long)]
    main: Option<Utf8PathBuf>,

    /// What to assume when the primary file is unknown.
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

#[derive(Debug, Parser)]
struct StatusArgs {
    /// Status file to check (e.g. "notes.xsim").
    file: Utf8PathBuf,

    /// Status-line marker (default from auxmk.toml, else `\XSIM`).
    #[arg(long)]
    marker: Option<String>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// Rule to invoke (e.g. "pythontex").
    rule: String,

    /// Job name (default: primary file stem).
    #[arg(long)]
    job: Option<String>,

    /// Primary file, relative to the project root.
    #[arg(long)]
    main: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct PassArgs {
    /// Job name (default: primary file stem).
    #[arg(long)]
    job: Option<String>,

    /// Primary file, relative to the project root.
    #[arg(long)]
    main: Option<Utf8PathBuf>,

    /// Output directory for pass.json (default: <project_root>/<state_dir>).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Rule name to explain (e.g. "pythontex").
    rule: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum PolicyArg {
    FailOpen,
    FailClosed,
}

impl From<PolicyArg> for ScanPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::FailOpen => ScanPolicy::FailOpen,
            PolicyArg::FailClosed => ScanPolicy::FailClosed,
        }
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => exit_code(code),
        Err(e) => {
            error!("{:?}", e);
            eprintln!("error: {:#}", e);
            exit_code(error_exit_code(&e))
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// 2 for unusable configuration or a missing upstream artifact, else 1.
fn error_exit_code(e: &anyhow::Error) -> i32 {
    if let Some(ce) = e.downcast_ref::<ControllerError>() {
        ce.exit_code()
    } else if e.downcast_ref::<StatusLoadError>().is_some() {
        2
    } else {
        1
    }
}

fn real_main() -> anyhow::Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = cli.project_root;
    match cli.cmd {
        Command::Scan(args) => cmd_scan(root, args),
        Command::Status(args) => cmd_status(root, args),
        Command::Run(args) => cmd_run(root, args),
        Command::Pass(args) => cmd_pass(root, args),
        Command::ListRules(args) => cmd_list_rules(args),
        Command::Explain(args) => cmd_explain(args),
    }
}

/// Load auxmk.toml, merge CLI values over it, and fill in the primary file.
fn load_settings(root: Utf8PathBuf, cli: CliOverrides) -> anyhow::Result<RunSettings> {
    let file_config = config::load_or_default(&root).context("load auxmk.toml config")?;
    let mut settings = ConfigMerger::new(file_config).merge(root, &cli);

    if settings.main.is_none() {
        settings.main = discover::discover_primary_file(&settings.project_root)?;
    }
    debug!(
        "merged config: main={:?}, job={}, policy={:?}, rules={}",
        settings.main,
        settings.job_name(),
        settings.scan_policy,
        settings.rules.len()
    );
    Ok(settings)
}

fn cmd_scan(root: Utf8PathBuf, args: ScanArgs) -> anyhow::Result<i32> {
    let settings = load_settings(
        root,
        CliOverrides {
            main: args.main,
            policy: args.policy.map(ScanPolicy::from),
            ..Default::default()
        },
    )?;
    let view = FsSourceView::new(settings.project_root.clone());
    let session = configure_session(&settings, &view, Box::new(InMemoryBuildSystem::new()))?;

    match &settings.main {
        Some(main) => println!("primary file: {}", main),
        None => println!("primary file: (unknown, {:?})", settings.scan_policy),
    }
    for rule in session.registry().iter() {
        let verdict = if rule.is_active() { "needed" } else { "not needed" };
        println!("  {:<16} {}", rule.name(), verdict);
    }
    Ok(0)
}

fn cmd_status(root: Utf8PathBuf, args: StatusArgs) -> anyhow::Result<i32> {
    let file_config = config::load_or_default(&root).context("load auxmk.toml config")?;
    let marker = args
        .marker
        .or(file_config.status.marker)
        .unwrap_or_else(|| auxmk_status::DEFAULT_MARKER.to_string());
    let path = if args.file.is_absolute() {
        args.file
    } else {
        root.join(&args.file)
    };

    let report = check_file(&path, &StatusFormat::new(marker))?;
    match args.format {
        OutputFormat::Text => {
            if report.is_unstable() {
                println!("unstable: {}", report.unstable_items.join(", "));
            } else {
                println!("stable");
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "path": path,
                "unstable": report.is_unstable(),
                "unstable_items": report.unstable_items,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(0)
}

fn cmd_run(root: Utf8PathBuf, args: RunArgs) -> anyhow::Result<i32> {
    let settings = load_settings(
        root,
        CliOverrides {
            main: args.main,
            job: args.job,
            ..Default::default()
        },
    )?;
    let view = FsSourceView::new(settings.project_root.clone());
    let build = FsBuildSystem::load(settings.project_root.clone(), &settings.state_dir)?;
    let mut session = configure_session(&settings, &view, Box::new(build))?;
    let format = StatusFormat::new(settings.status_marker.clone());
    let ports = ControllerPorts {
        view: &view,
        writer: &FsWritePort,
        status_format: &format,
    };

    session.begin_pass();
    let outcome = run_rule(&mut session, &ports, &args.rule)?;
    session.build_system().persist()?;

    print_outcome(&args.rule, &outcome);
    Ok(outcome.exit_code())
}

fn cmd_pass(root: Utf8PathBuf, args: PassArgs) -> anyhow::Result<i32> {
    let settings = load_settings(
        root,
        CliOverrides {
            main: args.main,
            job: args.job,
            out_dir: args.out_dir,
            ..Default::default()
        },
    )?;
    let view = FsSourceView::new(settings.project_root.clone());
    let build = FsBuildSystem::load(settings.project_root.clone(), &settings.state_dir)?;
    let mut session = configure_session(&settings, &view, Box::new(build))?;
    let format = StatusFormat::new(settings.status_marker.clone());
    let ports = ControllerPorts {
        view: &view,
        writer: &FsWritePort,
        status_format: &format,
    };

    let report = run_pass(&mut session, &ports, tool_info())?;
    write_pass_report(&report, &settings.out_dir, &FsWritePort)?;

    for r in &report.rules {
        print_outcome(&r.rule, &r.outcome);
    }
    if report.another_pass_needed {
        println!("another pass needed");
    }
    info!("wrote pass report to {}", settings.out_dir);
    Ok(report.exit_code())
}

fn print_outcome(rule: &str, outcome: &PassOutcome) {
    match outcome.reason() {
        Some(reason) => println!("{}: {} ({})", rule, outcome.label(), reason),
        None => println!("{}: {}", rule, outcome.label()),
    }
    for dep in outcome.new_dependencies() {
        println!("  new dependency: {}", dep);
    }
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "auxmk".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<i32> {
    use explain::{list_rule_names, lookup_rule, print_explanation};

    let Some(rule) = lookup_rule(&args.rule) else {
        let available = list_rule_names().join(", ");
        anyhow::bail!(
            "Unknown rule: '{}'\n\nAvailable rules: {}",
            args.rule,
            available
        );
    };
    print_explanation(rule);
    Ok(0)
}

fn cmd_list_rules(args: ListRulesArgs) -> anyhow::Result<i32> {
    use explain::format_gate;

    match args.format {
        OutputFormat::Text => {
            println!("Available rules:\n");
            println!("  {:<12} {:<8} TITLE", "NAME", "GATE");
            println!("  {:<12} {:<8} -----", "----", "----");
            for rule in RULE_CATALOG {
                println!("  {:<12} {:<8} {}", rule.name, format_gate(rule), rule.title);
            }
            println!();
            println!("Use 'auxmk explain <name>' for details.");
        }
        OutputFormat::Json => {
            let rules: Vec<_> = RULE_CATALOG
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "name": r.name,
                        "title": r.title,
                        "trigger": r.trigger,
                        "output": r.output,
                        "gate": r.gate,
                        "command": r.command,
                        "patterns": r.patterns.iter().map(|p| p.name()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }
    Ok(0)
}
