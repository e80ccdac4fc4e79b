//! Built-in auxiliary tools.
//!
//! Paths and commands are templates over the job name: `{job}` is replaced
//! by the primary file's stem.

use crate::scanner::TriggerPattern;
use auxmk_types::rule::RuleSpec;

/// Static description of an auxiliary tool.
#[derive(Debug, Clone)]
pub struct RuleTemplate {
    /// Rule name (tool identity).
    pub name: &'static str,
    /// Human-readable title.
    pub title: &'static str,
    /// What the tool does and how the controller treats it.
    pub description: &'static str,
    pub trigger: &'static str,
    pub output: &'static str,
    pub gate: Option<&'static str>,
    /// Default command line. Empty for status-only rules.
    pub command: &'static [&'static str],
    /// Source patterns that make the tool needed.
    pub patterns: &'static [TriggerPattern],
}

impl RuleTemplate {
    pub fn spec(&self, job: &str) -> RuleSpec {
        RuleSpec {
            name: self.name.to_string(),
            trigger: expand_job(self.trigger, job).into(),
            output: expand_job(self.output, job).into(),
            gate: self.gate.map(str::to_string),
        }
    }

    pub fn command(&self, job: &str) -> Vec<String> {
        self.command.iter().map(|a| expand_job(a, job)).collect()
    }
}

pub static RULE_CATALOG: &[RuleTemplate] = &[
    RuleTemplate {
        name: "xsim",
        title: "Exercise numbering status",
        description: r#"Tracks the exercise package's status file ({job}.xsim).

The typesetting pass itself writes `printed` and `print` sections listing
which exercises were typeset and which are scheduled for the next pass.
No external command runs by default; the rule exists so other tools can be
gated on its output being present and stable."#,
        trigger: "{job}.xsim",
        output: "{job}.xsim",
        gate: None,
        command: &[],
        patterns: &[
            TriggerPattern::XsimPackage,
            TriggerPattern::ExerciseEnvironment,
        ],
    },
    RuleTemplate {
        name: "pythontex",
        title: "Python code execution",
        description: r#"Runs pythontex on the code file the typesetting pass extracts ({job}.pytxcode).

Execution is gated on the exercise status being stable: when an exercise
was typeset this pass but is dropped next pass, running the code now would
act on stale state, so the run is deferred to the next pass. Files declared
as `dependency: 'PATH';` in the generated macro file are tracked."#,
        trigger: "{job}.pytxcode",
        output: "pythontex-files-{job}/{job}.pytxmcr",
        gate: Some("xsim"),
        command: &["pythontex", "{job}"],
        patterns: &[
            TriggerPattern::PythontexPackage,
            TriggerPattern::PythontexEnvironment,
            TriggerPattern::PythontexInlineCommand,
        ],
    },
];

pub fn lookup_template(name: &str) -> Option<&'static RuleTemplate> {
    RULE_CATALOG.iter().find(|t| t.name == name)
}

pub fn expand_job(template: &str, job: &str) -> String {
    template.replace("{job}", job)
}
