//! Rule explanations for the `auxmk explain` and `auxmk list-rules` commands.

use auxmk_domain::{RULE_CATALOG, RuleTemplate, TriggerPattern};

/// Find a built-in rule by name, ignoring case.
pub fn lookup_rule(query: &str) -> Option<&'static RuleTemplate> {
    let query = query.trim().to_lowercase();
    RULE_CATALOG.iter().find(|t| t.name == query)
}

/// List all built-in rule names.
pub fn list_rule_names() -> Vec<&'static str> {
    RULE_CATALOG.iter().map(|t| t.name).collect()
}

pub fn format_gate(template: &RuleTemplate) -> &'static str {
    template.gate.unwrap_or("(none)")
}

pub fn format_command(template: &RuleTemplate) -> String {
    if template.command.is_empty() {
        "(none; status is written by the typesetting pass)".to_string()
    } else {
        template.command.join(" ")
    }
}

/// What a scan pattern looks for, as the user would write it.
pub fn pattern_example(pattern: TriggerPattern) -> &'static str {
    match pattern {
        TriggerPattern::PythontexPackage => r"\usepackage{pythontex}",
        TriggerPattern::PythontexEnvironment => r"\begin{pycode} (and other py* environments)",
        TriggerPattern::PythontexInlineCommand => r"\py{...}, \pyc{...}, \sympy{...}",
        TriggerPattern::XsimPackage => r"\usepackage{xsim}",
        TriggerPattern::ExerciseEnvironment => r"\begin{exercise} or \begin{solution}",
    }
}

pub fn print_explanation(template: &RuleTemplate) {
    println!("================================================================================");
    println!("RULE: {}", template.title);
    println!("================================================================================");
    println!();
    println!("Name:     {}", template.name);
    println!("Trigger:  {}", template.trigger);
    println!("Output:   {}", template.output);
    println!("Gate:     {}", format_gate(template));
    println!("Command:  {}", format_command(template));
    println!();

    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", template.description);
    println!();

    println!("SCAN PATTERNS");
    println!("--------------------------------------------------------------------------------");
    println!("The rule is active when the document or a file it includes contains:");
    println!();
    for pattern in template.patterns {
        println!("  - {:<26} {}", pattern.name(), pattern_example(*pattern));
    }
    println!();
}
