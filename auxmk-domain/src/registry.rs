use crate::ports::DependencyTracker;
use crate::scanner::TriggerPattern;
use auxmk_types::rule::RuleSpec;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// The executable part of a rule: runs the auxiliary tool and returns its status.
///
/// `Ok(0)` is success; any other status is a tool failure and is reported verbatim.
/// `Err` is reserved for the tool not being runnable at all.
pub trait ToolAction {
    fn run(&self) -> anyhow::Result<i32>;

    /// Short human-readable form for logs.
    fn describe(&self) -> String {
        "<action>".to_string()
    }
}

/// Adapts a zero-argument closure returning a status code.
pub struct FnAction<F>(pub F);

impl<F> ToolAction for FnAction<F>
where
    F: Fn() -> i32,
{
    fn run(&self) -> anyhow::Result<i32> {
        Ok((self.0)())
    }

    fn describe(&self) -> String {
        "<closure>".to_string()
    }
}

/// Action for status-only rules whose output is written by the typesetting pass itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl ToolAction for NoopAction {
    fn run(&self) -> anyhow::Result<i32> {
        Ok(0)
    }

    fn describe(&self) -> String {
        "<none>".to_string()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no rule named '{name}'")]
    NotFound { name: String },

    #[error("active flag of rule '{name}' was already set")]
    ActiveAlreadySet { name: String },

    #[error("rule '{rule}' is gated by unregistered rule '{gate}'")]
    UnknownGate { rule: String, gate: String },

    #[error("gate cycle through rule '{rule}'")]
    GateCycle { rule: String },
}

/// One auxiliary-tool invocation spec.
pub struct BuildRule {
    spec: RuleSpec,
    action: Box<dyn ToolAction>,
    patterns: Vec<TriggerPattern>,
    active: OnceCell<bool>,
}

impl fmt::Debug for BuildRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRule")
            .field("spec", &self.spec)
            .field("action", &self.action.describe())
            .field("patterns", &self.patterns)
            .field("active", &self.active.get())
            .finish()
    }
}

impl BuildRule {
    pub fn new(spec: RuleSpec, action: Box<dyn ToolAction>) -> Self {
        Self {
            spec,
            action,
            patterns: Vec::new(),
            active: OnceCell::new(),
        }
    }

    /// Source patterns that make this rule needed. No patterns means always needed.
    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = TriggerPattern>) -> Self {
        self.patterns = patterns.into_iter().collect();
        self
    }

    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn trigger(&self) -> &Utf8Path {
        &self.spec.trigger
    }

    pub fn output(&self) -> &Utf8Path {
        &self.spec.output
    }

    pub fn gate(&self) -> Option<&str> {
        self.spec.gate.as_deref()
    }

    pub fn patterns(&self) -> &[TriggerPattern] {
        &self.patterns
    }

    pub fn action(&self) -> &dyn ToolAction {
        self.action.as_ref()
    }

    /// Record the scanner's verdict. Can be set once per build session.
    pub fn set_active(&self, needed: bool) -> Result<(), RegistryError> {
        self.active
            .set(needed)
            .map_err(|_| RegistryError::ActiveAlreadySet {
                name: self.spec.name.clone(),
            })
    }

    /// The scanner's verdict, if it has run.
    pub fn active(&self) -> Option<bool> {
        self.active.get().copied()
    }

    /// Rules that were never scanned count as active.
    pub fn is_active(&self) -> bool {
        self.active().unwrap_or(true)
    }
}

/// Named build rules plus the dependencies each has registered.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, BuildRule>,
    dependencies: BTreeMap<String, BTreeSet<Utf8PathBuf>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule, replacing any earlier rule of the same name.
    pub fn register(
        &mut self,
        name: &str,
        trigger: impl Into<Utf8PathBuf>,
        output: impl Into<Utf8PathBuf>,
        action: Box<dyn ToolAction>,
    ) -> Option<BuildRule> {
        self.register_rule(BuildRule::new(RuleSpec::new(name, trigger, output), action))
    }

    /// Register a fully built rule. Last registration wins; the replaced rule is returned.
    pub fn register_rule(&mut self, rule: BuildRule) -> Option<BuildRule> {
        let name = rule.name().to_string();
        let previous = self.rules.insert(name.clone(), rule);
        if previous.is_some() {
            debug!(rule = %name, "replaced earlier rule registration");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Result<&BuildRule, RegistryError> {
        self.rules.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildRule> {
        self.rules.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Record `path` as a dependency of `rule` and hand it to the build system.
    ///
    /// Idempotent. Returns `true` only when the build system had not tracked it yet.
    pub fn add_dependency(
        &mut self,
        tracker: &mut dyn DependencyTracker,
        rule: &str,
        path: &Utf8Path,
    ) -> bool {
        self.dependencies
            .entry(rule.to_string())
            .or_default()
            .insert(path.to_path_buf());
        tracker.mark_dependency_tracked(path)
    }

    /// Dependencies recorded for `rule`, including those from replaced registrations.
    pub fn dependencies(&self, rule: &str) -> impl Iterator<Item = &Utf8Path> {
        self.dependencies
            .get(rule)
            .into_iter()
            .flat_map(|set| set.iter().map(|p| p.as_path()))
    }

    /// Rule names ordered so every gate comes before the rules it gates.
    ///
    /// Otherwise names keep their sorted order.
    pub fn execution_order(&self) -> Result<Vec<String>, RegistryError> {
        let mut order = Vec::with_capacity(self.rules.len());
        let mut placed: BTreeSet<&str> = BTreeSet::new();

        for name in self.rules.keys() {
            let mut chain: Vec<&str> = Vec::new();
            let mut current = Some(name.as_str());

            while let Some(n) = current {
                if placed.contains(n) {
                    break;
                }
                if chain.contains(&n) {
                    return Err(RegistryError::GateCycle {
                        rule: n.to_string(),
                    });
                }
                chain.push(n);

                current = match self.rules[n].gate() {
                    Some(gate) if !self.rules.contains_key(gate) => {
                        return Err(RegistryError::UnknownGate {
                            rule: n.to_string(),
                            gate: gate.to_string(),
                        });
                    }
                    other => other,
                };
            }

            for n in chain.into_iter().rev() {
                placed.insert(n);
                order.push(n.to_string());
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct SetTracker(BTreeSet<Utf8PathBuf>);

    impl DependencyTracker for SetTracker {
        fn mark_dependency_tracked(&mut self, path: &Utf8Path) -> bool {
            self.0.insert(path.to_path_buf())
        }

        fn is_tracked(&self, path: &Utf8Path) -> bool {
            self.0.contains(path)
        }

        fn tracked_count(&self) -> usize {
            self.0.len()
        }
    }

    fn status(code: i32) -> Box<dyn ToolAction> {
        Box::new(FnAction(move || code))
    }

    #[test]
    fn last_registration_wins() {
        let mut reg = RuleRegistry::new();
        assert!(reg.register("x", "a.in", "a.out", status(1)).is_none());
        let replaced = reg.register("x", "b.in", "b.out", status(2));

        assert!(replaced.is_some());
        assert_eq!(reg.len(), 1);
        let rule = reg.lookup("x").unwrap();
        assert_eq!(rule.trigger(), "b.in");
        assert_eq!(rule.action().run().unwrap(), 2);
    }

    #[test]
    fn lookup_unknown_is_not_found() {
        let reg = RuleRegistry::new();
        assert_eq!(
            reg.lookup("missing").unwrap_err(),
            RegistryError::NotFound {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn add_dependency_is_idempotent() {
        let mut reg = RuleRegistry::new();
        let mut tracker = SetTracker::default();

        assert!(reg.add_dependency(&mut tracker, "x", Utf8Path::new("data.csv")));
        assert_eq!(tracker.tracked_count(), 1);
        assert!(!reg.add_dependency(&mut tracker, "x", Utf8Path::new("data.csv")));
        assert_eq!(tracker.tracked_count(), 1);
        assert_eq!(reg.dependencies("x").count(), 1);
    }

    #[test]
    fn active_flag_is_set_once() {
        let rule = BuildRule::new(RuleSpec::new("x", "a", "b"), Box::new(NoopAction));
        assert_eq!(rule.active(), None);
        assert!(rule.is_active());

        rule.set_active(false).unwrap();
        assert!(!rule.is_active());
        assert!(matches!(
            rule.set_active(true),
            Err(RegistryError::ActiveAlreadySet { .. })
        ));
        assert!(!rule.is_active());
    }

    #[test]
    fn gates_come_first_in_execution_order() {
        let mut reg = RuleRegistry::new();
        reg.register_rule(BuildRule::new(
            RuleSpec::new("alpha", "a", "a.out").gated_by("zeta"),
            Box::new(NoopAction),
        ));
        reg.register_rule(BuildRule::new(
            RuleSpec::new("zeta", "z", "z.out"),
            Box::new(NoopAction),
        ));
        reg.register_rule(BuildRule::new(
            RuleSpec::new("mid", "m", "m.out"),
            Box::new(NoopAction),
        ));

        assert_eq!(reg.execution_order().unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn gate_cycle_and_unknown_gate_are_errors() {
        let mut reg = RuleRegistry::new();
        reg.register_rule(BuildRule::new(
            RuleSpec::new("a", "a", "a.out").gated_by("b"),
            Box::new(NoopAction),
        ));
        assert!(matches!(
            reg.execution_order(),
            Err(RegistryError::UnknownGate { .. })
        ));

        reg.register_rule(BuildRule::new(
            RuleSpec::new("b", "b", "b.out").gated_by("a"),
            Box::new(NoopAction),
        ));
        assert!(matches!(
            reg.execution_order(),
            Err(RegistryError::GateCycle { .. })
        ));
    }

    #[test]
    fn closure_actions_run_on_demand() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let action = FnAction(move || {
            counter.set(counter.get() + 1);
            0
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(action.run().unwrap(), 0);
        assert_eq!(calls.get(), 1);
    }
}
