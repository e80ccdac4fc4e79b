//! Explicit build context handed to every controller call.

use crate::ports::BuildSystem;
use auxmk_domain::RuleRegistry;
use auxmk_types::outcome::PassOutcome;
use camino::Utf8Path;
use std::collections::BTreeMap;
use tracing::debug;

/// Registry, build system and per-pass bookkeeping for one build.
///
/// Outcomes recorded during a pass are cleared by [`BuildSession::begin_pass`].
pub struct BuildSession {
    registry: RuleRegistry,
    build: Box<dyn BuildSystem>,
    pass: u32,
    outcomes: BTreeMap<String, PassOutcome>,
}

impl BuildSession {
    pub fn new(registry: RuleRegistry, build: Box<dyn BuildSystem>) -> Self {
        Self {
            registry,
            build,
            pass: 0,
            outcomes: BTreeMap::new(),
        }
    }

    /// Start the next pass and return its number (1-based).
    pub fn begin_pass(&mut self) -> u32 {
        self.pass += 1;
        self.outcomes.clear();
        debug!(pass = self.pass, "pass started");
        self.pass
    }

    /// Current pass number; 0 before the first [`BuildSession::begin_pass`].
    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    pub fn build_system(&self) -> &dyn BuildSystem {
        self.build.as_ref()
    }

    pub fn build_system_mut(&mut self) -> &mut dyn BuildSystem {
        self.build.as_mut()
    }

    /// Outcome recorded for `rule` in the current pass.
    pub fn outcome(&self, rule: &str) -> Option<&PassOutcome> {
        self.outcomes.get(rule)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &PassOutcome)> {
        self.outcomes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn record(&mut self, rule: &str, outcome: PassOutcome) {
        self.outcomes.insert(rule.to_string(), outcome);
    }

    pub(crate) fn register_dependency(&mut self, rule: &str, path: &Utf8Path) -> bool {
        self.registry.add_dependency(self.build.as_mut(), rule, path)
    }
}
