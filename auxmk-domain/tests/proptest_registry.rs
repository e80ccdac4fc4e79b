//! Property-based tests for the rule registry.
//!
//! These tests verify that:
//! - The last registration under a name is the one retrievable
//! - Dependency registration never shrinks or double-counts the tracked set
//! - Execution order always places gates before the rules they gate

use auxmk_domain::{BuildRule, DependencyTracker, FnAction, NoopAction, RuleRegistry};
use auxmk_types::rule::RuleSpec;
use camino::{Utf8Path, Utf8PathBuf};
use proptest::prelude::*;
use std::collections::BTreeSet;

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

fn arb_paths() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex(r"[a-z]{1,4}/[a-z]{1,6}\.(tex|csv|pdf)").unwrap(),
        0..20,
    )
}

proptest! {
    #[test]
    fn last_registration_wins(codes in prop::collection::vec(0i32..50, 1..6)) {
        let mut registry = RuleRegistry::new();
        for code in &codes {
            let code = *code;
            registry.register("x", "x.in", "x.out", Box::new(FnAction(move || code)));
        }
        prop_assert_eq!(registry.len(), 1);
        let last = *codes.last().unwrap();
        prop_assert_eq!(registry.lookup("x").unwrap().action().run().unwrap(), last);
    }

    #[test]
    fn dependency_registration_is_monotonic_and_idempotent(paths in arb_paths()) {
        let mut registry = RuleRegistry::new();
        let mut tracker = SetTracker::default();
        let mut previous = 0;

        for p in &paths {
            let path = Utf8Path::new(p);
            let already = tracker.is_tracked(path);
            let newly = registry.add_dependency(&mut tracker, "pythontex", path);
            prop_assert_eq!(newly, !already);
            prop_assert!(tracker.tracked_count() >= previous);
            previous = tracker.tracked_count();

            prop_assert!(!registry.add_dependency(&mut tracker, "pythontex", path));
            prop_assert_eq!(tracker.tracked_count(), previous);
        }

        let unique: BTreeSet<&String> = paths.iter().collect();
        prop_assert_eq!(tracker.tracked_count(), unique.len());
    }

    #[test]
    fn gates_precede_gated_rules(n in 1usize..8, gate_picks in prop::collection::vec(any::<prop::sample::Index>(), 8)) {
        // Rule i may only be gated by a rule with a smaller index, so no cycles exist.
        let mut registry = RuleRegistry::new();
        for i in 0..n {
            let name = format!("r{i}");
            let mut spec = RuleSpec::new(name.clone(), format!("{name}.in"), format!("{name}.out"));
            if i > 0 {
                let g = gate_picks[i].index(i);
                spec = spec.gated_by(format!("r{g}"));
            }
            registry.register_rule(BuildRule::new(spec, Box::new(NoopAction)));
        }

        let order = registry.execution_order().unwrap();
        prop_assert_eq!(order.len(), n);
        for rule in registry.iter() {
            if let Some(gate) = rule.gate() {
                let gi = order.iter().position(|r| r == gate).unwrap();
                let ri = order.iter().position(|r| r == rule.name()).unwrap();
                prop_assert!(gi < ri);
            }
        }
    }
}
