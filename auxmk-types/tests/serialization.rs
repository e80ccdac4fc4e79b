use auxmk_types::outcome::{FailureKind, PassOutcome};
use auxmk_types::report::{PassReport, ToolInfo, TrackedFiles};
use auxmk_types::rule::RuleSpec;
use auxmk_types::status::{ItemState, StatusSnapshot};
use pretty_assertions::assert_eq;

fn tool() -> ToolInfo {
    ToolInfo {
        name: "auxmk".to_string(),
        version: Some("0.0.0".to_string()),
    }
}

#[test]
fn outcome_serializes_with_status_tag() {
    let deferred = serde_json::to_value(PassOutcome::deferred("gate unstable")).expect("serialize");
    assert_eq!(
        deferred,
        serde_json::json!({ "status": "deferred", "reason": "gate unstable" })
    );

    let failed = serde_json::to_value(PassOutcome::tool_failed(4)).expect("serialize");
    assert_eq!(failed["status"], "failed");
    assert_eq!(failed["failure"]["kind"], "tool_execution");
    assert_eq!(failed["failure"]["status"], 4);
}

#[test]
fn plain_success_omits_empty_fields() {
    let value = serde_json::to_value(PassOutcome::success(vec![])).expect("serialize");
    assert!(value.get("new_dependencies").is_none());
    assert!(value.get("reason").is_none());
    assert_eq!(value["rerun_requested"], false);
}

#[test]
fn outcome_json_roundtrip_preserves_failure_kind() {
    let original = PassOutcome::fatal_precondition("missing doc.xsim");
    let s = serde_json::to_string(&original).expect("serialize");
    let back: PassOutcome = serde_json::from_str(&s).expect("deserialize");
    assert_eq!(back, original);
    assert_eq!(back.failure(), Some(FailureKind::FatalPrecondition));
}

#[test]
fn report_tracks_another_pass_and_exit_code() {
    let mut report = PassReport::new(tool(), 2);
    report.push("xsim", PassOutcome::success(vec![]));
    assert!(!report.another_pass_needed);
    assert_eq!(report.exit_code(), 0);

    report.push("pythontex", PassOutcome::deferred("xsim unstable"));
    assert!(report.another_pass_needed);

    report.push("other", PassOutcome::tool_failed(7));
    assert_eq!(report.exit_code(), 7);
    assert_eq!(report.failures().count(), 1);

    let value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(value["schema"], "auxmk.pass.v1");
    assert_eq!(value["pass"], 2);
    assert_eq!(value["rules"].as_array().map(Vec::len), Some(3));
}

#[test]
fn rule_spec_omits_missing_gate() {
    let spec = RuleSpec::new("xsim", "doc.xsim", "doc.xsim");
    let value = serde_json::to_value(&spec).expect("serialize");
    assert!(value.get("gate").is_none());

    let gated = RuleSpec::new("pythontex", "doc.pytxcode", "out.pytxmcr").gated_by("xsim");
    let value = serde_json::to_value(&gated).expect("serialize");
    assert_eq!(value["gate"], "xsim");
}

#[test]
fn tracked_files_default_schema() {
    let tracked = TrackedFiles::default();
    assert_eq!(tracked.schema, "auxmk.tracked.v1");
    assert!(tracked.paths.is_empty());

    let parsed: TrackedFiles =
        serde_json::from_str(r#"{ "schema": "auxmk.tracked.v1" }"#).expect("deserialize");
    assert!(parsed.paths.is_empty());
}

#[test]
fn snapshot_states_serialize_snake_case() {
    let snap = StatusSnapshot::from_entries("print", [("exercise-1", ItemState::True)]);
    let value = serde_json::to_value(&snap).expect("serialize");
    assert_eq!(value["section"], "print");
    assert_eq!(value["entries"]["exercise-1"], "true");
}
