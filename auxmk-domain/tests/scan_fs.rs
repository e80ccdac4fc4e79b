//! Source scanning and rule activation against a real directory tree.

use auxmk_domain::{
    BuildRule, FsSourceView, NoopAction, RULE_CATALOG, RuleRegistry, ScanPolicy, activate_rules,
    scan_for_trigger,
};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, contents).expect("write");
    }
    (temp, root)
}

fn catalog_registry(job: &str) -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for t in RULE_CATALOG {
        registry.register_rule(
            BuildRule::new(t.spec(job), Box::new(NoopAction)).with_patterns(t.patterns.iter().copied()),
        );
    }
    registry
}

#[test]
fn mutually_including_files_terminate() {
    let (_temp, root) = project(&[
        ("main.tex", "\\documentclass{article}\n\\input{a}\n"),
        ("a.tex", "\\input{b}\n"),
        ("b.tex", "\\input{a}\n\\input{main}\n"),
    ]);
    let view = FsSourceView::new(root);
    let needed = scan_for_trigger(
        &view,
        Some(Utf8Path::new("main.tex")),
        &[auxmk_domain::TriggerPattern::PythontexEnvironment],
        ScanPolicy::FailOpen,
    );
    assert!(!needed);
}

#[test]
fn nested_inclusion_activates_only_needed_rules() {
    let (_temp, root) = project(&[
        (
            "main.tex",
            "\\documentclass{article}\n\\usepackage{pythontex}\n\\begin{document}\n\\input{parts/intro}\n\\end{document}\n",
        ),
        ("parts/intro.tex", "Some prose.\n"),
    ]);
    let view = FsSourceView::new(root);
    let registry = catalog_registry("main");

    let verdicts = activate_rules(
        &registry,
        &view,
        Some(Utf8Path::new("main.tex")),
        ScanPolicy::FailClosed,
    )
    .expect("activate");

    assert_eq!(verdicts.get("pythontex"), Some(&true));
    assert_eq!(verdicts.get("xsim"), Some(&false));
    assert!(registry.lookup("pythontex").unwrap().is_active());
    assert!(!registry.lookup("xsim").unwrap().is_active());
}

#[test]
fn activation_happens_once_per_session() {
    let (_temp, root) = project(&[("main.tex", "\\begin{exercise}\n")]);
    let view = FsSourceView::new(root);
    let registry = catalog_registry("main");

    activate_rules(&registry, &view, Some(Utf8Path::new("main.tex")), ScanPolicy::FailOpen)
        .expect("first activation");
    let again = activate_rules(&registry, &view, Some(Utf8Path::new("main.tex")), ScanPolicy::FailOpen);
    assert!(again.is_err());
}

#[test]
fn unknown_primary_file_uses_policy() {
    let (_temp, root) = project(&[]);
    let view = FsSourceView::new(root);

    let open = catalog_registry("doc");
    let verdicts = activate_rules(&open, &view, None, ScanPolicy::FailOpen).expect("activate");
    assert!(verdicts.values().all(|v| *v));

    let closed = catalog_registry("doc");
    let verdicts = activate_rules(&closed, &view, None, ScanPolicy::FailClosed).expect("activate");
    assert!(verdicts.values().all(|v| !*v));
}
