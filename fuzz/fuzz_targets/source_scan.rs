#![no_main]

//! Fuzz target for the include-following source scanner.
//!
//! Files may include each other in any shape, including themselves; the
//! scan must still terminate.

use arbitrary::Arbitrary;
use auxmk_domain::{InMemorySourceView, SourceScanner, TriggerPattern};
use camino::Utf8Path;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Project {
    files: Vec<(u8, String)>,
}

fuzz_target!(|project: Project| {
    let mut view = InMemorySourceView::new();
    for (idx, contents) in project.files.into_iter().take(16) {
        view = view.with_file(format!("f{}.tex", idx % 8), contents);
    }

    let mut scanner = SourceScanner::new(&view, TriggerPattern::ALL);
    let _ = scanner.scan(Utf8Path::new("f0.tex"));
    assert!(scanner.visited().contains(Utf8Path::new("f0.tex")));
});
