#![no_main]

//! Fuzz target for status-file and macro-file parsing.
//!
//! Arbitrary text must never panic the section parser, and stability must
//! stay consistent between the boolean check and the itemised report.

use auxmk_status::{
    StatusFormat, check_stability, is_unstable, parse_dependency_declarations, parse_section,
};
use auxmk_types::status::{SECTION_PRINT, SECTION_PRINTED};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let format = StatusFormat::default();
    let printed = parse_section(s, &format, SECTION_PRINTED);
    let print = parse_section(s, &format, SECTION_PRINT);
    let report = check_stability(&printed, &print);
    assert_eq!(report.is_unstable(), is_unstable(&printed, &print));

    for path in parse_dependency_declarations(s) {
        assert!(!path.as_str().is_empty());
    }
});
