//! Property-based tests for naming, index merging and marker-region merging.

use proptest::prelude::*;

use oxide_codegen::{
    index::{ModuleIndex, merge_module_index},
    merge::{MARKER_END, MARKER_START, merge_region},
    naming::{is_valid_ident, to_pascal_case, to_snake_case},
};

// Strategy: snake_case table and column names
fn arb_snake_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]*(_[a-z][a-z0-9]*)*"
}

// Strategy: whole lines of plain text, never a marker
fn arb_lines() -> impl Strategy<Value = String> {
    "([a-z ;{}]{0,20}\n){0,4}"
}

fn arb_modules() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6)
}

fn wrap(before: &str, region: &str, after: &str) -> String {
    format!("{before}{MARKER_START}\n{region}{MARKER_END}\n{after}")
}

proptest! {
    /// Property: snake(pascal(x)) is a fixed point after one application
    #[test]
    fn proptest_snake_pascal_is_idempotent(name in arb_snake_name()) {
        let once = to_snake_case(&to_pascal_case(&name));
        let twice = to_snake_case(&to_pascal_case(&once));
        prop_assert_eq!(&twice, &once);
        prop_assert!(is_valid_ident(&once));
    }

    /// Property: pascal case is stable under re-application
    #[test]
    fn proptest_pascal_is_idempotent(name in arb_snake_name()) {
        let once = to_pascal_case(&name);
        prop_assert_eq!(to_pascal_case(&once), once);
    }

    /// Property: text outside the markers is kept byte for byte and the
    /// region is taken from the generated file
    #[test]
    fn proptest_region_merge_keeps_hand_written_text(
        before in arb_lines(),
        old_region in arb_lines(),
        new_region in arb_lines(),
        after in "[a-z ;{}\n]{0,60}",
        generated_tail in arb_lines(),
    ) {
        let existing = wrap(&before, &old_region, &after);
        let generated = wrap("", &new_region, &generated_tail);

        let merged = merge_region(&existing, &generated).expect("markers present");

        prop_assert_eq!(merged, wrap(&before, &new_region, &after));
    }

    /// Property: merging a planned index into an existing one keeps every
    /// module of both and a second merge changes nothing
    #[test]
    fn proptest_module_index_merge_is_a_stable_union(
        existing in arb_modules(),
        planned in arb_modules(),
    ) {
        let existing_text = ModuleIndex::new(existing.iter().map(String::as_str)).render();
        let planned_text = ModuleIndex::new(planned.iter().map(String::as_str)).render();

        let merged = merge_module_index(&existing_text, &planned_text);
        let index = ModuleIndex::parse(&merged);
        for module in existing.iter().chain(&planned) {
            prop_assert!(index.contains(module));
        }
        prop_assert_eq!(merge_module_index(&merged, &planned_text), merged);
    }
}
