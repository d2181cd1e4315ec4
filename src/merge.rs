//! Marker-delimited region replacement for entity files.

pub const MARKER_START: &str = "// <oxide-codegen:begin> generated code, edits inside are replaced";
pub const MARKER_END: &str = "// <oxide-codegen:end>";

const START_SENTINEL: &str = "<oxide-codegen:begin>";
const END_SENTINEL: &str = "<oxide-codegen:end>";

/// Byte span of the generated region: from the first byte after the start
/// marker line up to the first byte of the end marker line.
fn region_span(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    let mut start = None;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        match start {
            None if is_marker(line, START_SENTINEL) => start = Some(offset),
            Some(region_start) if is_marker(line, END_SENTINEL) => {
                return Some((region_start, line_start));
            }
            _ => {}
        }
    }
    None
}

fn is_marker(line: &str, sentinel: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") && trimmed.contains(sentinel)
}

pub fn has_markers(text: &str) -> bool {
    region_span(text).is_some()
}

/// Text strictly between the markers.
pub fn generated_region(text: &str) -> Option<&str> {
    region_span(text).map(|(start, end)| &text[start..end])
}

/// Replaces the generated region of `existing` with the region of `generated`.
///
/// Returns `None` when either side lacks a complete marker pair; the caller
/// then treats the file as an ordinary conflict.
pub fn merge_region(existing: &str, generated: &str) -> Option<String> {
    let (start, end) = region_span(existing)?;
    let region = generated_region(generated)?;
    let mut merged = String::with_capacity(existing.len() + region.len());
    merged.push_str(&existing[..start]);
    merged.push_str(region);
    merged.push_str(&existing[end..]);
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(before: &str, region: &str, after: &str) -> String {
        format!("{before}{MARKER_START}\n{region}{MARKER_END}\n{after}")
    }

    #[test]
    fn preserves_text_outside_markers() {
        let existing = wrap(
            "// hand-written header\nuse crate::helpers;\n",
            "pub struct Model {\n    pub id: i32,\n}\n",
            "\nimpl Model {\n    pub fn label(&self) -> String { self.id.to_string() }\n}\n",
        );
        let generated = wrap(
            "",
            "pub struct Model {\n    pub id: i32,\n    pub name: String,\n}\n",
            "\nimpl ActiveModelBehavior for ActiveModel {}\n",
        );

        let merged = merge_region(&existing, &generated).expect("both files have markers");

        assert!(merged.starts_with("// hand-written header\nuse crate::helpers;\n"));
        assert!(merged.ends_with(
            "\nimpl Model {\n    pub fn label(&self) -> String { self.id.to_string() }\n}\n"
        ));
        assert_eq!(
            generated_region(&merged),
            Some("pub struct Model {\n    pub id: i32,\n    pub name: String,\n}\n")
        );
        assert!(!merged.contains("ActiveModelBehavior"));
    }

    #[test]
    fn merging_identical_region_is_identity() {
        let existing = wrap("a\n", "b\n", "c");
        assert_eq!(merge_region(&existing, &existing).as_deref(), Some(existing.as_str()));
    }

    #[test]
    fn missing_marker_is_unmergeable() {
        let generated = wrap("", "x\n", "");
        assert_eq!(merge_region("pub struct Model;\n", &generated), None);
        let start_only = format!("{MARKER_START}\npub struct Model;\n");
        assert_eq!(merge_region(&start_only, &generated), None);
        assert!(!has_markers(&start_only));
    }

    #[test]
    fn end_marker_before_start_is_ignored() {
        let text = format!("{MARKER_END}\n{MARKER_START}\nbody\n");
        assert!(!has_markers(&text));
    }

    #[test]
    fn indented_markers_are_recognized() {
        let text = format!("mod inner {{\n    {MARKER_START}\n    x\n    {MARKER_END}\n}}\n");
        assert_eq!(generated_region(&text), Some("    x\n"));
    }
}
