//! Module listings (`mod.rs`) and the entity re-export map (`prelude.rs`).
//!
//! Both are append-only: merging never drops an entry or any other line that
//! is already on disk. Generated listings render fully sorted so identical
//! inputs give identical bytes.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use regex::Regex;

static MOD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*pub\s+mod\s+((?:r#)?[A-Za-z_][A-Za-z0-9_]*)\s*;")
        .expect("module line pattern is valid")
});

static REEXPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*pub\s+use\s+super::((?:r#)?[A-Za-z_][A-Za-z0-9_]*)::Entity\s+as\s+([A-Za-z_][A-Za-z0-9_]*)\s*;",
    )
    .expect("re-export line pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleIndex {
    modules: BTreeSet<String>,
}

impl ModuleIndex {
    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .filter_map(|line| MOD_LINE.captures(line))
                .map(|caps| caps[1].to_string()),
        )
    }

    pub fn insert(&mut self, module: impl Into<String>) -> bool {
        self.modules.insert(module.into())
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Union of the two listings.
    pub fn merge(&self, other: &ModuleIndex) -> ModuleIndex {
        ModuleIndex {
            modules: self.modules.union(&other.modules).cloned().collect(),
        }
    }

    pub fn render(&self) -> String {
        self.modules
            .iter()
            .map(|module| format!("pub mod {module};\n"))
            .collect()
    }
}

/// Entity re-exports keyed by source module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReexportIndex {
    entries: BTreeMap<String, String>,
}

impl ReexportIndex {
    pub fn parse(contents: &str) -> Self {
        Self {
            entries: contents
                .lines()
                .filter_map(|line| REEXPORT_LINE.captures(line))
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
                .collect(),
        }
    }

    pub fn insert(&mut self, module: impl Into<String>, exported: impl Into<String>) {
        self.entries.insert(module.into(), exported.into());
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.entries.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of `newer` win on the same module key.
    pub fn merge(&self, newer: &ReexportIndex) -> ReexportIndex {
        let mut entries = self.entries.clone();
        entries.extend(newer.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        ReexportIndex { entries }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(module, exported)| format!("pub use super::{module}::Entity as {exported};\n"))
            .collect()
    }
}

/// Merges planned module listing text into what is already on disk.
///
/// A file holding nothing but `pub mod` lines is re-rendered sorted. Any other
/// file keeps every existing line byte for byte; missing modules are spliced
/// in among the existing declarations.
pub fn merge_module_index(existing: &str, planned: &str) -> String {
    let current = ModuleIndex::parse(existing);
    let planned = ModuleIndex::parse(planned);
    if is_pure_listing(existing, &MOD_LINE) {
        return current.merge(&planned).render();
    }

    let mut lines = Lines::new(existing);
    for module in planned.modules().filter(|module| !current.contains(module)) {
        lines.insert_sorted(&MOD_LINE, module, format!("pub mod {module};"));
    }
    lines.finish()
}

/// Merges planned re-export text into what is already on disk, with the same
/// preservation rules as [`merge_module_index`]. A planned entry replaces only
/// the line of its own module.
pub fn merge_reexport_index(existing: &str, planned: &str) -> String {
    let current = ReexportIndex::parse(existing);
    let planned = ReexportIndex::parse(planned);
    if is_pure_listing(existing, &REEXPORT_LINE) {
        return current.merge(&planned).render();
    }

    let mut lines = Lines::new(existing);
    for (module, exported) in &planned.entries {
        let line = format!("pub use super::{module}::Entity as {exported};");
        match current.get(module) {
            Some(old) if old == exported => {}
            Some(_) => lines.replace(&REEXPORT_LINE, module, line),
            None => lines.insert_sorted(&REEXPORT_LINE, module, line),
        }
    }
    lines.finish()
}

fn is_pure_listing(contents: &str, pattern: &Regex) -> bool {
    contents
        .lines()
        .all(|line| line.trim().is_empty() || pattern.is_match(line))
}

/// Line buffer of a hand-maintained index file.
struct Lines {
    lines: Vec<String>,
    changed: bool,
    original: String,
}

impl Lines {
    fn new(contents: &str) -> Self {
        Self {
            lines: contents.lines().map(str::to_string).collect(),
            changed: false,
            original: contents.to_string(),
        }
    }

    /// Indices and keys of the lines `pattern` recognizes.
    fn listed(&self, pattern: &Regex) -> Vec<(usize, String)> {
        self.lines
            .iter()
            .enumerate()
            .filter_map(|(idx, line)| pattern.captures(line).map(|caps| (idx, caps[1].to_string())))
            .collect()
    }

    /// Inserts `line` before the first listed line whose key sorts after
    /// `key`, above that line's attributes; otherwise after the last listed
    /// line, or at the end of the file when nothing is listed.
    fn insert_sorted(&mut self, pattern: &Regex, key: &str, line: String) {
        let listed = self.listed(pattern);
        let position = match listed.iter().find(|(_, listed_key)| listed_key.as_str() > key) {
            Some((idx, _)) => self.attributes_start(*idx),
            None => match listed.last() {
                Some((idx, _)) => idx + 1,
                None => {
                    if self.lines.last().is_some_and(|last| !last.trim().is_empty()) {
                        self.lines.push(String::new());
                    }
                    self.lines.len()
                }
            },
        };
        self.lines.insert(position, line);
        self.changed = true;
    }

    fn replace(&mut self, pattern: &Regex, key: &str, line: String) {
        if let Some((idx, _)) = self.listed(pattern).into_iter().find(|(_, k)| k == key) {
            self.lines[idx] = line;
            self.changed = true;
        }
    }

    fn attributes_start(&self, idx: usize) -> usize {
        let mut start = idx;
        while start > 0 && self.lines[start - 1].trim_start().starts_with("#[") {
            start -= 1;
        }
        start
    }

    fn finish(self) -> String {
        if !self.changed {
            return self.original;
        }
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_index_renders_sorted_with_single_trailing_newline() {
        let index = ModuleIndex::new(["user", "order_item", "prelude"]);
        assert_eq!(index.render(), "pub mod order_item;\npub mod prelude;\npub mod user;\n");
    }

    #[test]
    fn module_merge_is_append_only_and_dedups() {
        let existing = "pub mod user;\n\npub mod legacy;\n";
        let merged = merge_module_index(existing, "pub mod user;\npub mod account;\n");
        assert_eq!(merged, "pub mod account;\npub mod legacy;\npub mod user;\n");
        assert_eq!(merge_module_index(&merged, "pub mod user;\n"), merged);
    }

    #[test]
    fn hand_written_code_around_modules_is_kept() {
        let existing = "use axum::Router;\n\npub mod auth;\npub mod todo;\n\n// kept by hand\npub fn router() -> Router {\n    Router::new()\n}\n";
        let merged = merge_module_index(existing, "pub mod users;\npub mod auth;\npub mod billing;\n");
        assert_eq!(
            merged,
            "use axum::Router;\n\npub mod auth;\npub mod billing;\npub mod todo;\npub mod users;\n\n// kept by hand\npub fn router() -> Router {\n    Router::new()\n}\n"
        );
        assert_eq!(merge_module_index(&merged, "pub mod users;\n"), merged);
    }

    #[test]
    fn new_modules_go_above_attributes_of_the_next_one() {
        let existing = "pub mod alpha;\n#[cfg(test)]\npub mod tests;\n\nfn helper() {}\n";
        let merged = merge_module_index(existing, "pub mod beta;\n");
        assert_eq!(
            merged,
            "pub mod alpha;\npub mod beta;\n#[cfg(test)]\npub mod tests;\n\nfn helper() {}\n"
        );
    }

    #[test]
    fn file_without_declarations_gets_them_appended() {
        let existing = "pub fn router() {}\n";
        let merged = merge_module_index(existing, "pub mod users;\n");
        assert_eq!(merged, "pub fn router() {}\n\npub mod users;\n");
    }

    #[test]
    fn reexports_keep_hand_written_lines() {
        let existing = "pub use super::user::Entity as User;\npub use super::extra::Thing;\n";
        let merged = merge_reexport_index(
            existing,
            "pub use super::user::Entity as Account;\npub use super::order::Entity as Order;\n",
        );
        assert_eq!(
            merged,
            "pub use super::order::Entity as Order;\npub use super::user::Entity as Account;\npub use super::extra::Thing;\n"
        );
    }

    #[test]
    fn parses_indented_and_raw_modules() {
        let index = ModuleIndex::parse("  pub mod r#type;\npub   mod  user ;\nmod private;\n");
        assert!(index.contains("r#type"));
        assert!(index.contains("user"));
        assert!(!index.contains("private"));
    }

    #[test]
    fn reexport_merge_overwrites_only_same_key() {
        let existing = "pub use super::user::Entity as User;\npub use super::order::Entity as Order;\n";
        let planned = "pub use super::user::Entity as Account;\n";
        let merged = merge_reexport_index(existing, planned);
        assert_eq!(
            merged,
            "pub use super::order::Entity as Order;\npub use super::user::Entity as Account;\n"
        );
        let index = ReexportIndex::parse(&merged);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("user"), Some("Account"));
    }

    #[test]
    fn empty_indexes_render_empty() {
        assert_eq!(ModuleIndex::default().render(), "");
        assert!(ReexportIndex::parse("fn main() {}\n").is_empty());
    }
}
