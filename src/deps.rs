//! Declares the crates generated code needs in the project's `Cargo.toml`.
//!
//! The manifest is patched as text so comments and layout survive. A crate
//! already declared in a `[dependencies]`, `[workspace.dependencies]` or
//! `[target.*.dependencies]` table, either as a key (`name = ...`,
//! `name.workspace = true`) or as its own `[dependencies.name]` table, is
//! left alone, which makes patching idempotent.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    sync::LazyLock,
};

use regex::Regex;
use serde::Serialize;

use crate::{
    error::{CodegenError, CodegenResult},
    layer::{LayerConfig, LayerKind},
    schema::{OverrideSet, Table},
};

pub const PATCH_HEADER: &str = "# Added by oxide-codegen";

static DEPENDENCIES_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\[dependencies\][ \t]*(?:#[^\n]*)?\r?$")
        .expect("dependencies header pattern is valid")
});

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*\[[ \t]*([^\[\]]+?)[ \t]*\][ \t]*(?:#.*)?$")
        .expect("table header pattern is valid")
});

/// Crate name and the declaration line inserted for it.
const CATALOG: &[(&str, &str)] = &[
    ("axum", r#"axum = { version = "0.8.7", features = ["json"] }"#),
    ("chrono", r#"chrono = { version = "0.4", features = ["clock", "serde", "std"] }"#),
    ("rust_decimal", r#"rust_decimal = { version = "1", features = ["serde"] }"#),
    (
        "sea-orm",
        r#"sea-orm = { version = "2.0.0-rc.26", features = ["macros", "runtime-tokio-rustls", "sqlx-postgres", "with-chrono", "with-uuid", "with-json", "with-rust_decimal"] }"#,
    ),
    ("serde", r#"serde = { version = "1.0.228", features = ["derive"] }"#),
    ("serde_json", r#"serde_json = "1.0.145""#),
    ("typed-builder", r#"typed-builder = "0.21""#),
    ("utoipa", r#"utoipa = { version = "5", features = ["chrono", "uuid"] }"#),
    ("uuid", r#"uuid = { version = "1.11", features = ["v4", "serde"] }"#),
    ("validator", r#"validator = { version = "0.20", features = ["derive"] }"#),
];

pub fn declaration(name: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(crate_name, _)| *crate_name == name)
        .map(|(_, line)| *line)
}

fn layer_crates(kind: LayerKind) -> &'static [&'static str] {
    match kind {
        LayerKind::Entity | LayerKind::Service => &["sea-orm"],
        LayerKind::Dto | LayerKind::Vo => &["serde"],
        LayerKind::Route => &["axum", "sea-orm", "serde"],
    }
}

fn trait_crate(name: &str) -> Option<&'static str> {
    match name {
        "Serialize" | "Deserialize" => Some("serde"),
        "ToSchema" => Some("utoipa"),
        "Validate" => Some("validator"),
        "TypedBuilder" => Some("typed-builder"),
        _ => None,
    }
}

fn type_crate(token: &str) -> Option<&'static str> {
    match token {
        "Decimal" => Some("rust_decimal"),
        "Uuid" => Some("uuid"),
        "Date" | "Time" | "DateTime" | "DateTimeUtc" | "DateTimeLocal"
        | "DateTimeWithTimeZone" => Some("chrono"),
        "Json" => Some("serde_json"),
        _ => None,
    }
}

/// Crates the enabled layers need for `tables`.
pub fn required_dependencies(
    layers: &BTreeMap<LayerKind, LayerConfig>,
    overrides: &OverrideSet,
    tables: &[&Table],
) -> BTreeSet<&'static str> {
    let mut required = BTreeSet::new();

    for layer in layers.values().filter(|layer| layer.enabled) {
        let mut used = false;
        for table in tables {
            let table_override = overrides.get(&table.name);
            if !layer.enabled_for(table_override) {
                continue;
            }
            used = true;
            required.extend(
                layer
                    .traits_for(table_override)
                    .iter()
                    .filter_map(|name| trait_crate(name)),
            );
            for column in &table.columns {
                required.extend(
                    column
                        .rust_type
                        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                        .filter_map(type_crate),
                );
            }
            let stamps_time = layer.kind == LayerKind::Service
                && (table.created_at_column().is_some() || table.updated_at_column().is_some());
            if stamps_time {
                required.insert("chrono");
            }
        }
        if used {
            required.extend(layer_crates(layer.kind).iter().copied());
            if layer.kind == LayerKind::Route && layer.validation {
                required.insert("validator");
            }
        }
    }

    required
}

pub fn is_declared(manifest: &str, name: &str) -> bool {
    let mut in_dependencies = false;
    for line in manifest.lines() {
        if line.trim_start().starts_with('[') {
            let header = TABLE_HEADER
                .captures(line.trim_end_matches('\r'))
                .and_then(|caps| caps.get(1))
                .map_or("", |header| header.as_str());
            let own_table = header
                .strip_suffix(name)
                .and_then(|table| table.strip_suffix('.'))
                .is_some_and(is_dependency_table);
            if own_table {
                return true;
            }
            in_dependencies = is_dependency_table(header);
        } else if in_dependencies && declares(line, name) {
            return true;
        }
    }
    false
}

/// `dependencies`, `workspace.dependencies` or `target.<cfg>.dependencies`.
fn is_dependency_table(header: &str) -> bool {
    header == "dependencies" || header.ends_with(".dependencies")
}

fn declares(line: &str, name: &str) -> bool {
    line.trim_start()
        .strip_prefix(name)
        .map(str::trim_start)
        .is_some_and(|rest| rest.starts_with('=') || rest.starts_with('.'))
}

/// Adds declarations for every missing crate in `required`; `None` when
/// nothing is missing.
pub fn patch_manifest_text(manifest: &str, required: &BTreeSet<&str>) -> Option<(String, Vec<String>)> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| !is_declared(manifest, name))
        .filter(|name| declaration(name).is_some())
        .collect();
    if missing.is_empty() {
        return None;
    }

    let mut block = format!("{PATCH_HEADER}\n");
    for name in &missing {
        if let Some(line) = declaration(name) {
            block.push_str(line);
            block.push('\n');
        }
    }

    let patched = match DEPENDENCIES_HEADER.find(manifest) {
        Some(header) => {
            let line_end = manifest[header.end()..]
                .find('\n')
                .map(|offset| header.end() + offset + 1)
                .unwrap_or(manifest.len());
            let mut out = String::with_capacity(manifest.len() + block.len() + 1);
            out.push_str(&manifest[..line_end]);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            out.push_str(&manifest[line_end..]);
            out
        }
        None => {
            let mut out = manifest.to_string();
            if !out.is_empty() {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str("[dependencies]\n");
            out.push_str(&block);
            out
        }
    };

    Some((patched, missing.into_iter().map(str::to_string).collect()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatchOutcome {
    ManifestMissing,
    UpToDate,
    Patched { added: Vec<String> },
    /// Dry run: what would have been added.
    Pending { missing: Vec<String> },
}

/// Patches the manifest at `path`. A missing manifest is not an error.
pub fn patch_manifest(
    path: &Path,
    required: &BTreeSet<&str>,
    dry_run: bool,
) -> CodegenResult<PatchOutcome> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "manifest not found, skipping dependency patch");
        return Ok(PatchOutcome::ManifestMissing);
    }
    let manifest = fs::read_to_string(path).map_err(|err| CodegenError::io("read", path, err))?;
    let Some((patched, added)) = patch_manifest_text(&manifest, required) else {
        return Ok(PatchOutcome::UpToDate);
    };
    if dry_run {
        return Ok(PatchOutcome::Pending { missing: added });
    }
    fs::write(path, patched).map_err(|err| CodegenError::io("write", path, err))?;
    tracing::info!(path = %path.display(), added = ?added, "patched manifest dependencies");
    Ok(PatchOutcome::Patched { added })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, TableOverride};

    const MANIFEST: &str = "[package]\nname = \"shop\"\nversion = \"0.1.0\"\n\n[dependencies]\ntokio = \"1\"\n\n[dev-dependencies]\ntempfile = \"3\"\n";

    fn required(names: &[&'static str]) -> BTreeSet<&'static str> {
        names.iter().copied().collect()
    }

    #[test]
    fn inserts_missing_crates_under_dependencies() {
        let (patched, added) =
            patch_manifest_text(MANIFEST, &required(&["serde", "uuid"])).expect("patch applies");

        assert_eq!(added, vec!["serde", "uuid"]);
        let expected = format!(
            "[package]\nname = \"shop\"\nversion = \"0.1.0\"\n\n[dependencies]\n{PATCH_HEADER}\n{}\n{}\ntokio = \"1\"\n\n[dev-dependencies]\ntempfile = \"3\"\n",
            declaration("serde").expect("serde"),
            declaration("uuid").expect("uuid"),
        );
        assert_eq!(patched, expected);
        assert_eq!(patch_manifest_text(&patched, &required(&["serde", "uuid"])), None);
    }

    #[test]
    fn declared_in_any_dependency_table_counts() {
        let manifest = "[workspace.dependencies]\nserde.workspace = true\n\n[dependencies]\n  uuid = \"1\"\n";
        assert!(is_declared(manifest, "serde"));
        assert!(is_declared(manifest, "uuid"));
        assert!(!is_declared(manifest, "serde_json"));
        assert!(!is_declared("serde_json = \"1\"\n", "serde"));
    }

    #[test]
    fn declarations_only_count_in_dependency_tables() {
        let manifest = "[package]\nname = \"shop\"\n\n[dependencies.serde]\nversion = \"1\"\nfeatures = [\"derive\"]\n\n[features]\naxum = [\"dep:axum\"]\nchrono.workspace = true\n\n[dev-dependencies]\nuuid = \"1\"\n\n[target.'cfg(unix)'.dependencies]\nsea-orm = \"1\"\n";
        assert!(is_declared(manifest, "serde"));
        assert!(is_declared(manifest, "sea-orm"));
        assert!(!is_declared(manifest, "axum"));
        assert!(!is_declared(manifest, "chrono"));
        assert!(!is_declared(manifest, "uuid"));
        assert!(!is_declared(manifest, "version"));

        let (patched, added) =
            patch_manifest_text(manifest, &required(&["axum", "serde"])).expect("axum is missing");
        assert_eq!(added, vec!["axum".to_string()]);
        assert!(patched.contains("[dependencies.serde]"));
    }

    #[test]
    fn appends_section_when_absent() {
        let (patched, _) = patch_manifest_text("[package]\nname = \"x\"", &required(&["serde_json"]))
            .expect("patch applies");
        assert_eq!(
            patched,
            format!(
                "[package]\nname = \"x\"\n\n[dependencies]\n{PATCH_HEADER}\nserde_json = \"1.0.145\"\n"
            )
        );
    }

    #[test]
    fn missing_manifest_is_a_no_op() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = patch_manifest(&dir.path().join("Cargo.toml"), &required(&["serde"]), false)
            .expect("no error");
        assert_eq!(outcome, PatchOutcome::ManifestMissing);
    }

    #[test]
    fn patching_twice_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Cargo.toml");
        fs::write(&path, MANIFEST).expect("write manifest");

        let first = patch_manifest(&path, &required(&["chrono", "serde"]), false).expect("patch");
        assert_eq!(
            first,
            PatchOutcome::Patched {
                added: vec!["chrono".to_string(), "serde".to_string()]
            }
        );
        let after_first = fs::read_to_string(&path).expect("read");
        let second = patch_manifest(&path, &required(&["chrono", "serde"]), false).expect("patch");
        assert_eq!(second, PatchOutcome::UpToDate);
        assert_eq!(fs::read_to_string(&path).expect("read"), after_first);
    }

    #[test]
    fn requirements_follow_layers_traits_and_types() {
        let table = Table {
            name: "orders".to_string(),
            comment: None,
            columns: vec![
                Column {
                    name: "id".to_string(),
                    rust_type: "Uuid".to_string(),
                    primary_key: true,
                    ..Default::default()
                },
                Column {
                    name: "total".to_string(),
                    rust_type: "Decimal".to_string(),
                    ..Default::default()
                },
                Column {
                    name: "tags".to_string(),
                    rust_type: "Vec<String>".to_string(),
                    ..Default::default()
                },
            ],
            primary_keys: vec!["id".to_string()],
            strip_prefix: String::new(),
            schema: String::new(),
            entity_name_override: None,
        };
        let mut layers: BTreeMap<LayerKind, LayerConfig> = LayerKind::ALL
            .into_iter()
            .map(|kind| {
                let mut config = LayerConfig::new(kind);
                config.enabled = matches!(kind, LayerKind::Dto | LayerKind::Route);
                (kind, config)
            })
            .collect();
        if let Some(route) = layers.get_mut(&LayerKind::Route) {
            route.validation = true;
        }
        let mut overrides = OverrideSet::default();
        overrides.tables.insert(
            "orders".to_string(),
            TableOverride {
                traits: BTreeMap::from([(LayerKind::Dto, vec!["ToSchema".to_string()])]),
                ..Default::default()
            },
        );

        let found = required_dependencies(&layers, &overrides, &[&table]);
        assert_eq!(
            found,
            required(&["axum", "rust_decimal", "sea-orm", "serde", "utoipa", "uuid", "validator"])
        );
    }
}
