//! One generation run: prepare tables, infer relations, plan, classify, write,
//! then patch the manifest.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    conflict::{ConflictDecider, Resolver},
    context::ContextBuilder,
    deps::{self, PatchOutcome},
    error::CodegenResult,
    layer::{LayerConfig, LayerKind},
    ledger::{LEDGER_PATH, Ledger},
    planner::{Plan, Planner, SkippedTable},
    relations::{RelationMap, detect_relations, merge_relations},
    render::{TemplateRenderer, TemplateSet},
    schema::{OverrideSet, RawSchema, Table},
    writer::{self, WriteAction},
};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub project_root: PathBuf,
    pub layers: BTreeMap<LayerKind, LayerConfig>,
    pub default_schema: String,
    pub table_prefix: String,
    /// `None` selects every table in the schema.
    pub tables: Option<BTreeSet<String>>,
    pub dry_run: bool,
    pub overwrite_pristine: bool,
    pub use_ledger: bool,
    /// Relative to `project_root`.
    pub manifest_path: PathBuf,
    pub patch_dependencies: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            layers: LayerKind::ALL
                .into_iter()
                .map(|kind| (kind, LayerConfig::new(kind)))
                .collect(),
            default_schema: "public".to_string(),
            table_prefix: String::new(),
            tables: None,
            dry_run: false,
            overwrite_pristine: false,
            use_ledger: true,
            manifest_path: PathBuf::from("Cargo.toml"),
            patch_dependencies: true,
        }
    }
}

/// A table dropped before planning because its override could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub reason: String,
}

/// Tables of a run with overrides applied.
#[derive(Debug, Clone, Default)]
pub struct PreparedTables {
    pub tables: BTreeMap<String, Table>,
    pub failures: Vec<TableFailure>,
}

impl PreparedTables {
    pub fn names(&self) -> BTreeSet<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn list(&self) -> Vec<&Table> {
        self.tables.values().collect()
    }
}

/// Builds customized tables for the selection. Failing overrides exclude
/// their table instead of failing the run.
pub fn prepare_tables(
    schema: &RawSchema,
    overrides: &OverrideSet,
    selection: Option<&BTreeSet<String>>,
    table_prefix: &str,
) -> PreparedTables {
    let mut prepared = PreparedTables::default();

    if let Some(selection) = selection {
        for missing in selection.iter().filter(|name| schema.table(name).is_none()) {
            tracing::warn!(table = %missing, "selected table not found in schema");
        }
    }

    for raw in &schema.tables {
        if selection.is_some_and(|selection| !selection.contains(&raw.name)) {
            continue;
        }
        let table = Table::from_raw(raw, table_prefix);
        let table = match overrides.get(&raw.name) {
            Some(table_override) => match table_override.apply(&table) {
                Ok(customized) => customized,
                Err(err) => {
                    tracing::warn!(table = %raw.name, error = %err, "override rejected, skipping table");
                    prepared.failures.push(TableFailure {
                        table: raw.name.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            },
            None => table,
        };
        prepared.tables.insert(raw.name.clone(), table);
    }

    prepared
}

/// Detected relations merged with the user's, restricted to `selected`.
pub fn resolve_relations(
    schema: &RawSchema,
    overrides: &OverrideSet,
    selected: &BTreeSet<String>,
) -> RelationMap {
    let detected = detect_relations(schema, selected);
    merge_relations(&detected, &overrides.custom_relations(), selected)
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub path: PathBuf,
    pub action: WriteAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub dry_run: bool,
    pub steps: Vec<StepSummary>,
    pub skipped_tables: Vec<SkippedTable>,
    pub failed_tables: Vec<TableFailure>,
    pub dependencies: Option<PatchOutcome>,
}

impl GenerationReport {
    pub fn count(&self, action: WriteAction) -> usize {
        self.steps.iter().filter(|step| step.action == action).count()
    }
}

pub struct Generator<'a> {
    pub options: &'a GenerateOptions,
    pub schema: &'a RawSchema,
    pub overrides: &'a OverrideSet,
    pub templates: &'a TemplateSet,
    pub renderer: &'a dyn TemplateRenderer,
}

impl Generator<'_> {
    pub fn prepare(&self) -> PreparedTables {
        prepare_tables(
            self.schema,
            self.overrides,
            self.options.tables.as_ref(),
            &self.options.table_prefix,
        )
    }

    pub fn plan(&self, prepared: &PreparedTables) -> Plan {
        let relations = resolve_relations(self.schema, self.overrides, &prepared.names());
        let planner = Planner {
            contexts: ContextBuilder {
                layers: &self.options.layers,
                overrides: self.overrides,
                tables: &prepared.tables,
                default_schema: &self.options.default_schema,
            },
            templates: self.templates,
            renderer: self.renderer,
        };
        planner.plan(&prepared.list(), &relations)
    }

    /// Runs the whole pipeline. Every conflict decision is taken before the
    /// first write.
    pub fn run(&self, decider: Option<&mut dyn ConflictDecider>) -> CodegenResult<GenerationReport> {
        let root = self.options.project_root.as_path();
        let prepared = self.prepare();
        let plan = self.plan(&prepared);
        tracing::info!(
            tables = prepared.tables.len(),
            files = plan.files.len(),
            "generation planned"
        );

        let ledger_path = root.join(LEDGER_PATH);
        let mut ledger = if self.options.use_ledger {
            Some(Ledger::load(&ledger_path)?)
        } else {
            None
        };

        let mut resolver = Resolver::new(decider, self.options.overwrite_pristine);
        let steps = writer::classify(root, &plan, ledger.as_ref(), &mut resolver)?;

        if !self.options.dry_run {
            let mut written = 0usize;
            let applied = writer::apply(root, &steps, |step| {
                written += 1;
                if let Some(ledger) = ledger.as_mut() {
                    ledger.record(&step.path, &step.content);
                }
            });
            // Files that landed before a failure still belong in the ledger.
            let saved = match ledger.as_ref() {
                Some(ledger) if written > 0 => ledger.save(&ledger_path),
                _ => Ok(()),
            };
            applied?;
            saved?;
        }

        let dependencies = if self.options.patch_dependencies {
            Some(self.patch_dependencies(root, &prepared)?)
        } else {
            None
        };

        Ok(GenerationReport {
            dry_run: self.options.dry_run,
            steps: steps
                .iter()
                .map(|step| StepSummary {
                    path: step.path.clone(),
                    action: step.action,
                })
                .collect(),
            skipped_tables: plan.skipped,
            failed_tables: prepared.failures,
            dependencies,
        })
    }

    pub fn patch_dependencies(
        &self,
        root: &Path,
        prepared: &PreparedTables,
    ) -> CodegenResult<PatchOutcome> {
        let required =
            deps::required_dependencies(&self.options.layers, self.overrides, &prepared.list());
        deps::patch_manifest(
            &root.join(&self.options.manifest_path),
            &required,
            self.options.dry_run,
        )
    }
}
