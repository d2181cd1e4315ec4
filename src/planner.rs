//! Decides which files a run produces.
//!
//! Per enabled layer, tables are grouped by effective output directory and
//! then by schema sub-directory. Every group that produced at least one file
//! also gets a module listing, and the entity layer adds its re-export map.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    context::{ContextBuilder, schema_dir},
    index::{ModuleIndex, ReexportIndex},
    layer::LayerKind,
    relations::RelationMap,
    render::{TemplateRenderer, TemplateSet},
    schema::Table,
};

pub const MODULE_INDEX_FILE: &str = "mod.rs";
pub const REEXPORT_INDEX_FILE: &str = "prelude.rs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    /// `mod.rs` listing; merged, never overwritten.
    ModuleIndex,
    /// Entity `prelude.rs`; merged, never overwritten.
    ReexportIndex,
    /// Entity source with a marker region.
    Entity,
    Source,
}

impl FileRole {
    pub fn is_index(self) -> bool {
        matches!(self, FileRole::ModuleIndex | FileRole::ReexportIndex)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative to the project root.
    pub path: PathBuf,
    pub content: String,
    pub role: FileRole,
    pub layer: LayerKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTable {
    pub layer: LayerKind,
    pub table: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub files: Vec<GeneratedFile>,
    pub skipped: Vec<SkippedTable>,
}

impl Plan {
    pub fn file(&self, path: &Path) -> Option<&GeneratedFile> {
        self.files.iter().find(|file| file.path == path)
    }
}

pub struct Planner<'a> {
    pub contexts: ContextBuilder<'a>,
    pub templates: &'a TemplateSet,
    pub renderer: &'a dyn TemplateRenderer,
}

/// Files produced for one (directory, schema) group.
#[derive(Default)]
struct GroupOutput {
    files: Vec<GeneratedFile>,
    modules: ModuleIndex,
    reexports: ReexportIndex,
}

impl Planner<'_> {
    /// Plans every enabled layer for `tables`, in table-name order.
    pub fn plan(&self, tables: &[&Table], relations: &RelationMap) -> Plan {
        let mut plan = Plan::default();
        let mut ordered: Vec<&Table> = tables.to_vec();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        for kind in LayerKind::ALL {
            let Some(layer) = self.contexts.layers.get(&kind) else {
                continue;
            };
            if !layer.enabled {
                continue;
            }

            let mut groups: BTreeMap<String, BTreeMap<String, Vec<&Table>>> = BTreeMap::new();
            for table in &ordered {
                let table_override = self.contexts.overrides.get(&table.name);
                if !layer.enabled_for(table_override) {
                    continue;
                }
                groups
                    .entry(layer.effective_dir(table_override))
                    .or_default()
                    .entry(schema_dir(table, self.contexts.default_schema))
                    .or_default()
                    .push(table);
            }

            for (dir, schemas) in groups {
                self.plan_directory(kind, &dir, schemas, relations, &mut plan);
            }
        }

        plan.files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(
            files = plan.files.len(),
            skipped = plan.skipped.len(),
            "planned generation"
        );
        plan
    }

    fn plan_directory(
        &self,
        kind: LayerKind,
        dir: &str,
        schemas: BTreeMap<String, Vec<&Table>>,
        relations: &RelationMap,
        plan: &mut Plan,
    ) {
        let dir_path = PathBuf::from(dir);
        let mut produced: BTreeMap<String, GroupOutput> = BTreeMap::new();

        for (schema, tables) in schemas {
            let base = if schema.is_empty() {
                dir_path.clone()
            } else {
                dir_path.join(&schema)
            };
            let output = self.plan_group(kind, &base, &tables, relations, plan);
            if !output.files.is_empty() {
                produced.insert(schema, output);
            }
        }

        // Schema sub-directories are only reachable through a parent listing.
        let needs_parent = produced.len() > 1 || produced.keys().any(|schema| !schema.is_empty());
        let mut parent = ModuleIndex::default();

        for (schema, mut output) in produced {
            for extra in kind.extra_modules() {
                output.modules.insert(*extra);
            }
            let base = if schema.is_empty() {
                dir_path.clone()
            } else {
                dir_path.join(&schema)
            };

            if kind == LayerKind::Entity {
                plan.files.push(GeneratedFile {
                    path: base.join(REEXPORT_INDEX_FILE),
                    content: output.reexports.render(),
                    role: FileRole::ReexportIndex,
                    layer: kind,
                });
            }

            if schema.is_empty() && needs_parent {
                parent = parent.merge(&output.modules);
            } else {
                plan.files.push(GeneratedFile {
                    path: base.join(MODULE_INDEX_FILE),
                    content: output.modules.render(),
                    role: FileRole::ModuleIndex,
                    layer: kind,
                });
            }
            if !schema.is_empty() {
                parent.insert(schema);
            }
            plan.files.append(&mut output.files);
        }

        if needs_parent {
            plan.files.push(GeneratedFile {
                path: dir_path.join(MODULE_INDEX_FILE),
                content: parent.render(),
                role: FileRole::ModuleIndex,
                layer: kind,
            });
        }
    }

    fn plan_group(
        &self,
        kind: LayerKind,
        base: &Path,
        tables: &[&Table],
        relations: &RelationMap,
        plan: &mut Plan,
    ) -> GroupOutput {
        let mut output = GroupOutput::default();

        for table in tables {
            let module = kind.module_ident(&table.module_name());
            if output.modules.contains(&module) || kind.extra_modules().contains(&module.as_str()) {
                tracing::warn!(
                    layer = %kind,
                    table = %table.name,
                    module = %module,
                    "module name already used in this directory, skipping table"
                );
                plan.skipped.push(SkippedTable {
                    layer: kind,
                    table: table.name.clone(),
                    reason: format!("module '{module}' already generated in {}", base.display()),
                });
                continue;
            }

            let table_relations = relations
                .get(&table.name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let context = self.contexts.build(table, kind, table_relations);
            let content = match self.templates.render(self.renderer, kind, &context) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(
                        layer = %kind,
                        table = %table.name,
                        error = %err,
                        "generation failed, skipping table"
                    );
                    plan.skipped.push(SkippedTable {
                        layer: kind,
                        table: table.name.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            output.files.push(GeneratedFile {
                path: base.join(format!("{}.rs", kind.file_stem(&table.module_name()))),
                content,
                role: if kind == LayerKind::Entity {
                    FileRole::Entity
                } else {
                    FileRole::Source
                },
                layer: kind,
            });
            if kind == LayerKind::Entity {
                output.reexports.insert(module.clone(), table.entity_name());
            }
            output.modules.insert(module);
        }

        output
    }
}
