pub mod deps;
pub mod generate;
pub mod relations;

use std::collections::BTreeSet;

use anyhow::{Context, Result};

use oxide_codegen::{
    config::CodegenConfig,
    schema::{OverrideSet, RawSchema},
};

use crate::cli::SchemaArgs;

/// Configuration and inputs of one command, with CLI flags applied.
pub struct Inputs {
    pub cfg: CodegenConfig,
    pub schema: RawSchema,
    pub overrides: OverrideSet,
}

pub fn load_inputs(cfg: &CodegenConfig, args: &SchemaArgs) -> Result<Inputs> {
    let mut cfg = cfg.clone();
    if let Some(root) = args.project_root.clone() {
        cfg.general.project_root = root;
    }

    let schema = RawSchema::load(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let overrides_path = args
        .overrides
        .clone()
        .unwrap_or_else(|| cfg.overrides_path());
    let overrides = OverrideSet::load(&overrides_path)
        .with_context(|| format!("failed to load overrides {}", overrides_path.display()))?;
    tracing::debug!(
        tables = schema.tables.len(),
        overrides = overrides.tables.len(),
        "inputs loaded"
    );

    Ok(Inputs {
        cfg,
        schema,
        overrides,
    })
}

/// `None` when no table was named.
pub fn table_selection(tables: &[String]) -> Option<BTreeSet<String>> {
    let selection: BTreeSet<String> = tables
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    (!selection.is_empty()).then_some(selection)
}
