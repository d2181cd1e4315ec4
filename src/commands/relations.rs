use anyhow::{Context, Result};

use oxide_codegen::{
    config::CodegenConfig,
    generator::{prepare_tables, resolve_relations},
};

use crate::cli::SchemaArgs;

use super::load_inputs;

pub fn run(cfg: &CodegenConfig, args: SchemaArgs) -> Result<()> {
    let inputs = load_inputs(cfg, &args)?;
    let prepared = prepare_tables(
        &inputs.schema,
        &inputs.overrides,
        None,
        &inputs.cfg.general.table_prefix,
    );
    let relations = resolve_relations(&inputs.schema, &inputs.overrides, &prepared.names());
    let json = serde_json::to_string_pretty(&relations).context("failed to serialize relations")?;
    println!("{json}");
    Ok(())
}
