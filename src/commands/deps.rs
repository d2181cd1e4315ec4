use anyhow::{Context, Result};

use oxide_codegen::{
    config::CodegenConfig,
    deps::{self, PatchOutcome},
    generator::prepare_tables,
};

use crate::cli::DepsArgs;

use super::{load_inputs, table_selection};

pub fn run(cfg: &CodegenConfig, args: DepsArgs) -> Result<()> {
    let inputs = load_inputs(cfg, &args.input)?;
    let selection = table_selection(&args.tables);
    let prepared = prepare_tables(
        &inputs.schema,
        &inputs.overrides,
        selection.as_ref(),
        &inputs.cfg.general.table_prefix,
    );

    let required = deps::required_dependencies(
        &inputs.cfg.layer_configs(),
        &inputs.overrides,
        &prepared.list(),
    );
    let manifest = inputs
        .cfg
        .general
        .project_root
        .join(&inputs.cfg.general.manifest_path);
    let outcome = deps::patch_manifest(&manifest, &required, args.dry_run)
        .with_context(|| format!("failed to patch {}", manifest.display()))?;

    print_outcome(&outcome);
    Ok(())
}

pub fn print_outcome(outcome: &PatchOutcome) {
    match outcome {
        PatchOutcome::ManifestMissing => println!("manifest not found, dependencies left alone"),
        PatchOutcome::UpToDate => println!("dependencies up to date"),
        PatchOutcome::Patched { added } => println!("added dependencies: {}", added.join(", ")),
        PatchOutcome::Pending { missing } => {
            println!("missing dependencies (dry run): {}", missing.join(", "))
        }
    }
}
