use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use oxide_codegen::{conflict::ConflictPolicy, layer::LayerKind};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Config file (defaults to ./oxide-codegen.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate entity, dto, vo, service and route modules from a schema snapshot
    Generate(GenerateArgs),
    /// Print the merged relations of every table as JSON
    Relations(SchemaArgs),
    /// Only add the crates generated code needs to the project manifest
    Deps(DepsArgs),
}

#[derive(Args, Clone)]
pub struct SchemaArgs {
    /// Schema snapshot (JSON) produced by the schema reader
    #[arg(long)]
    pub schema: PathBuf,
    /// Table overrides file (defaults to general.overrides_path)
    #[arg(long)]
    pub overrides: Option<PathBuf>,
    /// Project root (overrides general.project_root)
    #[arg(long)]
    pub project_root: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub input: SchemaArgs,
    /// Comma separated table names (defaults to every table)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,
    /// Comma separated layers to generate (defaults to the enabled ones)
    #[arg(long, value_delimiter = ',')]
    pub layers: Vec<LayerKind>,
    /// What to do with existing files whose content differs
    #[arg(long, value_enum)]
    pub on_conflict: Option<ConflictArg>,
    /// Overwrite files untouched since the last run without asking
    #[arg(long)]
    pub overwrite_pristine: bool,
    /// Print planned actions without touching the project
    #[arg(long)]
    pub dry_run: bool,
    /// Leave the manifest alone
    #[arg(long)]
    pub no_deps: bool,
}

#[derive(Args, Clone)]
pub struct DepsArgs {
    #[command(flatten)]
    pub input: SchemaArgs,
    /// Comma separated table names (defaults to every table)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,
    /// Report missing crates without editing the manifest
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    Skip,
    Overwrite,
    Backup,
    /// Ask on the terminal for every conflict
    Prompt,
}

impl ConflictArg {
    /// `None` for `prompt`.
    pub fn policy(self) -> Option<ConflictPolicy> {
        match self {
            ConflictArg::Skip => Some(ConflictPolicy::Skip),
            ConflictArg::Overwrite => Some(ConflictPolicy::Overwrite),
            ConflictArg::Backup => Some(ConflictPolicy::Backup),
            ConflictArg::Prompt => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["oxide-gen", "relations", "--schema", "schema.json", "-vv"])
            .expect("flags parse");
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["oxide-gen", "-q", "-v", "deps", "--schema", "schema.json"]).is_err());
    }
}
