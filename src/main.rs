mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;

use oxide_codegen::{
    config::{CodegenConfig, defaults::DEFAULT_RUST_LOG},
    logging::{Verbosity, init_tracing},
};

fn main() {
    if let Err(err) = run() {
        tracing::error!("codegen failed: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let cfg = match CodegenConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_tracing(DEFAULT_RUST_LOG, verbosity);
            return Err(err).context("failed to load config");
        }
    };
    init_tracing(&cfg.logging.rust_log, verbosity);

    match cli.command {
        cli::Commands::Generate(args) => commands::generate::run(&cfg, args),
        cli::Commands::Relations(args) => commands::relations::run(&cfg, args),
        cli::Commands::Deps(args) => commands::deps::run(&cfg, args),
    }
}
