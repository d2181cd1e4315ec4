use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};

use oxide_codegen::{
    config::CodegenConfig,
    conflict::{Conflict, ConflictDecider, ConflictPolicy, Decision, FixedPolicy},
    generator::{GenerationReport, Generator},
    render::{MiniJinjaRenderer, TemplateSet},
    writer::WriteAction,
};

use crate::cli::{ConflictArg, GenerateArgs};

use super::{deps::print_outcome, load_inputs, table_selection};

pub fn run(cfg: &CodegenConfig, args: GenerateArgs) -> Result<()> {
    let inputs = load_inputs(cfg, &args.input)?;

    let mut options = inputs.cfg.generate_options();
    options.tables = table_selection(&args.tables);
    options.dry_run = args.dry_run;
    options.overwrite_pristine |= args.overwrite_pristine;
    options.patch_dependencies = !args.no_deps;
    if !args.layers.is_empty() {
        for (kind, layer) in options.layers.iter_mut() {
            layer.enabled = args.layers.contains(kind);
        }
    }

    let templates = TemplateSet::load(inputs.cfg.templates.dir.as_deref())
        .context("failed to load templates")?;
    let renderer = MiniJinjaRenderer;

    let mut decider = conflict_decider(args.on_conflict, inputs.cfg.conflicts.policy);
    let generator = Generator {
        options: &options,
        schema: &inputs.schema,
        overrides: &inputs.overrides,
        templates: &templates,
        renderer: &renderer,
    };
    let report = generator.run(Some(decider.as_mut()))?;

    print_report(&report);
    Ok(())
}

fn conflict_decider(flag: Option<ConflictArg>, configured: ConflictPolicy) -> Box<dyn ConflictDecider> {
    match flag {
        Some(ConflictArg::Prompt) if io::stdin().is_terminal() => Box::new(TerminalPrompt),
        Some(ConflictArg::Prompt) => {
            tracing::warn!("stdin is not a terminal, conflicting files will be skipped");
            Box::new(FixedPolicy(ConflictPolicy::Skip))
        }
        Some(arg) => Box::new(FixedPolicy(arg.policy().unwrap_or(configured))),
        None => Box::new(FixedPolicy(configured)),
    }
}

fn print_report(report: &GenerationReport) {
    if report.dry_run {
        println!("dry run, nothing written");
    }
    for step in &report.steps {
        println!("{:>16}  {}", step.action.as_str(), step.path.display());
    }
    for skipped in &report.skipped_tables {
        println!("skipped {} for {}: {}", skipped.layer, skipped.table, skipped.reason);
    }
    for failed in &report.failed_tables {
        println!("failed {}: {}", failed.table, failed.reason);
    }
    if let Some(outcome) = report.dependencies.as_ref() {
        print_outcome(outcome);
    }
    println!(
        "{} created, {} merged, {} overwritten, {} backed up, {} skipped, {} unchanged",
        report.count(WriteAction::Create),
        report.count(WriteAction::Merge),
        report.count(WriteAction::Overwrite),
        report.count(WriteAction::BackupAndOverwrite),
        report.count(WriteAction::Skip),
        report.count(WriteAction::Unchanged),
    );
}

/// Asks on stderr, reads the answer from stdin.
struct TerminalPrompt;

impl ConflictDecider for TerminalPrompt {
    fn decide(&mut self, conflict: &Conflict<'_>) -> Option<Decision> {
        let note = if conflict.pristine {
            " (untouched since last generation)"
        } else {
            ""
        };
        let stdin = io::stdin();
        loop {
            eprint!(
                "{} differs from generated code{note}. [s]kip / [o]verwrite / [b]ackup (capital = apply to all): ",
                conflict.path.display()
            );
            let _ = io::stderr().flush();

            let mut answer = String::new();
            match stdin.lock().read_line(&mut answer) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
            if let Some(decision) = parse_answer(answer.trim()) {
                return Some(decision);
            }
            eprintln!("please answer s, o or b");
        }
    }
}

fn parse_answer(answer: &str) -> Option<Decision> {
    let mut chars = answer.chars();
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let policy = match first.to_ascii_lowercase() {
        's' => ConflictPolicy::Skip,
        'o' => ConflictPolicy::Overwrite,
        'b' => ConflictPolicy::Backup,
        _ => return None,
    };
    Some(if first.is_ascii_uppercase() {
        Decision::for_all(policy)
    } else {
        Decision::once(policy)
    })
}
