//! Two-phase write protocol.
//!
//! [`classify`] reads the project and settles every decision, including
//! conflict prompts. [`apply`] then performs the resulting steps without
//! asking anything.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    conflict::{Conflict, ConflictPolicy, Resolver},
    error::{CodegenError, CodegenResult},
    index::{merge_module_index, merge_reexport_index},
    ledger::Ledger,
    merge::merge_region,
    planner::{FileRole, GeneratedFile, Plan},
};

pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    Create,
    /// Index merge or marker-region merge.
    Merge,
    Overwrite,
    BackupAndOverwrite,
    Skip,
    Unchanged,
}

impl WriteAction {
    pub fn writes(self) -> bool {
        matches!(
            self,
            WriteAction::Create
                | WriteAction::Merge
                | WriteAction::Overwrite
                | WriteAction::BackupAndOverwrite
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Merge => "merge",
            WriteAction::Overwrite => "overwrite",
            WriteAction::BackupAndOverwrite => "backup+overwrite",
            WriteAction::Skip => "skip",
            WriteAction::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStep {
    /// Relative to the project root.
    pub path: PathBuf,
    pub role: FileRole,
    pub action: WriteAction,
    /// Final file content; empty for skipped files.
    pub content: String,
}

/// Decides what happens to every planned file. Reads only.
pub fn classify(
    root: &Path,
    plan: &Plan,
    ledger: Option<&Ledger>,
    resolver: &mut Resolver<'_>,
) -> CodegenResult<Vec<WriteStep>> {
    plan.files
        .iter()
        .map(|file| classify_file(root, file, ledger, resolver))
        .collect()
}

fn classify_file(
    root: &Path,
    file: &GeneratedFile,
    ledger: Option<&Ledger>,
    resolver: &mut Resolver<'_>,
) -> CodegenResult<WriteStep> {
    let target = root.join(&file.path);
    let step = |action: WriteAction, content: String| WriteStep {
        path: file.path.clone(),
        role: file.role,
        action,
        content,
    };

    if !target.exists() {
        return Ok(step(WriteAction::Create, file.content.clone()));
    }
    let existing =
        fs::read_to_string(&target).map_err(|err| CodegenError::io("read", &target, err))?;
    if existing == file.content {
        return Ok(step(WriteAction::Unchanged, existing));
    }

    let merged = match file.role {
        FileRole::ModuleIndex => Some(merge_module_index(&existing, &file.content)),
        FileRole::ReexportIndex => Some(merge_reexport_index(&existing, &file.content)),
        FileRole::Entity => merge_region(&existing, &file.content),
        FileRole::Source => None,
    };
    if let Some(merged) = merged {
        let action = if merged == existing {
            WriteAction::Unchanged
        } else {
            WriteAction::Merge
        };
        return Ok(step(action, merged));
    }

    let pristine = ledger.is_some_and(|ledger| ledger.is_pristine(&file.path, &existing));
    let policy = resolver.resolve(&Conflict {
        path: &file.path,
        pristine,
    });
    tracing::debug!(path = %file.path.display(), pristine, %policy, "conflict resolved");
    Ok(match policy {
        ConflictPolicy::Skip => step(WriteAction::Skip, String::new()),
        ConflictPolicy::Overwrite => step(WriteAction::Overwrite, file.content.clone()),
        ConflictPolicy::Backup => step(WriteAction::BackupAndOverwrite, file.content.clone()),
    })
}

/// Performs the classified steps in order, calling `on_written` after each
/// file lands. Returns how many files were written; stops at the first error.
pub fn apply<'s>(
    root: &Path,
    steps: &'s [WriteStep],
    mut on_written: impl FnMut(&'s WriteStep),
) -> CodegenResult<usize> {
    let mut written = 0;
    for step in steps {
        let target = root.join(&step.path);
        match step.action {
            WriteAction::Skip | WriteAction::Unchanged => continue,
            WriteAction::BackupAndOverwrite => {
                let backup = backup_path(&target);
                fs::copy(&target, &backup).map_err(|err| CodegenError::io("back up", &target, err))?;
                tracing::info!(path = %step.path.display(), backup = %backup.display(), "backed up");
            }
            WriteAction::Create | WriteAction::Merge | WriteAction::Overwrite => {}
        }
        write_file(&target, &step.content)?;
        tracing::info!(path = %step.path.display(), action = step.action.as_str(), "wrote file");
        on_written(step);
        written += 1;
    }
    Ok(written)
}

/// `user.rs` -> `user.rs.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn write_file(path: &Path, contents: &str) -> CodegenResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| CodegenError::io("create", parent, err))?;
    }
    fs::write(path, contents).map_err(|err| CodegenError::io("write", path, err))
}
