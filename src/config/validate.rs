use std::path::{Component, Path};

use anyhow::{Result, bail};

use crate::{layer::LayerKind, naming::is_valid_ident};

use super::CodegenConfig;

pub fn validate(cfg: &CodegenConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.default_schema.trim().is_empty() {
        errors.push("general.default_schema must not be empty".to_string());
    }

    if cfg.general.manifest_path.as_os_str().is_empty() {
        errors.push("general.manifest_path must not be empty".to_string());
    }

    if cfg.general.overrides_path.as_os_str().is_empty() {
        errors.push("general.overrides_path must not be empty".to_string());
    }

    let prefix = &cfg.general.table_prefix;
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(format!(
            "general.table_prefix ({prefix}) may only contain ascii letters, digits and '_'"
        ));
    }

    for kind in LayerKind::ALL {
        let layer = cfg.layers.get(kind);
        if !layer.enabled {
            continue;
        }

        let dir = layer.output_dir.trim();
        if dir.is_empty() {
            errors.push(format!("layers.{kind}.output_dir must not be empty"));
        } else if !is_relative_inside(Path::new(dir)) {
            errors.push(format!(
                "layers.{kind}.output_dir ({dir}) must be a relative path inside the project"
            ));
        }

        for name in &layer.traits {
            if !is_trait_path(name) {
                errors.push(format!("layers.{kind}.traits contains invalid trait '{name}'"));
            }
        }
    }

    if cfg.layers.route.validation && !cfg.layers.dto.enabled {
        errors.push("layers.route.validation requires layers.dto to be enabled".to_string());
    }

    if let Some(dir) = cfg.templates.dir.as_ref()
        && !dir.is_dir()
    {
        errors.push(format!("templates.dir ({}) is not a directory", dir.display()));
    }

    if cfg.logging.rust_log.trim().is_empty() {
        errors.push("logging.rust_log must not be empty".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid codegen config:\n- {}", errors.join("\n- "))
}

fn is_relative_inside(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// `Serialize` or `serde::Serialize`.
fn is_trait_path(name: &str) -> bool {
    !name.is_empty() && name.split("::").all(is_valid_ident)
}
