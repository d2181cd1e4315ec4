use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    conflict::ConflictPolicy,
    generator::GenerateOptions,
    layer::{LayerConfig, LayerKind},
};

use super::{defaults, envconfig::EnvConfig, validate};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CodegenConfig {
    pub general: GeneralConfig,
    pub logging: LoggingConfig,
    pub layers: LayersConfig,
    pub conflicts: ConflictsConfig,
    pub templates: TemplatesConfig,
}

impl CodegenConfig {
    /// Loads `file` when given (it must exist), otherwise the default config
    /// file when present, then applies environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(path) => <Self as EnvConfig>::load(path, true),
            None => <Self as EnvConfig>::load(Path::new(defaults::DEFAULT_CONFIG_FILE), false),
        }
    }

    pub fn layer_configs(&self) -> BTreeMap<LayerKind, LayerConfig> {
        LayerKind::ALL
            .into_iter()
            .map(|kind| (kind, self.layers.get(kind).to_layer_config(kind)))
            .collect()
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            project_root: self.general.project_root.clone(),
            layers: self.layer_configs(),
            default_schema: self.general.default_schema.clone(),
            table_prefix: self.general.table_prefix.clone(),
            tables: None,
            dry_run: false,
            overwrite_pristine: self.conflicts.overwrite_pristine,
            use_ledger: self.general.ledger,
            manifest_path: self.general.manifest_path.clone(),
            patch_dependencies: true,
        }
    }

    /// Overrides file, resolved against the project root when relative.
    pub fn overrides_path(&self) -> PathBuf {
        self.general.project_root.join(&self.general.overrides_path)
    }
}

impl EnvConfig for CodegenConfig {
    fn validate(&self) -> Result<()> {
        validate::validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    pub project_root: PathBuf,
    /// Relative to `project_root`.
    pub manifest_path: PathBuf,
    /// Relative to `project_root`.
    pub overrides_path: PathBuf,
    pub default_schema: String,
    pub table_prefix: String,
    pub ledger: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from(defaults::DEFAULT_PROJECT_ROOT),
            manifest_path: PathBuf::from(defaults::DEFAULT_MANIFEST_PATH),
            overrides_path: PathBuf::from(defaults::DEFAULT_OVERRIDES_PATH),
            default_schema: defaults::DEFAULT_SCHEMA.to_string(),
            table_prefix: defaults::DEFAULT_TABLE_PREFIX.to_string(),
            ledger: defaults::DEFAULT_LEDGER,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub rust_log: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: defaults::DEFAULT_RUST_LOG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LayersConfig {
    #[serde(default = "entity_layer")]
    pub entity: LayerSettings,
    #[serde(default = "dto_layer")]
    pub dto: LayerSettings,
    #[serde(default = "vo_layer")]
    pub vo: LayerSettings,
    #[serde(default = "service_layer")]
    pub service: LayerSettings,
    #[serde(default = "route_layer")]
    pub route: LayerSettings,
}

impl Default for LayersConfig {
    fn default() -> Self {
        Self {
            entity: entity_layer(),
            dto: dto_layer(),
            vo: vo_layer(),
            service: service_layer(),
            route: route_layer(),
        }
    }
}

impl LayersConfig {
    pub fn get(&self, kind: LayerKind) -> &LayerSettings {
        match kind {
            LayerKind::Entity => &self.entity,
            LayerKind::Dto => &self.dto,
            LayerKind::Vo => &self.vo,
            LayerKind::Service => &self.service,
            LayerKind::Route => &self.route,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LayerSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub output_dir: String,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Route layer only.
    #[serde(default)]
    pub validation: bool,
}

impl LayerSettings {
    fn new(kind: LayerKind) -> Self {
        Self {
            enabled: true,
            output_dir: kind.default_dir().to_string(),
            traits: Vec::new(),
            validation: false,
        }
    }

    pub fn to_layer_config(&self, kind: LayerKind) -> LayerConfig {
        LayerConfig {
            kind,
            enabled: self.enabled,
            output_dir: self.output_dir.clone(),
            traits: self.traits.clone(),
            validation: kind == LayerKind::Route && self.validation,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConflictsConfig {
    pub policy: ConflictPolicy,
    pub overwrite_pristine: bool,
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            policy: ConflictPolicy::default(),
            overwrite_pristine: defaults::DEFAULT_OVERWRITE_PRISTINE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Directory whose `<layer>.rs.tmpl` files replace the built-ins.
    pub dir: Option<PathBuf>,
}

fn default_enabled() -> bool {
    true
}

fn entity_layer() -> LayerSettings {
    LayerSettings {
        traits: defaults::DEFAULT_ENTITY_TRAITS
            .iter()
            .map(|name| name.to_string())
            .collect(),
        ..LayerSettings::new(LayerKind::Entity)
    }
}

fn dto_layer() -> LayerSettings {
    LayerSettings::new(LayerKind::Dto)
}

fn vo_layer() -> LayerSettings {
    LayerSettings::new(LayerKind::Vo)
}

fn service_layer() -> LayerSettings {
    LayerSettings::new(LayerKind::Service)
}

fn route_layer() -> LayerSettings {
    LayerSettings {
        validation: defaults::DEFAULT_ROUTE_VALIDATION,
        ..LayerSettings::new(LayerKind::Route)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_cover_every_layer() {
        let cfg = CodegenConfig::default();
        let layers = cfg.layer_configs();
        assert_eq!(layers.len(), 5);
        assert_eq!(layers[&LayerKind::Service].output_dir, "src/services");
        assert_eq!(layers[&LayerKind::Entity].traits, vec!["Serialize", "Deserialize"]);
        assert!(!layers[&LayerKind::Route].validation);
        assert_eq!(cfg.conflicts.policy, ConflictPolicy::Skip);
        assert!(cfg.general.ledger);
    }

    #[test]
    fn reads_partial_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("oxide-codegen.toml");
        fs::write(
            &path,
            r#"
[general]
table_prefix = "t_"

[layers.dto]
output_dir = "src/api/dto"
traits = ["ToSchema"]

[layers.route]
output_dir = "src/routes"
validation = true

[conflicts]
policy = "backup"
"#,
        )
        .expect("write config");

        let cfg = CodegenConfig::load(Some(&path)).expect("load config");
        assert_eq!(cfg.general.table_prefix, "t_");
        assert_eq!(cfg.general.default_schema, "public");
        assert_eq!(cfg.layers.dto.output_dir, "src/api/dto");
        assert!(cfg.layers.dto.enabled);
        assert!(cfg.layers.route.validation);
        assert_eq!(cfg.layers.vo.output_dir, "src/vo");
        assert_eq!(cfg.conflicts.policy, ConflictPolicy::Backup);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[general]\nport = 3000\n").expect("write config");
        assert!(CodegenConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(CodegenConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
