use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{naming::safe_ident, schema::TableOverride};

/// The five generated artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Entity,
    Dto,
    Vo,
    Service,
    Route,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Entity,
        LayerKind::Dto,
        LayerKind::Vo,
        LayerKind::Service,
        LayerKind::Route,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Entity => "entity",
            LayerKind::Dto => "dto",
            LayerKind::Vo => "vo",
            LayerKind::Service => "service",
            LayerKind::Route => "route",
        }
    }

    pub fn default_dir(self) -> &'static str {
        match self {
            LayerKind::Entity => "src/entities",
            LayerKind::Dto => "src/dto",
            LayerKind::Vo => "src/vo",
            LayerKind::Service => "src/services",
            LayerKind::Route => "src/routes",
        }
    }

    /// Module identifier of one table's file within this layer, escaped
    /// when it collides with a keyword (`type` -> `r#type`).
    pub fn module_ident(self, module_name: &str) -> String {
        match self {
            LayerKind::Entity | LayerKind::Route => safe_ident(module_name),
            LayerKind::Dto => format!("{module_name}_dto"),
            LayerKind::Vo => format!("{module_name}_vo"),
            LayerKind::Service => format!("{module_name}_service"),
        }
    }

    /// File stem of a module: the identifier without any `r#` prefix.
    pub fn file_stem(self, module_name: &str) -> String {
        let ident = self.module_ident(module_name);
        match ident.strip_prefix("r#") {
            Some(raw) => raw.to_string(),
            None => ident,
        }
    }

    pub fn template_file(self) -> &'static str {
        match self {
            LayerKind::Entity => "entity.rs.tmpl",
            LayerKind::Dto => "dto.rs.tmpl",
            LayerKind::Vo => "vo.rs.tmpl",
            LayerKind::Service => "service.rs.tmpl",
            LayerKind::Route => "route.rs.tmpl",
        }
    }

    /// Modules every index of this layer declares besides the table modules.
    pub fn extra_modules(self) -> &'static [&'static str] {
        match self {
            LayerKind::Entity => &["prelude"],
            _ => &[],
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "entity" | "entities" => Ok(LayerKind::Entity),
            "dto" => Ok(LayerKind::Dto),
            "vo" => Ok(LayerKind::Vo),
            "service" | "services" => Ok(LayerKind::Service),
            "route" | "routes" => Ok(LayerKind::Route),
            other => Err(format!("unknown layer '{other}'")),
        }
    }
}

/// Resolved settings of one output layer for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    pub kind: LayerKind,
    pub enabled: bool,
    pub output_dir: String,
    pub traits: Vec<String>,
    pub validation: bool,
}

impl LayerConfig {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            enabled: true,
            output_dir: kind.default_dir().to_string(),
            traits: Vec::new(),
            validation: false,
        }
    }

    /// Output directory for one table: the override's directory or the layer's.
    pub fn effective_dir(&self, table_override: Option<&TableOverride>) -> String {
        table_override
            .and_then(|ov| ov.output_dir(self.kind))
            .map(|dir| dir.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.output_dir.trim_end_matches('/').to_string())
    }

    /// Whether `table_override` leaves this layer on for its table.
    pub fn enabled_for(&self, table_override: Option<&TableOverride>) -> bool {
        self.enabled && table_override.is_none_or(|ov| ov.layer_enabled(self.kind))
    }

    /// Layer traits followed by the table's own selections, without repeats.
    pub fn traits_for(&self, table_override: Option<&TableOverride>) -> Vec<String> {
        let extra = table_override.map(|ov| ov.traits(self.kind)).unwrap_or(&[]);
        let mut traits: Vec<String> = Vec::new();
        for name in self.traits.iter().chain(extra) {
            let name = name.trim();
            if !name.is_empty() && !traits.iter().any(|t| t == name) {
                traits.push(name.to_string());
            }
        }
        traits
    }
}

/// Rust module path for an output directory: `src/entities` -> `crate::entities`.
pub fn module_path_for_dir(dir: &str, schema_dir: &str) -> String {
    let trimmed = dir.trim_matches('/');
    let relative = trimmed
        .strip_prefix("src/")
        .or_else(|| (trimmed == "src").then_some(""))
        .unwrap_or(trimmed);
    let mut parts = vec!["crate".to_string()];
    parts.extend(
        relative
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .map(str::to_string),
    );
    if !schema_dir.is_empty() {
        parts.push(schema_dir.to_string());
    }
    parts.join("::")
}
