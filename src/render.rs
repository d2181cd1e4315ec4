//! Template rendering.
//!
//! The planner only sees [`TemplateRenderer`]; the default implementation is
//! backed by minijinja.

use std::{collections::BTreeMap, fs, path::Path};

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    error::{CodegenError, CodegenResult},
    layer::LayerKind,
};

const ENTITY_TEMPLATE: &str = include_str!("../templates/entity.rs.tmpl");
const DTO_TEMPLATE: &str = include_str!("../templates/dto.rs.tmpl");
const VO_TEMPLATE: &str = include_str!("../templates/vo.rs.tmpl");
const SERVICE_TEMPLATE: &str = include_str!("../templates/service.rs.tmpl");
const ROUTE_TEMPLATE: &str = include_str!("../templates/route.rs.tmpl");

/// Template text + context -> rendered text.
pub trait TemplateRenderer {
    fn render(&self, name: &str, template: &str, context: &JsonValue) -> CodegenResult<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaRenderer;

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, name: &str, template: &str, context: &JsonValue) -> CodegenResult<String> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template(name, template)
            .map_err(|err| CodegenError::render(name, err.to_string()))?;
        let tmpl = env
            .get_template(name)
            .map_err(|err| CodegenError::render(name, err.to_string()))?;
        tmpl.render(context)
            .map_err(|err| CodegenError::render(name, err.to_string()))
    }
}

/// Template text per layer: the built-ins, optionally replaced file by file.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: BTreeMap<LayerKind, String>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    pub fn builtin() -> Self {
        let templates = LayerKind::ALL
            .into_iter()
            .map(|kind| (kind, builtin_template(kind).to_string()))
            .collect();
        Self { templates }
    }

    /// Built-ins, with any `<layer>.rs.tmpl` found in `dir` taking precedence.
    pub fn load(dir: Option<&Path>) -> CodegenResult<Self> {
        let mut set = Self::builtin();
        let Some(dir) = dir else {
            return Ok(set);
        };
        for kind in LayerKind::ALL {
            let path = dir.join(kind.template_file());
            if !path.is_file() {
                continue;
            }
            let text =
                fs::read_to_string(&path).map_err(|err| CodegenError::io("read", &path, err))?;
            tracing::debug!(layer = %kind, path = %path.display(), "using template override");
            set.templates.insert(kind, text);
        }
        Ok(set)
    }

    pub fn get(&self, kind: LayerKind) -> &str {
        self.templates
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| builtin_template(kind))
    }

    /// Renders `kind`'s template with `context` serialized to JSON.
    pub fn render<C: Serialize>(
        &self,
        renderer: &dyn TemplateRenderer,
        kind: LayerKind,
        context: &C,
    ) -> CodegenResult<String> {
        let value = serde_json::to_value(context)
            .map_err(|err| CodegenError::render(kind.template_file(), err.to_string()))?;
        renderer.render(kind.template_file(), self.get(kind), &value)
    }
}

fn builtin_template(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Entity => ENTITY_TEMPLATE,
        LayerKind::Dto => DTO_TEMPLATE,
        LayerKind::Vo => VO_TEMPLATE,
        LayerKind::Service => SERVICE_TEMPLATE,
        LayerKind::Route => ROUTE_TEMPLATE,
    }
}
