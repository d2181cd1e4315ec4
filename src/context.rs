//! Per-table render context.
//!
//! One [`TableContext`] is built per table and layer. It is plain data; the
//! renderer receives it as JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    layer::{LayerConfig, LayerKind, module_path_for_dir},
    merge::{MARKER_END, MARKER_START},
    naming::{to_pascal_case, to_snake_case},
    schema::{Column, OverrideSet, Relation, RelationKind, Table},
    types,
};

#[derive(Debug, Clone, Serialize)]
pub struct TableContext {
    pub layer: LayerKind,
    pub table_name: String,
    pub schema: String,
    pub schema_dir: String,
    pub comment: Option<String>,
    pub entity_name: String,
    pub module_name: String,
    pub service_name: String,
    pub dto_name: String,
    pub create_dto_name: String,
    pub update_dto_name: String,
    pub vo_name: String,
    pub query_name: String,
    pub columns: Vec<ColumnContext>,
    pub insertable: Vec<ColumnContext>,
    pub updatable: Vec<ColumnContext>,
    pub queryable: Vec<ColumnContext>,
    pub primary_key: Option<ColumnContext>,
    pub composite_key: bool,
    pub pk_type: String,
    pub pk_fields: Vec<KeyField>,
    pub route_base: String,
    pub route_key_path: String,
    pub created_at: Option<TimestampContext>,
    pub updated_at: Option<TimestampContext>,
    pub imports: ImportPaths,
    pub belongs_to: Vec<RelationContext>,
    pub has_many: Vec<RelationContext>,
    pub has_one: Vec<RelationContext>,
    pub relations: Vec<RelationContext>,
    /// First relation per target table; sea-orm allows one `Related` impl per target.
    pub related: Vec<RelationContext>,
    pub traits: Vec<TraitContext>,
    /// Route validation is on; DTOs derive `Validate` and routes call it.
    pub validation: bool,
    pub marker_start: &'static str,
    pub marker_end: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnContext {
    pub name: String,
    pub field: String,
    pub variant: String,
    pub rust_type: String,
    pub full_type: String,
    pub optional_type: String,
    pub view_type: String,
    pub view_coerced: bool,
    pub annotation: Option<String>,
    pub attrs: Vec<String>,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub comment: Option<String>,
    pub default_value: Option<String>,
    pub is_virtual: bool,
    pub extensions: BTreeMap<String, String>,
}

/// A derive selection and the `use` path it needs, if one is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitContext {
    pub name: String,
    pub path: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyField {
    pub name: String,
    pub field: String,
    pub variant: String,
    pub ty: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimestampContext {
    pub column: String,
    pub field: String,
    pub ty: String,
    pub nullable: bool,
    pub now_expr: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportPaths {
    pub entity: String,
    pub dto: String,
    pub vo: String,
    pub service: String,
    pub route: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationContext {
    pub kind: RelationKind,
    pub variant: String,
    pub target_table: String,
    pub target_module: String,
    pub target_entity: String,
    pub target_path: String,
    pub from_column: String,
    pub to_column: String,
    pub from_field: String,
    pub to_field: String,
    pub from_variant: String,
    pub to_variant: String,
}

/// Shared inputs for building contexts during one run.
pub struct ContextBuilder<'a> {
    pub layers: &'a BTreeMap<LayerKind, LayerConfig>,
    pub overrides: &'a OverrideSet,
    /// Every prepared table of the run, keyed by raw table name.
    pub tables: &'a BTreeMap<String, Table>,
    pub default_schema: &'a str,
}

impl ContextBuilder<'_> {
    pub fn build(&self, table: &Table, layer: LayerKind, relations: &[Relation]) -> TableContext {
        let table_override = self.overrides.get(&table.name);
        let layer_config = self.layers.get(&layer);
        let schema_dir = schema_dir(table, self.default_schema);

        let columns: Vec<ColumnContext> = table.columns.iter().map(column_context).collect();
        let subset =
            |cols: Vec<&Column>| cols.into_iter().map(column_context).collect::<Vec<_>>();

        let key_columns: Vec<&Column> = table
            .primary_keys
            .iter()
            .filter_map(|key| table.column(key))
            .collect();
        let pk_fields: Vec<KeyField> = key_columns
            .iter()
            .map(|col| KeyField {
                name: col.name.clone(),
                field: col.field_ident(),
                variant: to_pascal_case(&col.plain_field_name()),
                ty: col.rust_type.clone(),
            })
            .collect();
        let pk_type = match pk_fields.as_slice() {
            [] => String::new(),
            [single] => single.ty.clone(),
            many => format!(
                "({})",
                many.iter()
                    .map(|key| key.ty.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        let route_key_path = pk_fields
            .iter()
            .map(|key| format!("/{{{}}}", key.field.trim_start_matches("r#")))
            .collect::<String>();

        let relation_contexts = self.relation_contexts(table, relations);
        let by_kind = |kind: RelationKind| {
            relation_contexts
                .iter()
                .filter(|rel| rel.kind == kind)
                .cloned()
                .collect::<Vec<_>>()
        };
        let mut seen_targets = BTreeSet::new();
        let related = relation_contexts
            .iter()
            .filter(|rel| seen_targets.insert(rel.target_table.clone()))
            .cloned()
            .collect();

        TableContext {
            layer,
            table_name: table.name.clone(),
            schema: table.schema.clone(),
            schema_dir: schema_dir.clone(),
            comment: table.comment.clone(),
            entity_name: table.entity_name(),
            module_name: table.module_name(),
            service_name: table.service_name(),
            dto_name: table.dto_name(),
            create_dto_name: format!("Create{}", table.dto_name()),
            update_dto_name: format!("Update{}", table.dto_name()),
            vo_name: table.vo_name(),
            query_name: table.query_name(),
            insertable: subset(table.insertable_columns()),
            updatable: subset(table.updatable_columns()),
            queryable: subset(table.queryable_columns()),
            primary_key: key_columns.first().map(|col| column_context(col)),
            composite_key: key_columns.len() > 1,
            pk_type,
            pk_fields,
            route_base: format!("/{}", table.module_name().replace('_', "-")),
            route_key_path,
            created_at: table.created_at_column().map(timestamp_context),
            updated_at: table.updated_at_column().map(timestamp_context),
            imports: self.imports(table, &schema_dir),
            belongs_to: by_kind(RelationKind::BelongsTo),
            has_many: by_kind(RelationKind::HasMany),
            has_one: by_kind(RelationKind::HasOne),
            relations: relation_contexts,
            related,
            traits: layer_config
                .map(|config| config.traits_for(table_override))
                .unwrap_or_default()
                .into_iter()
                .map(|name| TraitContext {
                    path: trait_path(&name),
                    name,
                })
                .collect(),
            validation: matches!(layer, LayerKind::Dto | LayerKind::Route)
                && self.route_validation(),
            marker_start: MARKER_START,
            marker_end: MARKER_END,
            columns,
        }
    }

    fn route_validation(&self) -> bool {
        self.layers
            .get(&LayerKind::Route)
            .is_some_and(|route| route.enabled && route.validation)
    }

    fn layer_dir(&self, kind: LayerKind, table_name: &str) -> String {
        let table_override = self.overrides.get(table_name);
        match self.layers.get(&kind) {
            Some(config) => config.effective_dir(table_override),
            None => LayerConfig::new(kind).effective_dir(table_override),
        }
    }

    fn module_path(&self, kind: LayerKind, table: &Table) -> String {
        let dir = self.layer_dir(kind, &table.name);
        let base = module_path_for_dir(&dir, &schema_dir(table, self.default_schema));
        format!("{base}::{}", kind.module_ident(&table.module_name()))
    }

    fn imports(&self, table: &Table, schema_dir: &str) -> ImportPaths {
        let path = |kind: LayerKind| {
            let base = module_path_for_dir(&self.layer_dir(kind, &table.name), schema_dir);
            format!("{base}::{}", kind.module_ident(&table.module_name()))
        };
        ImportPaths {
            entity: path(LayerKind::Entity),
            dto: path(LayerKind::Dto),
            vo: path(LayerKind::Vo),
            service: path(LayerKind::Service),
            route: path(LayerKind::Route),
        }
    }

    fn relation_contexts(&self, table: &Table, relations: &[Relation]) -> Vec<RelationContext> {
        let mut used_variants = BTreeSet::new();
        relations
            .iter()
            .map(|relation| {
                let target = self.tables.get(&relation.target_table);
                let (target_module, target_entity, target_path) = match target {
                    Some(target) => (
                        target.module_name(),
                        target.entity_name(),
                        self.module_path(LayerKind::Entity, target),
                    ),
                    None => {
                        let stripped = strip_table_prefix(&relation.target_table, &table.strip_prefix);
                        let module = to_snake_case(stripped);
                        let dir = self.layer_dir(LayerKind::Entity, &relation.target_table);
                        let path = format!(
                            "{}::{}",
                            module_path_for_dir(&dir, ""),
                            LayerKind::Entity.module_ident(&module)
                        );
                        (module, to_pascal_case(stripped), path)
                    }
                };

                let mut variant = target_entity.clone();
                if !used_variants.insert(variant.clone()) {
                    variant = format!("{target_entity}By{}", to_pascal_case(&relation.from_column));
                    used_variants.insert(variant.clone());
                }

                let from_field = field_of(Some(table), &relation.from_column);
                let to_field = field_of(target, &relation.to_column);
                RelationContext {
                    kind: relation.kind,
                    variant,
                    target_table: relation.target_table.clone(),
                    target_module,
                    target_entity,
                    target_path,
                    from_column: relation.from_column.clone(),
                    to_column: relation.to_column.clone(),
                    from_variant: to_pascal_case(&from_field),
                    to_variant: to_pascal_case(&to_field),
                    from_field,
                    to_field,
                }
            })
            .collect()
    }
}

/// Output sub-directory for the table's schema; empty for the default schema.
pub fn schema_dir(table: &Table, default_schema: &str) -> String {
    let schema = table.schema.trim();
    if schema.is_empty() || schema == default_schema {
        String::new()
    } else {
        to_snake_case(schema)
    }
}

/// Import path of a derive the generated code commonly selects.
pub fn trait_path(name: &str) -> Option<&'static str> {
    match name {
        "Serialize" => Some("serde::Serialize"),
        "Deserialize" => Some("serde::Deserialize"),
        "ToSchema" => Some("utoipa::ToSchema"),
        "Validate" => Some("validator::Validate"),
        "TypedBuilder" => Some("typed_builder::TypedBuilder"),
        _ => None,
    }
}

fn strip_table_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return name;
    }
    match name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    }
}

fn field_of(table: Option<&Table>, column: &str) -> String {
    table
        .and_then(|table| table.column(column))
        .map(Column::plain_field_name)
        .unwrap_or_else(|| to_snake_case(column))
}

fn column_context(col: &Column) -> ColumnContext {
    ColumnContext {
        name: col.name.clone(),
        field: col.field_ident(),
        variant: to_pascal_case(&col.plain_field_name()),
        rust_type: col.rust_type.clone(),
        full_type: col.full_type(),
        optional_type: format!("Option<{}>", col.rust_type),
        view_type: types::view_type(&col.rust_type, col.nullable),
        view_coerced: types::is_view_coerced(&col.rust_type),
        annotation: types::column_annotation(col),
        attrs: types::column_attributes(col),
        nullable: col.nullable,
        primary_key: col.primary_key,
        auto_increment: col.auto_increment,
        unique: col.unique,
        comment: col.comment.clone(),
        default_value: col.default_value.clone(),
        is_virtual: col.is_virtual,
        extensions: col.extensions.clone(),
    }
}

fn timestamp_context(col: &Column) -> TimestampContext {
    TimestampContext {
        column: col.name.clone(),
        field: col.field_ident(),
        ty: col.rust_type.clone(),
        nullable: col.nullable,
        now_expr: types::now_expression(&col.rust_type),
    }
}
