use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CodegenError, CodegenResult},
    layer::LayerKind,
    naming::is_valid_ident,
    schema::{Column, Relation, Table},
};

const OVERRIDES_VERSION: u32 = 1;

/// Per-table customization persisted by the user.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableOverride {
    pub entity_name: Option<String>,
    pub excluded_columns: BTreeSet<String>,
    pub column_types: BTreeMap<String, String>,
    pub column_comments: BTreeMap<String, String>,
    pub column_names: BTreeMap<String, String>,
    pub column_extensions: BTreeMap<String, BTreeMap<String, String>>,
    pub virtual_columns: Vec<VirtualColumn>,
    pub relations: Vec<Relation>,
    pub layers: BTreeMap<LayerKind, bool>,
    pub output_dirs: BTreeMap<LayerKind, String>,
    pub traits: BTreeMap<LayerKind, Vec<String>>,
}

/// A column the user adds on top of what the reader reported.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualColumn {
    pub name: String,
    pub rust_type: String,
    pub sql_type: Option<String>,
    pub nullable: bool,
    pub comment: Option<String>,
    pub default_value: Option<String>,
    pub extensions: BTreeMap<String, String>,
}

impl TableOverride {
    /// Produces a customized copy of `table`; `table` itself is left untouched.
    ///
    /// Excluded columns are dropped first, then type, comment, name and
    /// extension overrides are applied to the remaining columns, and finally
    /// virtual columns are appended.
    pub fn apply(&self, table: &Table) -> CodegenResult<Table> {
        if let Some(entity) = &self.entity_name {
            if !is_valid_ident(entity) {
                return Err(CodegenError::invalid_override(
                    &table.name,
                    format!("entity name '{entity}' is not a valid identifier"),
                ));
            }
        }

        let mut columns: Vec<Column> = table
            .columns
            .iter()
            .filter(|col| !self.excluded_columns.contains(&col.name))
            .cloned()
            .map(|col| self.rewrite_column(&table.name, col))
            .collect::<CodegenResult<_>>()?;

        for virtual_column in &self.virtual_columns {
            if !is_valid_ident(&virtual_column.name) {
                return Err(CodegenError::invalid_override(
                    &table.name,
                    format!("virtual column '{}' is not a valid identifier", virtual_column.name),
                ));
            }
            if virtual_column.rust_type.trim().is_empty() {
                return Err(CodegenError::invalid_override(
                    &table.name,
                    format!("virtual column '{}' has no type", virtual_column.name),
                ));
            }
            if columns.iter().any(|col| col.name == virtual_column.name) {
                return Err(CodegenError::invalid_override(
                    &table.name,
                    format!("virtual column '{}' duplicates an existing column", virtual_column.name),
                ));
            }
            columns.push(virtual_column.to_column());
        }

        let primary_keys = table
            .primary_keys
            .iter()
            .filter(|key| columns.iter().any(|col| &col.name == *key))
            .cloned()
            .collect();

        Ok(Table {
            columns,
            primary_keys,
            entity_name_override: self
                .entity_name
                .clone()
                .or_else(|| table.entity_name_override.clone()),
            ..table.clone()
        })
    }

    fn rewrite_column(&self, table: &str, mut col: Column) -> CodegenResult<Column> {
        if let Some(ty) = self.column_types.get(&col.name) {
            col.rust_type = ty.trim().to_string();
        }
        if let Some(comment) = self.column_comments.get(&col.name) {
            col.comment = Some(comment.clone()).filter(|c| !c.trim().is_empty());
        }
        if let Some(field) = self.column_names.get(&col.name) {
            if !is_valid_ident(field) {
                return Err(CodegenError::invalid_override(
                    table,
                    format!("field name '{field}' for column '{}' is not a valid identifier", col.name),
                ));
            }
            col.field_name = Some(field.clone());
        }
        if let Some(extensions) = self.column_extensions.get(&col.name) {
            col.extensions
                .extend(extensions.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(col)
    }

    pub fn layer_enabled(&self, kind: LayerKind) -> bool {
        self.layers.get(&kind).copied().unwrap_or(true)
    }

    pub fn output_dir(&self, kind: LayerKind) -> Option<&str> {
        self.output_dirs
            .get(&kind)
            .map(String::as_str)
            .filter(|dir| !dir.trim().is_empty())
    }

    pub fn traits(&self, kind: LayerKind) -> &[String] {
        self.traits.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl VirtualColumn {
    fn to_column(&self) -> Column {
        Column {
            name: self.name.clone(),
            field_name: None,
            sql_type: self.sql_type.clone().unwrap_or_default(),
            rust_type: self.rust_type.trim().to_string(),
            primary_key: false,
            nullable: self.nullable,
            auto_increment: false,
            unique: false,
            comment: self.comment.clone(),
            default_value: self.default_value.clone(),
            extensions: self.extensions.clone(),
            is_virtual: true,
        }
    }
}

/// The persisted override file: table name -> override.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverrideSet {
    pub version: u32,
    pub tables: BTreeMap<String, TableOverride>,
}

impl Default for OverrideSet {
    fn default() -> Self {
        Self {
            version: OVERRIDES_VERSION,
            tables: BTreeMap::new(),
        }
    }
}

impl OverrideSet {
    /// Loads the file at `path`; a missing file is an empty set.
    pub fn load(path: &Path) -> CodegenResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).map_err(|err| CodegenError::io("read", path, err))?;
        serde_json::from_str(&contents).map_err(|source| CodegenError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> CodegenResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| CodegenError::io("create", parent, err))?;
        }
        let mut contents = serde_json::to_string_pretty(self).map_err(|source| {
            CodegenError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        contents.push('\n');
        fs::write(path, contents).map_err(|err| CodegenError::io("write", path, err))
    }

    pub fn get(&self, table: &str) -> Option<&TableOverride> {
        self.tables.get(table)
    }

    /// User-declared relations keyed by owning table.
    pub fn custom_relations(&self) -> BTreeMap<String, Vec<Relation>> {
        self.tables
            .iter()
            .filter(|(_, ov)| !ov.relations.is_empty())
            .map(|(table, ov)| (table.clone(), ov.relations.clone()))
            .collect()
    }
}
