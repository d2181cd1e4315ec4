use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    naming::{safe_ident, to_pascal_case, to_snake_case},
    schema::raw::RawTable,
    types,
};

pub const CREATED_AT_NAMES: &[&str] = &[
    "created_at",
    "create_time",
    "created_time",
    "gmt_create",
    "created_on",
];

pub const UPDATED_AT_NAMES: &[&str] = &[
    "updated_at",
    "update_time",
    "updated_time",
    "gmt_modified",
    "updated_on",
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Table {
    pub name: String,
    pub comment: Option<String>,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<String>,
    /// Prefix removed from `name` to derive every generated name.
    pub strip_prefix: String,
    pub schema: String,
    pub entity_name_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Column {
    pub name: String,
    /// Field name chosen by an override; the database column keeps `name`.
    pub field_name: Option<String>,
    pub sql_type: String,
    pub rust_type: String,
    pub primary_key: bool,
    pub nullable: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub comment: Option<String>,
    pub default_value: Option<String>,
    pub extensions: BTreeMap<String, String>,
    pub is_virtual: bool,
}

impl Table {
    pub fn from_raw(raw: &RawTable, strip_prefix: &str) -> Self {
        let primary_keys: Vec<String> = raw
            .primary_key_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let columns = raw
            .columns
            .iter()
            .map(|col| {
                let primary_key = primary_keys.contains(&col.name);
                Column {
                    name: col.name.clone(),
                    field_name: None,
                    sql_type: col.sql_type.clone(),
                    rust_type: col
                        .rust_type
                        .clone()
                        .unwrap_or_else(|| types::map_sql_type(&col.sql_type)),
                    primary_key,
                    nullable: col.nullable && !primary_key,
                    auto_increment: col.auto_increment,
                    unique: col.unique
                        || raw.unique_indexes.iter().any(|index| {
                            index.columns.len() == 1 && index.columns[0] == col.name
                        }),
                    comment: col.comment.clone().filter(|c| !c.trim().is_empty()),
                    default_value: col.default_value.clone(),
                    extensions: BTreeMap::new(),
                    is_virtual: false,
                }
            })
            .collect();

        Self {
            name: raw.name.clone(),
            comment: raw.comment.clone().filter(|c| !c.trim().is_empty()),
            columns,
            primary_keys,
            strip_prefix: strip_prefix.to_string(),
            schema: raw.schema.clone(),
            entity_name_override: None,
        }
    }

    pub fn stripped_name(&self) -> &str {
        if self.strip_prefix.is_empty() {
            return &self.name;
        }
        match self.name.strip_prefix(&self.strip_prefix) {
            Some(rest) if !rest.is_empty() => rest,
            _ => &self.name,
        }
    }

    pub fn entity_name(&self) -> String {
        match &self.entity_name_override {
            Some(custom) => to_pascal_case(custom),
            None => to_pascal_case(self.stripped_name()),
        }
    }

    pub fn module_name(&self) -> String {
        match &self.entity_name_override {
            Some(custom) => to_snake_case(custom),
            None => to_snake_case(self.stripped_name()),
        }
    }

    pub fn service_name(&self) -> String {
        format!("{}Service", self.entity_name())
    }

    pub fn dto_name(&self) -> String {
        format!("{}Dto", self.entity_name())
    }

    pub fn vo_name(&self) -> String {
        format!("{}Vo", self.entity_name())
    }

    pub fn query_name(&self) -> String {
        format!("{}Query", self.entity_name())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn created_at_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|col| CREATED_AT_NAMES.contains(&col.name.as_str()))
    }

    pub fn updated_at_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|col| UPDATED_AT_NAMES.contains(&col.name.as_str()))
    }

    /// Columns a create request carries: no auto-increment keys, no
    /// timestamps, nothing virtual.
    pub fn insertable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|col| !col.is_virtual)
            .filter(|col| !(col.primary_key && col.auto_increment))
            .filter(|col| !col.is_timestamp())
            .collect()
    }

    /// Columns an update request may change: no keys, no creation
    /// timestamp, nothing virtual.
    pub fn updatable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|col| !col.is_virtual)
            .filter(|col| !col.primary_key)
            .filter(|col| !CREATED_AT_NAMES.contains(&col.name.as_str()))
            .collect()
    }

    /// Columns offered as list filters.
    pub fn queryable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|col| !col.is_virtual)
            .filter(|col| !types::is_unfilterable(&col.rust_type))
            .collect()
    }
}

impl Column {
    pub fn is_timestamp(&self) -> bool {
        CREATED_AT_NAMES.contains(&self.name.as_str())
            || UPDATED_AT_NAMES.contains(&self.name.as_str())
    }

    /// Field name without keyword escaping.
    pub fn plain_field_name(&self) -> String {
        to_snake_case(self.field_name.as_deref().unwrap_or(&self.name))
    }

    pub fn field_ident(&self) -> String {
        safe_ident(&self.plain_field_name())
    }

    /// `true` when the emitted field no longer matches the database column.
    pub fn is_renamed(&self) -> bool {
        self.plain_field_name() != self.name
    }

    pub fn full_type(&self) -> String {
        if self.nullable {
            format!("Option<{}>", self.rust_type)
        } else {
            self.rust_type.clone()
        }
    }
}
