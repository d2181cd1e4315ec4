use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CodegenError, CodegenResult};

/// Snapshot produced by the external schema reader.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawSchema {
    pub tables: Vec<RawTable>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawTable {
    pub name: String,
    pub schema: String,
    pub comment: Option<String>,
    pub columns: Vec<RawColumn>,
    pub primary_keys: Vec<String>,
    pub unique_indexes: Vec<RawIndex>,
    pub foreign_keys: Vec<RawForeignKey>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawColumn {
    pub name: String,
    pub sql_type: String,
    /// Target type already resolved by the reader, if it did so.
    pub rust_type: Option<String>,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub comment: Option<String>,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
}

/// Foreign key as reported by the reader. Some drivers cannot report the
/// referenced side, so both `referenced_*` fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RawForeignKey {
    pub name: String,
    pub column: String,
    pub referenced_table: Option<String>,
    pub referenced_column: Option<String>,
}

impl RawSchema {
    pub fn load(path: &Path) -> CodegenResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| CodegenError::io("read", path, err))?;
        serde_json::from_str(&contents).map_err(|source| CodegenError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn table(&self, name: &str) -> Option<&RawTable> {
        self.tables.iter().find(|table| table.name == name)
    }
}

impl RawTable {
    /// A column is uniquely constrained when it is flagged unique, is the only
    /// column of a unique index, or is the only primary key.
    pub fn is_uniquely_constrained(&self, column: &str) -> bool {
        let flagged = self
            .columns
            .iter()
            .any(|col| col.name == column && col.unique);
        let sole_index = self
            .unique_indexes
            .iter()
            .any(|index| index.columns.len() == 1 && index.columns[0] == column);
        let sole_pk = self.primary_key_names().as_slice() == [column];
        flagged || sole_index || sole_pk
    }

    /// Primary keys in declaration order, merging the explicit list with
    /// per-column flags.
    pub fn primary_key_names(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.primary_keys.iter().map(String::as_str).collect();
        for column in &self.columns {
            if column.primary_key && !keys.contains(&column.name.as_str()) {
                keys.push(column.name.as_str());
            }
        }
        keys
    }
}
