use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    HasOne,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasMany => "has_many",
            RelationKind::HasOne => "has_one",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of a foreign key, owned by the table it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub target_table: String,
    pub from_column: String,
    pub to_column: String,
}

impl Relation {
    pub fn new(
        kind: RelationKind,
        target_table: impl Into<String>,
        from_column: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target_table: target_table.into(),
            from_column: from_column.into(),
            to_column: to_column.into(),
        }
    }

    pub fn belongs_to(target: &str, from: &str, to: &str) -> Self {
        Self::new(RelationKind::BelongsTo, target, from, to)
    }

    pub fn has_many(target: &str, from: &str, to: &str) -> Self {
        Self::new(RelationKind::HasMany, target, from, to)
    }

    pub fn has_one(target: &str, from: &str, to: &str) -> Self {
        Self::new(RelationKind::HasOne, target, from, to)
    }

    /// Identity used when merging detected and user-declared relations.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.target_table, &self.from_column, &self.to_column)
    }
}
