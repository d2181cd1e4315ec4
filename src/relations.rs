//! Foreign-key relation inference.
//!
//! Every accepted foreign key yields a `belongs_to` on the referencing table
//! and a `has_one`/`has_many` on the referenced table. Drivers that cannot
//! report the referenced table fall back to matching known table names inside
//! the constraint name. That heuristic resolves to the wrong table when a
//! constraint name embeds an unrelated table's name; this is a known
//! limitation.

use std::collections::{BTreeMap, BTreeSet};

use crate::schema::{RawForeignKey, RawSchema, Relation, RelationKind};

pub type RelationMap = BTreeMap<String, Vec<Relation>>;

/// Read access to foreign-key metadata whose referenced side may be missing.
pub trait ForeignKeyInfo {
    fn constraint_name(&self) -> &str;
    fn column(&self) -> &str;
    fn referenced_table(&self) -> Option<&str>;
    fn referenced_column(&self) -> Option<&str>;
}

impl ForeignKeyInfo for RawForeignKey {
    fn constraint_name(&self) -> &str {
        &self.name
    }

    fn column(&self) -> &str {
        &self.column
    }

    fn referenced_table(&self) -> Option<&str> {
        self.referenced_table.as_deref().filter(|t| !t.is_empty())
    }

    fn referenced_column(&self) -> Option<&str> {
        self.referenced_column.as_deref().filter(|c| !c.is_empty())
    }
}

/// Resolves the referenced table: structured metadata first, then the longest
/// known table name (other than `source`) contained in the constraint name.
pub fn resolve_referenced_table<F: ForeignKeyInfo + ?Sized>(
    fk: &F,
    source: &str,
    known_tables: &[&str],
) -> Option<String> {
    if let Some(table) = fk.referenced_table() {
        return Some(table.to_string());
    }
    let constraint = fk.constraint_name();
    if constraint.is_empty() {
        return None;
    }
    known_tables
        .iter()
        .filter(|name| **name != source && constraint.contains(**name))
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .map(|name| name.to_string())
}

/// Detects relations among `selected` tables.
pub fn detect_relations(schema: &RawSchema, selected: &BTreeSet<String>) -> RelationMap {
    let known: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    let mut detected: RelationMap = BTreeMap::new();

    for table in schema
        .tables
        .iter()
        .filter(|table| selected.contains(&table.name))
    {
        for fk in &table.foreign_keys {
            if fk.column().is_empty() {
                continue;
            }
            let Some(target) = resolve_referenced_table(fk, &table.name, &known) else {
                tracing::debug!(
                    table = %table.name,
                    constraint = fk.constraint_name(),
                    "foreign key target unresolved, skipping"
                );
                continue;
            };
            if !selected.contains(&target) {
                continue;
            }
            let to_column = fk.referenced_column().unwrap_or("id");

            push_unique(
                &mut detected,
                &table.name,
                Relation::belongs_to(&target, fk.column(), to_column),
            );
            let reverse = if table.is_uniquely_constrained(fk.column()) {
                Relation::has_one(&table.name, to_column, fk.column())
            } else {
                Relation::has_many(&table.name, to_column, fk.column())
            };
            push_unique(&mut detected, &target, reverse);
        }
    }

    detected
}

/// Combines detected relations with user-declared ones.
///
/// A user relation replaces a detected relation with the same
/// (target, from, to) key. User `belongs_to` relations also add the mirrored
/// `has_many` on their target when that target is selected and has no
/// relation with the mirrored key yet.
pub fn merge_relations(
    detected: &RelationMap,
    custom: &RelationMap,
    selected: &BTreeSet<String>,
) -> RelationMap {
    let mut merged: RelationMap = BTreeMap::new();
    let empty = Vec::new();

    let owners: BTreeSet<&String> = detected.keys().chain(custom.keys()).collect();
    for owner in owners {
        if !selected.contains(owner) {
            continue;
        }
        let user = custom.get(owner).unwrap_or(&empty);
        let user_keys: BTreeSet<_> = user.iter().map(Relation::key).collect();
        let entry = merged.entry(owner.clone()).or_default();
        for relation in detected.get(owner).unwrap_or(&empty) {
            if !user_keys.contains(&relation.key()) && !entry.contains(relation) {
                entry.push(relation.clone());
            }
        }
        for relation in user {
            if !entry.contains(relation) {
                entry.push(relation.clone());
            }
        }
    }

    for (owner, relations) in custom {
        if !selected.contains(owner) {
            continue;
        }
        for relation in relations
            .iter()
            .filter(|r| r.kind == RelationKind::BelongsTo)
        {
            if !selected.contains(&relation.target_table) {
                continue;
            }
            let mirror = Relation::has_many(owner, &relation.to_column, &relation.from_column);
            let entry = merged.entry(relation.target_table.clone()).or_default();
            if !entry.iter().any(|existing| existing.key() == mirror.key()) {
                entry.push(mirror);
            }
        }
    }

    for relations in merged.values_mut() {
        relations.sort();
    }
    merged.retain(|_, relations| !relations.is_empty());
    merged
}

fn push_unique(map: &mut RelationMap, owner: &str, relation: Relation) {
    let entry = map.entry(owner.to_string()).or_default();
    if !entry.contains(&relation) {
        entry.push(relation);
    }
}
