//! Per-relationship exclusion lists.
//!
//! A pair reference `["shared", ["react"]]` on consumer `app` produces two keys:
//! the narrow key `app:shared` and, if nobody defined it first, the broad key
//! `shared`. Lookups try the narrow key before the broad one.

use super::manifest::LayerRecord;
use std::collections::{BTreeSet, HashMap};

/// A broad exclusion definition that lost to an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExclusion {
    /// The layer whose broad key was defined twice.
    pub layer: String,
    /// Consumer whose definition was ignored.
    pub consumer: String,
    /// Set that stays in effect.
    pub kept: BTreeSet<String>,
    /// Set that was dropped.
    pub ignored: BTreeSet<String>,
}

/// Composite-key exclusion lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionTable {
    entries: HashMap<String, BTreeSet<String>>,
}

impl ExclusionTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for one consumer/layer relationship.
    #[must_use]
    pub fn narrow_key(consumer: &str, layer: &str) -> String {
        format!("{consumer}:{layer}")
    }

    /// Build the table from every record's pair-form references.
    ///
    /// Records are visited in iteration order, so the first writer of a broad
    /// key is the first consumer in that order. Later broad definitions with a
    /// different set are returned as duplicates and otherwise ignored.
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a LayerRecord>,
    ) -> (Self, Vec<DuplicateExclusion>) {
        let mut table = Self::new();
        let mut duplicates = Vec::new();

        for record in records {
            for layer in record.layer_refs() {
                let Some(excluded) = layer.exclusions() else {
                    continue;
                };

                table
                    .entries
                    .entry(Self::narrow_key(&record.name, layer.name()))
                    .or_insert_with(|| excluded.clone());

                match table.entries.get(layer.name()) {
                    None => {
                        table
                            .entries
                            .insert(layer.name().to_string(), excluded.clone());
                    }
                    Some(kept) if kept != excluded => duplicates.push(DuplicateExclusion {
                        layer: layer.name().to_string(),
                        consumer: record.name.clone(),
                        kept: kept.clone(),
                        ignored: excluded.clone(),
                    }),
                    Some(_) => {}
                }
            }
        }

        (table, duplicates)
    }

    /// Insert (or replace) the set for a raw key.
    pub fn insert(&mut self, key: impl Into<String>, excluded: BTreeSet<String>) {
        self.entries.insert(key.into(), excluded);
    }

    /// Exclusions for merging `layer` into `consumer`: narrow key first, then broad.
    #[must_use]
    pub fn lookup(&self, consumer: &str, layer: &str) -> Option<&BTreeSet<String>> {
        self.entries
            .get(&Self::narrow_key(consumer, layer))
            .or_else(|| self.entries.get(layer))
    }

    /// Whether `dep` is excluded when merging `layer` into `consumer`.
    #[must_use]
    pub fn is_excluded(&self, consumer: &str, layer: &str, dep: &str) -> bool {
        self.lookup(consumer, layer).is_some_and(|set| set.contains(dep))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
