//! Fixed-point flattening of layer-to-layer references.
//!
//! Each layer ends up holding, transitively, the entries of every layer it
//! depends on (by dependency name), minus excluded names. Existing keys are
//! never overwritten: the first writer wins and no version comparison happens.
//!
//! Flattening runs in rounds. Within a round every target merges from the
//! same snapshot, with sources visited in name order, so the result does not
//! depend on the order in which layers were discovered or flattened. Rounds
//! repeat over a fresh snapshot until one copies nothing.

use super::exclusion::ExclusionTable;
use super::manifest::{DepMap, LayerRecord};
use std::collections::{BTreeMap, BTreeSet};

/// One layer merged into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeEvent {
    pub target: String,
    pub source: String,
    /// `dependencies` entries copied.
    pub dependencies: usize,
    /// `devDependencies` entries copied.
    pub dev_dependencies: usize,
}

/// What a flattening run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// Merges in the order they happened.
    pub merges: Vec<MergeEvent>,
    /// Total passes over candidate lists, across all targets and rounds.
    pub passes: usize,
    /// Rounds over the whole registry, including the final one that copied nothing.
    pub rounds: usize,
}

impl FlattenReport {
    /// Total entries copied across all merges.
    #[must_use]
    pub fn entries_copied(&self) -> usize {
        self.merges
            .iter()
            .map(|m| m.dependencies + m.dev_dependencies)
            .sum()
    }
}

/// Copy entries of `source` missing from `target`, skipping `excluded` names.
///
/// `owner` is the package that owns `target`; a package never inherits a
/// dependency on itself through a layer cycle. Returns the number of entries
/// copied. Keys already in `target` keep their value.
pub fn merge_missing(
    target: &mut DepMap,
    source: &DepMap,
    owner: &str,
    excluded: Option<&BTreeSet<String>>,
) -> usize {
    let mut copied = 0;
    for (name, range) in source {
        if name == owner
            || target.contains_key(name)
            || excluded.is_some_and(|set| set.contains(name))
        {
            continue;
        }
        target.insert(name.clone(), range.clone());
        copied += 1;
    }
    copied
}

/// Flatten every record in place until no merge changes anything.
///
/// Running it again on its own output copies nothing.
pub fn flatten(records: &mut BTreeMap<String, LayerRecord>, exclusions: &ExclusionTable) -> FlattenReport {
    let mut report = FlattenReport::default();

    loop {
        report.rounds += 1;
        let snapshot = records.clone();
        let mut copied = 0;

        for target in records.values_mut() {
            copied += flatten_one(target, &snapshot, exclusions, &mut report);
        }

        // A source can grow during a round after its consumers already read it.
        if copied == 0 {
            break;
        }
    }

    report
}

/// Merge reachable layers of `snapshot` into `target`, returning entries copied.
fn flatten_one(
    target: &mut LayerRecord,
    snapshot: &BTreeMap<String, LayerRecord>,
    exclusions: &ExclusionTable,
    report: &mut FlattenReport,
) -> usize {
    let mut copied = 0;
    let mut candidates: BTreeMap<&str, &LayerRecord> = snapshot
        .iter()
        .filter(|(name, _)| **name != target.name)
        .map(|(name, record)| (name.as_str(), record))
        .collect();

    loop {
        report.passes += 1;
        let mut changed = false;
        let mut merged = Vec::new();

        for (&name, source) in &candidates {
            if !target.depends_on(name) {
                continue;
            }

            let excluded = exclusions.lookup(&target.name, name);
            let dependencies = merge_missing(
                &mut target.dependencies,
                &source.dependencies,
                &target.name,
                excluded,
            );
            let dev_dependencies = merge_missing(
                &mut target.dev_dependencies,
                &source.dev_dependencies,
                &target.name,
                excluded,
            );

            report.merges.push(MergeEvent {
                target: target.name.clone(),
                source: name.to_string(),
                dependencies,
                dev_dependencies,
            });
            merged.push(name);
            changed |= dependencies + dev_dependencies > 0;
            copied += dependencies + dev_dependencies;
        }

        for name in merged {
            candidates.remove(name);
        }

        // A pass that copies nothing cannot make the target depend on a new
        // layer, so the remaining candidates stay unreachable.
        if !changed {
            break;
        }
    }

    copied
}
