//! Layer registry building from discovery output.

use super::collector::SENTINEL;
use super::error::HoistError;
use super::exclusion::{DuplicateExclusion, ExclusionTable};
use super::manifest::LayerRecord;
use std::collections::{BTreeMap, BTreeSet};

/// Side-channel records parsed from one discovery run.
#[derive(Debug, Clone, Default)]
pub struct ParsedDiscovery {
    /// Records keyed by name; a later line for a name replaces an earlier one.
    pub records: BTreeMap<String, LayerRecord>,
    /// Sentinel lines whose payload did not parse.
    pub ignored_lines: usize,
}

/// Parse every sentinel line of captured walker output.
///
/// Lines without the sentinel are walker progress and are skipped. Sentinel
/// lines that fail to parse are counted and otherwise ignored.
#[must_use]
pub fn parse_discovery_output(output: &str) -> ParsedDiscovery {
    let mut parsed = ParsedDiscovery::default();

    for line in output.lines() {
        let Some(payload) = line.trim_end_matches('\r').strip_prefix(SENTINEL) else {
            continue;
        };
        match serde_json::from_str::<LayerRecord>(payload) {
            Ok(record) => {
                parsed.records.insert(record.name.clone(), record);
            }
            Err(_) => parsed.ignored_lines += 1,
        }
    }

    parsed
}

/// Names that take part in layering: every record declaring `hoistLayer`, plus
/// every name its `hoistLayer` list references.
#[must_use]
pub fn referenced_layers<'a>(records: impl IntoIterator<Item = &'a LayerRecord>) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();
    for record in records {
        if !record.declares_hoist_layer() {
            continue;
        }
        referenced.insert(record.name.clone());
        for layer in record.layer_refs() {
            referenced.insert(layer.name().to_string());
        }
    }
    referenced
}

/// Validated, not yet flattened registry contents.
#[derive(Debug, Clone, Default)]
pub struct BuiltRegistry {
    /// Layer records keyed by name.
    pub records: BTreeMap<String, LayerRecord>,
    /// Exclusions from every pair-form reference.
    pub exclusions: ExclusionTable,
    /// Every name referenced as a layer.
    pub referenced: BTreeSet<String>,
    /// Discovered packages dropped because nothing references them as layers.
    pub pruned: Vec<String>,
    /// Broad exclusion definitions that lost to an earlier one.
    pub duplicates: Vec<DuplicateExclusion>,
    /// Sentinel lines that failed to parse.
    pub ignored_lines: usize,
}

/// Build and validate the registry from captured discovery output.
///
/// Fails with every missing name if any referenced layer was never discovered;
/// nothing is returned for flattening in that case.
pub fn build_registry(output: &str) -> Result<BuiltRegistry, HoistError> {
    let ParsedDiscovery {
        mut records,
        ignored_lines,
    } = parse_discovery_output(output);

    let referenced = referenced_layers(records.values());

    let pruned: Vec<String> = records
        .keys()
        .filter(|name| !referenced.contains(*name))
        .cloned()
        .collect();
    for name in &pruned {
        records.remove(name);
    }

    let missing: Vec<String> = referenced
        .iter()
        .filter(|name| !records.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(HoistError::missing_layers(missing));
    }

    let (exclusions, duplicates) = ExclusionTable::from_records(records.values());

    Ok(BuiltRegistry {
        records,
        exclusions,
        referenced,
        pruned,
        duplicates,
        ignored_lines,
    })
}

/// Flattened layer records plus their exclusion table, read-only once built.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    records: BTreeMap<String, LayerRecord>,
    exclusions: ExclusionTable,
}

impl LayerRegistry {
    /// Wrap already-flattened records and their exclusion table.
    #[must_use]
    pub fn new(records: BTreeMap<String, LayerRecord>, exclusions: ExclusionTable) -> Self {
        Self {
            records,
            exclusions,
        }
    }

    /// Rebuild a registry from lock artifact records.
    ///
    /// The exclusion table is derived again from the stored `hoistLayer` lists.
    #[must_use]
    pub fn from_records(records: Vec<LayerRecord>) -> (Self, Vec<DuplicateExclusion>) {
        let records: BTreeMap<String, LayerRecord> = records
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();
        let (exclusions, duplicates) = ExclusionTable::from_records(records.values());
        (Self::new(records, exclusions), duplicates)
    }

    /// Get a layer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LayerRecord> {
        self.records.get(name)
    }

    /// Check if a name is a registered layer.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Records sorted by name.
    pub fn records(&self) -> impl Iterator<Item = &LayerRecord> {
        self.records.values()
    }

    /// Records sorted by name, cloned for serialization.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<LayerRecord> {
        self.records.values().cloned().collect()
    }

    #[must_use]
    pub fn exclusions(&self) -> &ExclusionTable {
        &self.exclusions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hoist::error::codes;

    fn line(json: &str) -> String {
        format!("{SENTINEL}{json}")
    }

    #[test]
    fn test_parse_skips_noise_and_bad_payloads() {
        let output = [
            "Scope: all 3 workspace projects".to_string(),
            line(r#"{"name":"base","dependencies":{"lodash":"^4.0.0"},"devDependencies":{}}"#),
            line("{broken"),
            "Progress: resolved 12, reused 12".to_string(),
            line(r#"{"name":"mid","dependencies":{"base":"*"},"devDependencies":{},"hoistLayer":["base"]}"#),
        ]
        .join("\n");

        let parsed = parse_discovery_output(&output);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.ignored_lines, 1);
        assert!(parsed.records["mid"].declares_hoist_layer());
    }

    #[test]
    fn test_parse_handles_crlf() {
        let output = format!("{}\r\n", line(r#"{"name":"base"}"#));
        let parsed = parse_discovery_output(&output);
        assert!(parsed.records.contains_key("base"));
    }

    #[test]
    fn test_build_prunes_non_layers() {
        let output = [
            line(r#"{"name":"app","dependencies":{"mid":"*","lodash":"^4"}}"#),
            line(r#"{"name":"lodash","dependencies":{}}"#),
            line(r#"{"name":"mid","dependencies":{"base":"*"},"hoistLayer":["base"]}"#),
            line(r#"{"name":"base","dependencies":{"lodash":"^4.0.0"}}"#),
        ]
        .join("\n");

        let built = build_registry(&output).unwrap();
        let names: Vec<_> = built.records.keys().map(String::as_str).collect();
        assert_eq!(names, ["base", "mid"]);
        assert_eq!(built.pruned, ["app", "lodash"]);
        assert_eq!(
            built.referenced.iter().map(String::as_str).collect::<Vec<_>>(),
            ["base", "mid"]
        );
    }

    #[test]
    fn test_build_fails_on_missing_layer() {
        let output = [
            line(r#"{"name":"app","dependencies":{},"hoistLayer":["ghost","base"]}"#),
            line(r#"{"name":"base","dependencies":{}}"#),
            line(r#"{"name":"web","dependencies":{},"hoistLayer":["phantom"]}"#),
        ]
        .join("\n");

        let err = build_registry(&output).unwrap_err();
        assert_eq!(err.code(), codes::HOIST_LAYER_MISSING);
        assert_eq!(err.missing_names(), ["ghost", "phantom"]);
    }

    #[test]
    fn test_build_collects_exclusions_from_pairs() {
        let output = [
            line(r#"{"name":"app","dependencies":{"shared":"*"},"hoistLayer":[["shared",["react"]]]}"#),
            line(r#"{"name":"web","dependencies":{"shared":"*"},"hoistLayer":[["shared",["vue"]]]}"#),
            line(r#"{"name":"shared","dependencies":{"react":"^18","vue":"^3"}}"#),
        ]
        .join("\n");

        let built = build_registry(&output).unwrap();
        assert!(built.exclusions.is_excluded("app", "shared", "react"));
        assert!(built.exclusions.is_excluded("web", "shared", "vue"));
        assert_eq!(built.duplicates.len(), 1);
        assert_eq!(built.duplicates[0].consumer, "web");
    }

    #[test]
    fn test_empty_output_builds_empty_registry() {
        let built = build_registry("nothing to see\n").unwrap();
        assert!(built.records.is_empty());
        assert!(built.referenced.is_empty());
    }

    #[test]
    fn test_registry_from_records_rebuilds_exclusions() {
        let mut app = LayerRecord::new("app");
        app.hoist_layer = Some(vec![crate::hoist::manifest::LayerRef::WithExclusions(
            "shared".into(),
            ["react".to_string()].into_iter().collect(),
        )]);
        let shared = LayerRecord::new("shared");

        let (registry, duplicates) = LayerRegistry::from_records(vec![shared, app]);
        assert!(duplicates.is_empty());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("shared"));
        assert!(registry.exclusions().is_excluded("app", "shared", "react"));
        let names: Vec<_> = registry.records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["app", "shared"]);
    }
}
