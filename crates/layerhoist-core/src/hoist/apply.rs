//! Apply hook: rewrites manifests during the real install pass.

use super::context::HoistContext;
use super::error::HoistError;
use super::flatten::merge_missing;
use super::manifest::PackageManifest;
use super::registry::LayerRegistry;

/// One layer merged into a consuming manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoistedLayer {
    pub layer: String,
    pub dependencies_added: usize,
    pub dev_dependencies_added: usize,
}

/// What the apply hook did to a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Neither a layer nor a consumer of one.
    Untouched,
    /// The manifest is itself a layer; its maps were replaced by the flattened ones.
    SelfLayer {
        dependencies: usize,
        dev_dependencies: usize,
    },
    /// Layers the manifest depends on, in merge order.
    Hoisted(Vec<HoistedLayer>),
}

impl ApplyOutcome {
    /// Whether the manifest was changed (or replaced) at all.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        matches!(self, Self::Untouched)
    }
}

/// Rewrite `manifest` against a ready registry.
///
/// A layer gets its flattened maps wholesale. Any other manifest merges every
/// layer it names in `dependencies` then `devDependencies`, never overwriting
/// its own entries and honoring `manifest:layer` then `layer` exclusions.
pub fn apply_layers(manifest: &mut PackageManifest, registry: &LayerRegistry) -> ApplyOutcome {
    if let Some(record) = registry.get(&manifest.name) {
        manifest.dependencies = record.dependencies.clone();
        manifest.dev_dependencies = record.dev_dependencies.clone();
        return ApplyOutcome::SelfLayer {
            dependencies: record.dependencies.len(),
            dev_dependencies: record.dev_dependencies.len(),
        };
    }

    let mut hoisted = Vec::new();
    for name in manifest.dependency_names() {
        let Some(layer) = registry.get(&name) else {
            continue;
        };
        let excluded = registry.exclusions().lookup(&manifest.name, &name);

        let dependencies_added = merge_missing(
            &mut manifest.dependencies,
            &layer.dependencies,
            &manifest.name,
            excluded,
        );
        let dev_dependencies_added = merge_missing(
            &mut manifest.dev_dependencies,
            &layer.dev_dependencies,
            &manifest.name,
            excluded,
        );

        hoisted.push(HoistedLayer {
            layer: name,
            dependencies_added,
            dev_dependencies_added,
        });
    }

    if hoisted.is_empty() {
        ApplyOutcome::Untouched
    } else {
        ApplyOutcome::Hoisted(hoisted)
    }
}

/// Load the registry if needed, then rewrite `manifest`.
///
/// A load failure is returned before the manifest is touched.
pub fn apply(
    mut manifest: PackageManifest,
    ctx: &mut HoistContext,
) -> Result<(PackageManifest, ApplyOutcome), HoistError> {
    let registry = ctx.ensure_ready()?;
    let outcome = apply_layers(&mut manifest, registry);
    Ok((manifest, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstallMode;
    use crate::hoist::collector::SENTINEL;
    use crate::hoist::discovery::Discovery;
    use crate::hoist::error::codes;
    use crate::hoist::exclusion::ExclusionTable;
    use crate::hoist::flatten::flatten;
    use crate::hoist::manifest::{LayerRecord, LayerRef};
    use crate::hoist::registry::build_registry;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::tempdir;

    struct Canned(String);

    impl Discovery for Canned {
        fn discover(&mut self, _root: &Path) -> Result<String, HoistError> {
            Ok(self.0.clone())
        }
    }

    fn flattened(records: Vec<LayerRecord>) -> LayerRegistry {
        let mut records: BTreeMap<_, _> = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        let (exclusions, _) = ExclusionTable::from_records(records.values());
        flatten(&mut records, &exclusions);
        LayerRegistry::new(records, exclusions)
    }

    fn record(name: &str, deps: &[(&str, &str)]) -> LayerRecord {
        let mut r = LayerRecord::new(name);
        for (k, v) in deps {
            r.dependencies.insert((*k).to_string(), (*v).to_string());
        }
        r
    }

    fn chain() -> LayerRegistry {
        let mut mid = record("mid", &[("base", "*")]);
        mid.hoist_layer = Some(vec![LayerRef::Plain("base".into())]);
        flattened(vec![record("base", &[("lodash", "^4.0.0")]), mid])
    }

    #[test]
    fn test_consumer_inherits_layer_chain() {
        let registry = chain();
        let mut app = PackageManifest::new("app").with_dependency("mid", "*");

        let outcome = apply_layers(&mut app, &registry);

        assert_eq!(app.dependencies.get("base").map(String::as_str), Some("*"));
        assert_eq!(app.dependencies.get("lodash").map(String::as_str), Some("^4.0.0"));
        assert_eq!(
            outcome,
            ApplyOutcome::Hoisted(vec![HoistedLayer {
                layer: "mid".into(),
                dependencies_added: 2,
                dev_dependencies_added: 0,
            }])
        );
    }

    #[test]
    fn test_explicit_constraint_wins() {
        let registry = chain();
        let mut app = PackageManifest::new("app")
            .with_dependency("mid", "*")
            .with_dependency("lodash", "^3.0.0");

        apply_layers(&mut app, &registry);

        assert_eq!(app.dependencies.get("lodash").map(String::as_str), Some("^3.0.0"));
        assert_eq!(app.dependencies.get("base").map(String::as_str), Some("*"));
    }

    #[test]
    fn test_exclusion_skips_named_dependency() {
        let mut app = record("app", &[("shared", "*")]);
        app.hoist_layer = Some(vec![LayerRef::WithExclusions(
            "shared".into(),
            ["react".to_string()].into_iter().collect(),
        )]);
        let shared = record("shared", &[("react", "^18.0.0"), ("zod", "^3.0.0")]);
        let registry = flattened(vec![app, shared]);

        // "web" is not a layer; it falls back to the broad exclusion for "shared"
        let mut web = PackageManifest::new("web").with_dependency("shared", "*");
        apply_layers(&mut web, &registry);

        assert!(!web.dependencies.contains_key("react"));
        assert_eq!(web.dependencies.get("zod").map(String::as_str), Some("^3.0.0"));
    }

    /// Registry built from a walk where `app` uses `shared` minus `react`.
    fn registry_from_walk(app: &str) -> LayerRegistry {
        let shared = r#"{"name":"shared","dependencies":{"react":"^18.2.0","zod":"^3.22.0"}}"#;
        let output = format!("Scope: all 2 workspace projects\n{SENTINEL}{app}\n{SENTINEL}{shared}\n");
        let mut built = build_registry(&output).unwrap();
        flatten(&mut built.records, &built.exclusions);
        LayerRegistry::new(built.records, built.exclusions)
    }

    #[test]
    fn test_excluded_name_declared_by_consumer_keeps_its_range() {
        let app_json = r#"{"name":"app","dependencies":{"shared":"workspace:*","react":"^17.0.2"},"hoistLayer":[["shared",["react"]]]}"#;
        let registry = registry_from_walk(app_json);
        let mut app = PackageManifest::from_json(app_json).unwrap();

        let outcome = apply_layers(&mut app, &registry);

        assert!(matches!(outcome, ApplyOutcome::SelfLayer { .. }));
        assert_eq!(app.dependencies.get("react").map(String::as_str), Some("^17.0.2"));
        assert_eq!(app.dependencies.get("zod").map(String::as_str), Some("^3.22.0"));
        assert_eq!(app.dependencies.get("shared").map(String::as_str), Some("workspace:*"));
    }

    #[test]
    fn test_excluded_name_not_declared_stays_out() {
        let app_json = r#"{"name":"app","dependencies":{"shared":"workspace:*"},"hoistLayer":[["shared",["react"]]]}"#;
        let registry = registry_from_walk(app_json);
        let mut app = PackageManifest::from_json(app_json).unwrap();

        apply_layers(&mut app, &registry);

        assert!(!app.dependencies.contains_key("react"));
        assert_eq!(app.dependencies.get("zod").map(String::as_str), Some("^3.22.0"));
        assert_eq!(app.hoist_layer.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_layer_manifest_replaced_wholesale() {
        let registry = chain();
        let mut mid = PackageManifest::new("mid")
            .with_dependency("base", "workspace:*")
            .with_dev_dependency("typescript", "^5");
        mid.extra.insert("version".into(), serde_json::json!("1.0.0"));

        let outcome = apply_layers(&mut mid, &registry);

        assert_eq!(
            outcome,
            ApplyOutcome::SelfLayer {
                dependencies: 2,
                dev_dependencies: 0
            }
        );
        assert_eq!(mid.dependencies.get("base").map(String::as_str), Some("*"));
        assert!(mid.dev_dependencies.is_empty());
        assert_eq!(mid.extra["version"], "1.0.0");
    }

    #[test]
    fn test_unrelated_manifest_untouched() {
        let registry = chain();
        let original = PackageManifest::new("cli").with_dependency("clap", "^4");
        let mut manifest = original.clone();

        let outcome = apply_layers(&mut manifest, &registry);

        assert!(outcome.is_untouched());
        assert_eq!(manifest, original);
    }

    #[test]
    fn test_dev_reference_merges_dev_entries() {
        let mut tooling = LayerRecord::new("tooling");
        tooling.dev_dependencies.insert("vitest".into(), "^1".into());
        tooling.hoist_layer = Some(Vec::new());
        let registry = flattened(vec![tooling]);

        let mut app = PackageManifest::new("app").with_dev_dependency("tooling", "*");
        apply_layers(&mut app, &registry);

        assert_eq!(app.dev_dependencies.get("vitest").map(String::as_str), Some("^1"));
        assert!(app.dependencies.is_empty());
    }

    #[test]
    fn test_missing_layer_fails_before_rewrite() {
        let dir = tempdir().unwrap();
        let output = format!(
            "{SENTINEL}{}",
            r#"{"name":"app","dependencies":{"ghost":"*"},"hoistLayer":["ghost"]}"#
        );
        let mut ctx =
            HoistContext::new(dir.path(), InstallMode::Refresh, Box::new(Canned(output)));

        let manifest = PackageManifest::new("app").with_dependency("ghost", "*");
        let err = apply(manifest, &mut ctx).unwrap_err();

        assert_eq!(err.code(), codes::HOIST_LAYER_MISSING);
        assert_eq!(err.missing_names(), ["ghost"]);
    }

    #[test]
    fn test_apply_loads_registry_once() {
        let dir = tempdir().unwrap();
        let output = [
            r#"{"name":"mid","dependencies":{"base":"*"},"hoistLayer":["base"]}"#,
            r#"{"name":"base","dependencies":{"lodash":"^4.0.0"}}"#,
        ]
        .iter()
        .map(|l| format!("{SENTINEL}{l}"))
        .collect::<Vec<_>>()
        .join("\n");
        let mut ctx =
            HoistContext::new(dir.path(), InstallMode::Refresh, Box::new(Canned(output)));

        let (app, _) = apply(PackageManifest::new("app").with_dependency("mid", "*"), &mut ctx).unwrap();
        let (base, outcome) = apply(PackageManifest::new("base"), &mut ctx).unwrap();

        assert!(app.dependencies.contains_key("lodash"));
        assert!(matches!(outcome, ApplyOutcome::SelfLayer { .. }));
        assert_eq!(base.dependencies.get("lodash").map(String::as_str), Some("^4.0.0"));
        assert!(ctx.take_report().is_some());
    }
}
