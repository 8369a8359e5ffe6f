//! Package manifest and layer record model.
//!
//! A manifest's `hoistLayer` field lists the layers it belongs to or consumes.
//! Each entry is either a bare layer name or a `[name, [excluded...]]` pair:
//!
//! ```json
//! {
//!   "name": "app",
//!   "dependencies": { "shared": "workspace:*" },
//!   "hoistLayer": ["base", ["shared", ["react"]]]
//! }
//! ```

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Manifest key holding layer references.
pub const HOIST_LAYER_KEY: &str = "hoistLayer";

/// Dependency name -> version range. `BTreeMap` keeps serialized output sorted.
pub type DepMap = BTreeMap<String, String>;

/// A reference to a layer from a manifest's `hoistLayer` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLayerRef", into = "RawLayerRef")]
pub enum LayerRef {
    /// `"name"`
    Plain(String),
    /// `["name", ["dep", ...]]`: hoist `name` but skip the listed dependencies.
    WithExclusions(String, BTreeSet<String>),
}

/// JSON shape of a layer reference.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLayerRef {
    Plain(String),
    Pair(String, Vec<String>),
}

impl From<RawLayerRef> for LayerRef {
    fn from(raw: RawLayerRef) -> Self {
        match raw {
            RawLayerRef::Plain(name) => Self::Plain(name),
            RawLayerRef::Pair(name, excluded) => {
                Self::WithExclusions(name, excluded.into_iter().collect())
            }
        }
    }
}

impl From<LayerRef> for RawLayerRef {
    fn from(layer: LayerRef) -> Self {
        match layer {
            LayerRef::Plain(name) => Self::Plain(name),
            LayerRef::WithExclusions(name, excluded) => {
                Self::Pair(name, excluded.into_iter().collect())
            }
        }
    }
}

impl LayerRef {
    /// The referenced layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Plain(name) | Self::WithExclusions(name, _) => name,
        }
    }

    /// Dependencies excluded from this hoist, if the pair form was used.
    #[must_use]
    pub fn exclusions(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Plain(_) => None,
            Self::WithExclusions(_, excluded) => Some(excluded),
        }
    }
}

/// A package manifest as the host package manager presents it to the hook.
///
/// Only the fields the engine reads are typed; everything else (`version`,
/// `type`, `scripts`, ...) is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dependencies: DepMap,
    #[serde(default)]
    pub dev_dependencies: DepMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoist_layer: Option<Vec<LayerRef>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    /// Create an empty manifest with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    /// Add a dev dependency.
    #[must_use]
    pub fn with_dev_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dev_dependencies.insert(name.into(), range.into());
        self
    }

    /// Set the `hoistLayer` list.
    #[must_use]
    pub fn with_hoist_layer(mut self, layers: Vec<LayerRef>) -> Self {
        self.hoist_layer = Some(layers);
        self
    }

    /// Whether the manifest declares a `hoistLayer` list (even an empty one).
    #[must_use]
    pub fn declares_hoist_layer(&self) -> bool {
        self.hoist_layer.is_some()
    }

    /// Names of all direct dependencies, `dependencies` first, without duplicates.
    #[must_use]
    pub fn dependency_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }

    /// The minimal stand-in returned to the walker to stop it from expanding
    /// this package: `name`, `type` and `version`, with empty dependency maps.
    #[must_use]
    pub fn stub(&self) -> Self {
        let extra = ["type", "version"]
            .into_iter()
            .filter_map(|key| self.extra.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();
        Self {
            name: self.name.clone(),
            extra,
            ..Default::default()
        }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to a single-line JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Read a manifest (`package.json`) from disk.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    PackageManifest::from_json(&content).map_err(|source| Error::ManifestParse {
        path: path.to_path_buf(),
        source,
    })
}

/// A layer as captured by discovery and stored in the lock artifact.
///
/// After flattening, `dependencies`/`devDependencies` hold the layer's own
/// entries plus everything inherited from the layers it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub name: String,
    #[serde(default)]
    pub dependencies: DepMap,
    #[serde(default)]
    pub dev_dependencies: DepMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hoist_layer: Option<Vec<LayerRef>>,
}

impl LayerRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: DepMap::new(),
            dev_dependencies: DepMap::new(),
            hoist_layer: None,
        }
    }

    /// Snapshot the fields discovery records from a manifest.
    #[must_use]
    pub fn from_manifest(manifest: &PackageManifest) -> Self {
        Self {
            name: manifest.name.clone(),
            dependencies: manifest.dependencies.clone(),
            dev_dependencies: manifest.dev_dependencies.clone(),
            hoist_layer: manifest.hoist_layer.clone(),
        }
    }

    /// Whether `name` is a key in either dependency map.
    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    /// Whether the record declares a `hoistLayer` list.
    #[must_use]
    pub fn declares_hoist_layer(&self) -> bool {
        self.hoist_layer.is_some()
    }

    /// Layer references, empty when none are declared.
    #[must_use]
    pub fn layer_refs(&self) -> &[LayerRef] {
        self.hoist_layer.as_deref().unwrap_or_default()
    }
}
