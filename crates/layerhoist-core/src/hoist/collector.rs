//! Discovery collector.
//!
//! Runs as the manifest hook inside the nested resolution walk. Every manifest
//! seen for the first time is emitted on the side channel as a single line:
//!
//! ```text
//! :::HoistLayerJson:::{"name":"base","dependencies":{...},"devDependencies":{...}}
//! ```
//!
//! and the walk is truncated below packages that cannot contribute layers, so
//! the total work is bounded by the layer closures rather than the whole graph.
//!
//! When the host spawns one hook process per manifest, the collector is
//! carried between them in a state file ([`Collector::load_state`],
//! [`Collector::save_state`]).

use super::error::HoistError;
use super::manifest::{LayerRecord, PackageManifest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Prefix marking a side-channel line in the walker's output.
pub const SENTINEL: &str = ":::HoistLayerJson:::";

/// Per-name discovery state. Absence from the map means unseen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    /// Referenced by an expanded package or a `hoistLayer` list; emit on next visit.
    Wanted,
    /// Already emitted.
    Resolved,
}

/// Result of one collector visit.
#[derive(Debug, Clone)]
pub struct Collected {
    /// The manifest to hand back to the walker (full, or a stub).
    pub manifest: PackageManifest,
    /// Side-channel line to print, on the first emission of this name only.
    pub line: Option<String>,
    /// Whether the walker is allowed to expand this package's dependencies.
    pub expanded: bool,
}

/// Name -> status map shared by every visit of one discovery walk.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collector {
    status: HashMap<String, DiscoveryStatus>,
}

impl Collector {
    /// Create a collector with every name unseen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of `name` (`None` = unseen).
    #[must_use]
    pub fn status(&self, name: &str) -> Option<DiscoveryStatus> {
        self.status.get(name).copied()
    }

    /// Number of names emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.status
            .values()
            .filter(|s| **s == DiscoveryStatus::Resolved)
            .count()
    }

    /// Visit one manifest presented by the walker.
    ///
    /// - unseen: emit, mark resolved, mark its direct dependencies wanted, expand
    /// - wanted: emit, mark resolved, expand only if it declares `hoistLayer`
    /// - resolved: expand only if it declares `hoistLayer`
    ///
    /// Names listed in `hoistLayer` are marked wanted unless already resolved,
    /// so each name is emitted exactly once.
    pub fn visit(&mut self, manifest: PackageManifest) -> Result<Collected, HoistError> {
        let mut expanded = manifest.declares_hoist_layer();
        let mut line = None;

        match self.status(&manifest.name) {
            None => {
                line = Some(encode_line(&LayerRecord::from_manifest(&manifest))?);
                self.status
                    .insert(manifest.name.clone(), DiscoveryStatus::Resolved);
                for dep in manifest
                    .dependencies
                    .keys()
                    .chain(manifest.dev_dependencies.keys())
                {
                    self.want(dep);
                }
                expanded = true;
            }
            Some(DiscoveryStatus::Wanted) => {
                line = Some(encode_line(&LayerRecord::from_manifest(&manifest))?);
                self.status
                    .insert(manifest.name.clone(), DiscoveryStatus::Resolved);
            }
            Some(DiscoveryStatus::Resolved) => {}
        }

        if let Some(layers) = &manifest.hoist_layer {
            for layer in layers {
                self.want(layer.name());
            }
        }

        let manifest = if expanded { manifest } else { manifest.stub() };
        Ok(Collected {
            manifest,
            line,
            expanded,
        })
    }

    /// Resume a walk from `path`. A missing file starts a fresh walk.
    pub fn load_state(path: &Path) -> Result<Self, HoistError> {
        match layerhoist_util::fs::read_to_string_lossy(path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| HoistError::state_invalid(path, e))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(HoistError::state_invalid(path, e)),
        }
    }

    /// Write the walk state to `path` atomically.
    pub fn save_state(&self, path: &Path) -> Result<(), HoistError> {
        let json = serde_json::to_vec(self).map_err(|e| HoistError::state_invalid(path, e))?;
        layerhoist_util::fs::atomic_write(path, &json).map_err(|e| HoistError::state_invalid(path, e))
    }

    fn want(&mut self, name: &str) {
        self.status
            .entry(name.to_string())
            .or_insert(DiscoveryStatus::Wanted);
    }
}

/// Encode a record as one side-channel line.
pub fn encode_line(record: &LayerRecord) -> Result<String, HoistError> {
    let json = serde_json::to_string(record)
        .map_err(|e| HoistError::manifest_invalid(format!("cannot encode {}: {e}", record.name)))?;
    Ok(format!("{SENTINEL}{json}"))
}
