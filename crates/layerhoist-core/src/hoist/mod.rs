//! Layer hoisting.
//!
//! Provides:
//! - The manifest and layer record model (`hoistLayer` references)
//! - The discovery collector run inside the nested resolution walk
//! - Registry building and validation from captured discovery output
//! - Fixed-point flattening of layer-to-layer references
//! - The `hoist-layer.json` lock artifact for frozen installs
//! - The apply hook that rewrites manifests during the real install pass

pub mod apply;
pub mod collector;
pub mod context;
pub mod discovery;
pub mod error;
pub mod exclusion;
pub mod flatten;
pub mod hook;
pub mod lock;
pub mod manifest;
pub mod registry;

pub use apply::{apply_layers, ApplyOutcome, HoistedLayer};
pub use collector::{Collected, Collector, DiscoveryStatus, SENTINEL};
pub use context::{HoistContext, LayerSummary, LoadReport, LoadSource, LoadState};
pub use discovery::{CommandDiscovery, Discovery, COMMAND_ENV, DEFAULT_COMMAND, FIND_ENV};
pub use error::{codes as hoist_codes, HoistError};
pub use exclusion::{DuplicateExclusion, ExclusionTable};
pub use flatten::{flatten, merge_missing, FlattenReport, MergeEvent};
pub use hook::{Hook, HookEvent, HookOutput, HookRole};
pub use lock::{lock_digest, lock_path, read_lock, write_lock, LOCK_FILE_NAME};
pub use manifest::{read_manifest, DepMap, LayerRecord, LayerRef, PackageManifest, HOIST_LAYER_KEY};
pub use registry::{build_registry, parse_discovery_output, referenced_layers, BuiltRegistry, LayerRegistry};
