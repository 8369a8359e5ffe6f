#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Hoisted dependency layers for monorepo installs.
//!
//! A layer is a package whose dependency set is copied into every package that
//! depends on it. This crate discovers layers, flattens layer-to-layer
//! references to a fixed point, caches the result in a lock artifact, and
//! rewrites manifests as the host package manager reads them.

pub mod config;
pub mod error;
pub mod hoist;
pub mod version;

pub use config::{Config, InstallMode};
pub use error::Error;
pub use hoist::{
    HoistContext, HoistError, Hook, HookRole, LayerRecord, LayerRef, LayerRegistry,
    PackageManifest,
};
pub use version::VERSION;
