//! Manifest-rewrite hook.
//!
//! One hook serves a whole install session. Inside the nested discovery walk
//! ([`FIND_ENV`] set) it only collects; otherwise it only applies layers.

use super::apply::{apply, ApplyOutcome};
use super::collector::Collector;
use super::context::{HoistContext, LoadReport};
use super::discovery::FIND_ENV;
use super::error::HoistError;
use super::manifest::PackageManifest;
use crate::config::Config;
use std::path::Path;

/// Which half of the engine a hook process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookRole {
    Discover,
    Apply,
}

impl HookRole {
    /// `Discover` when [`FIND_ENV`] is set (to any value), else `Apply`.
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var_os(FIND_ENV).is_some() {
            Self::Discover
        } else {
            Self::Apply
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Apply => "apply",
        }
    }
}

/// What happened to one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Discovered { expanded: bool },
    Applied(ApplyOutcome),
}

/// Result of one hook invocation.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// Manifest to hand back to the package manager.
    pub manifest: PackageManifest,
    /// Side-channel line to print (discovery only, first visit of a name).
    pub side_channel: Option<String>,
    pub event: HookEvent,
}

/// A hook session.
#[derive(Debug)]
pub enum Hook {
    Discover(Collector),
    Apply(HoistContext),
}

impl Hook {
    /// Build the hook for `role`. The context is only used when applying.
    #[must_use]
    pub fn new(role: HookRole, ctx: HoistContext) -> Self {
        match role {
            HookRole::Discover => Self::Discover(Collector::new()),
            HookRole::Apply => Self::Apply(ctx),
        }
    }

    /// Build the hook for the role selected by the environment.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(HookRole::from_env(), HoistContext::from_config(config))
    }

    #[must_use]
    pub fn role(&self) -> HookRole {
        match self {
            Self::Discover(_) => HookRole::Discover,
            Self::Apply(_) => HookRole::Apply,
        }
    }

    /// Process one manifest.
    ///
    /// Any error is fatal for the session; the caller must stop handing out
    /// manifests.
    pub fn read_package(&mut self, manifest: PackageManifest) -> Result<HookOutput, HoistError> {
        match self {
            Self::Discover(collector) => {
                let collected = collector.visit(manifest)?;
                Ok(HookOutput {
                    manifest: collected.manifest,
                    side_channel: collected.line,
                    event: HookEvent::Discovered {
                        expanded: collected.expanded,
                    },
                })
            }
            Self::Apply(ctx) => {
                let (manifest, outcome) = apply(manifest, ctx)?;
                Ok(HookOutput {
                    manifest,
                    side_channel: None,
                    event: HookEvent::Applied(outcome),
                })
            }
        }
    }

    /// Parse one JSON manifest and process it.
    pub fn read_package_json(&mut self, json: &str) -> Result<HookOutput, HoistError> {
        let manifest = PackageManifest::from_json(json)
            .map_err(|e| HoistError::manifest_invalid(format!("Invalid manifest JSON: {e}")))?;
        self.read_package(manifest)
    }

    /// Continue a discovery walk saved by an earlier session. The apply role
    /// keeps no per-walk state and is returned unchanged.
    pub fn resume(self, state: &Path) -> Result<Self, HoistError> {
        match self {
            Self::Discover(_) => Ok(Self::Discover(Collector::load_state(state)?)),
            apply @ Self::Apply(_) => Ok(apply),
        }
    }

    /// Save the discovery walk for the next session (discovery role only).
    pub fn suspend(&self, state: &Path) -> Result<(), HoistError> {
        match self {
            Self::Discover(collector) => collector.save_state(state),
            Self::Apply(_) => Ok(()),
        }
    }

    /// Report of the registry load, once it has happened (apply role only).
    pub fn take_load_report(&mut self) -> Option<LoadReport> {
        match self {
            Self::Discover(_) => None,
            Self::Apply(ctx) => ctx.take_report(),
        }
    }
}
