//! Build identity and the artifact names a hook build agrees on.
//!
//! A `.pnpmfile.cjs` written by one build and a lock written by another must
//! still line up, so `layerhoist version --json` reports the names alongside
//! the version.

use crate::hoist::lock::LOCK_FILE_NAME;
use crate::hoist::manifest::HOIST_LAYER_KEY;
use serde::Serialize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git hash baked in at build time through `LAYERHOIST_BUILD_GIT_HASH`.
#[must_use]
pub fn build_hash() -> Option<&'static str> {
    option_env!("LAYERHOIST_BUILD_GIT_HASH").filter(|h| !h.is_empty())
}

/// `layerhoist 0.1.0`, or `layerhoist 0.1.0 (abc123)` with a build hash.
#[must_use]
pub fn version_string() -> String {
    match build_hash() {
        Some(hash) => format!("layerhoist {VERSION} ({hash})"),
        None => format!("layerhoist {VERSION}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub build: Option<&'static str>,
    pub lock_file: &'static str,
    pub package_key: &'static str,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            version: VERSION,
            build: build_hash(),
            lock_file: LOCK_FILE_NAME,
            package_key: HOIST_LAYER_KEY,
        }
    }
}
