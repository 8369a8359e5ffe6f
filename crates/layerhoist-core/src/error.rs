use crate::hoist::HoistError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for layerhoist operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read manifest at {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Hoist(#[from] HoistError),
}

impl Error {
    /// Convert into a `HoistError`, mapping manifest failures to `HOIST_MANIFEST_INVALID`.
    #[must_use]
    pub fn into_hoist(self) -> HoistError {
        match self {
            Self::Hoist(err) => err,
            other => HoistError::manifest_invalid(other.to_string()),
        }
    }
}
