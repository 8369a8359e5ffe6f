//! Layer hoisting error types.

use std::fmt;
use std::io;
use std::path::Path;

/// Layer hoisting error codes.
pub mod codes {
    /// Lock artifact missing under a frozen install.
    pub const HOIST_LOCK_NOT_FOUND: &str = "HOIST_LOCK_NOT_FOUND";
    /// Lock artifact unreadable, not JSON, or not an array.
    pub const HOIST_LOCK_INVALID: &str = "HOIST_LOCK_INVALID";
    /// Lock artifact could not be serialized or written.
    pub const HOIST_LOCK_WRITE_FAILED: &str = "HOIST_LOCK_WRITE_FAILED";
    /// A `hoistLayer` reference never appeared in discovery output.
    pub const HOIST_LAYER_MISSING: &str = "HOIST_LAYER_MISSING";
    /// The discovery walk could not be spawned or exited non-zero.
    pub const HOIST_DISCOVERY_FAILED: &str = "HOIST_DISCOVERY_FAILED";
    /// A manifest handed to the hook is not a valid package manifest.
    pub const HOIST_MANIFEST_INVALID: &str = "HOIST_MANIFEST_INVALID";
    /// The registry was requested while it was still loading, or after a failed load.
    pub const HOIST_LOAD_REENTRANT: &str = "HOIST_LOAD_REENTRANT";
    /// A discovery state file could not be read, parsed, or written.
    pub const HOIST_STATE_INVALID: &str = "HOIST_STATE_INVALID";
}

/// Hints printed after the list of missing layers.
pub const MISSING_LAYER_HINTS: [&str; 3] = [
    "the missing layer should be explicitly defined, one of the following,",
    "(1) one top-project \"hoistLayer\" + sub's deps in \"optionalDependencies\"",
    "(2) every sub \"hoistLayer\" + its deps in \"*Dependencies\"",
];

/// Layer hoisting error.
///
/// Every variant is fatal for the install: the caller reports it and stops
/// before any further manifest is rewritten.
#[derive(Debug, Clone)]
pub struct HoistError {
    code: &'static str,
    message: String,
    details: Vec<String>,
    missing: Vec<String>,
}

impl HoistError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Attach a detail line (hint or captured output).
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Detail lines to print after the message.
    #[must_use]
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Layer names that were referenced but never discovered.
    #[must_use]
    pub fn missing_names(&self) -> &[String] {
        &self.missing
    }

    /// Create a lock-not-found error.
    #[must_use]
    pub fn lock_not_found(path: &Path) -> Self {
        Self::new(
            codes::HOIST_LOCK_NOT_FOUND,
            format!("{} not found", path.display()),
        )
        .with_detail("use --no-frozen-lockfile to generate it")
    }

    /// Create a lock-invalid error.
    pub fn lock_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::HOIST_LOCK_INVALID, msg)
            .with_detail("use --no-frozen-lockfile to regenerate it")
    }

    /// Create a lock-write error.
    pub fn lock_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::HOIST_LOCK_WRITE_FAILED, msg)
    }

    /// Create a missing-layer error listing every unresolved name.
    #[must_use]
    pub fn missing_layers(names: Vec<String>) -> Self {
        let mut err = Self::new(
            codes::HOIST_LAYER_MISSING,
            format!("missing layer package(s): {}", names.join(", ")),
        );
        for hint in MISSING_LAYER_HINTS {
            err = err.with_detail(hint);
        }
        err.missing = names;
        err
    }

    /// Create a discovery error for a command that could not be started.
    #[must_use]
    pub fn discovery_spawn(command: &str, source: &io::Error) -> Self {
        Self::new(
            codes::HOIST_DISCOVERY_FAILED,
            format!("failed to run `{command}`: {source}"),
        )
        .with_detail(format!("to debug: {command} --ignore-pnpmfile"))
    }

    /// Create a discovery error for a command that exited unsuccessfully.
    #[must_use]
    pub fn discovery_exit(command: &str, exit_code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        let status = exit_code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
        let mut err = Self::new(
            codes::HOIST_DISCOVERY_FAILED,
            format!("`{command}` exited with {status}"),
        )
        .with_detail(format!("to debug: {command} --ignore-pnpmfile"));
        if !stdout.is_empty() {
            err = err.with_detail(format!("stdout:\n{stdout}"));
        }
        if !stderr.is_empty() {
            err = err.with_detail(format!("stderr:\n{stderr}"));
        }
        err
    }

    /// Create a manifest-invalid error.
    pub fn manifest_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::HOIST_MANIFEST_INVALID, msg)
    }

    /// Create a discovery state error.
    pub fn state_invalid(path: &Path, msg: impl fmt::Display) -> Self {
        Self::new(
            codes::HOIST_STATE_INVALID,
            format!("discovery state {}: {msg}", path.display()),
        )
        .with_detail("delete the file to restart discovery from scratch")
    }

    /// Create a re-entrant load error.
    #[must_use]
    pub fn load_reentrant() -> Self {
        Self::new(
            codes::HOIST_LOAD_REENTRANT,
            "layer registry requested while loading (or after a failed load)",
        )
    }
}

impl fmt::Display for HoistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for HoistError {}
