use crate::hoist::discovery::DEFAULT_COMMAND;
use crate::hoist::lock::lock_path;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration for the layerhoist CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace root (the directory holding the lock artifact).
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Whether layers come from the lock artifact or a fresh discovery run.
    pub mode: InstallMode,

    /// Shell command overriding the default discovery walk.
    pub discovery_command: Option<String>,
}

/// How the layer registry is obtained for an install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMode {
    /// Reuse the lock artifact; never run discovery.
    Frozen,
    /// Run discovery and regenerate the lock artifact.
    #[default]
    Refresh,
}

impl InstallMode {
    /// Resolve the mode from the two install flags.
    ///
    /// `--no-frozen-lockfile` wins over `--frozen-lockfile`; neither means refresh.
    #[must_use]
    pub fn from_flags(frozen_lockfile: bool, no_frozen_lockfile: bool) -> Self {
        if frozen_lockfile && !no_frozen_lockfile {
            Self::Frozen
        } else {
            Self::Refresh
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frozen => "frozen",
            Self::Refresh => "refresh",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            mode: InstallMode::default(),
            discovery_command: None,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set install mode.
    #[must_use]
    pub fn with_mode(mut self, mode: InstallMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the discovery command. Blank commands are ignored.
    #[must_use]
    pub fn with_discovery_command(mut self, command: Option<String>) -> Self {
        self.discovery_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    /// The shell command that runs the nested discovery walk.
    ///
    /// The default walk is silenced (`-s`) unless verbose logging is on, so its
    /// progress output does not drown the captured side channel.
    #[must_use]
    pub fn discovery_command(&self) -> String {
        match &self.discovery_command {
            Some(cmd) => cmd.clone(),
            None if self.verbosity > 0 => DEFAULT_COMMAND.to_string(),
            None => format!("{DEFAULT_COMMAND} -s"),
        }
    }

    /// Path of the lock artifact in the workspace root.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        lock_path(&self.cwd)
    }
}
