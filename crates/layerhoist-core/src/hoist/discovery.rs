//! Discovery capability: runs the nested resolution walk.

use super::error::HoistError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Environment variable marking the nested discovery process.
///
/// When set (to any value) the hook acts as the discovery collector only.
pub const FIND_ENV: &str = "HOIST_LAYER_FIND";

/// Environment variable overriding the discovery command.
pub const COMMAND_ENV: &str = "HOIST_LAYER_CMD";

/// Default discovery walk: a resolution-only recursive install.
pub const DEFAULT_COMMAND: &str = "pnpm -r i --resolution-only";

/// Something that can run the discovery walk for a workspace.
pub trait Discovery {
    /// Run the walk rooted at `root` and return its captured output.
    ///
    /// Blocks until the walk finishes; output is consumed only after exit.
    fn discover(&mut self, root: &Path) -> Result<String, HoistError>;
}

/// Runs the walk as a shell command with [`FIND_ENV`] set.
#[derive(Debug, Clone)]
pub struct CommandDiscovery {
    command: String,
}

impl CommandDiscovery {
    /// Create a discovery for the given shell command.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The shell command that will be run.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Discovery for CommandDiscovery {
    fn discover(&mut self, root: &Path) -> Result<String, HoistError> {
        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd.exe", "/C")
        } else {
            ("sh", "-c")
        };

        let output = Command::new(shell)
            .arg(shell_arg)
            .arg(&self.command)
            .current_dir(root)
            .env(FIND_ENV, "true")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HoistError::discovery_spawn(&self.command, &e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HoistError::discovery_exit(
                &self.command,
                output.status.code(),
                &stdout,
                &stderr,
            ));
        }

        Ok(stdout)
    }
}
