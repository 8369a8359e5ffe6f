#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use layerhoist_core::{Config, InstallMode};
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "layerhoist")]
#[command(author, version, about = "Hoisted dependency layers for pnpm workspaces", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory (the workspace root)
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Shell command that runs the discovery walk
    #[arg(long, global = true, env = "HOIST_LAYER_CMD", value_name = "COMMAND")]
    discovery_cmd: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Install-mode flags, as passed by the host install.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
struct ModeArgs {
    /// Replay hoist-layer.json; fail if it is missing
    #[arg(long)]
    frozen_lockfile: bool,

    /// Run discovery and regenerate hoist-layer.json (the default)
    #[arg(long, conflicts_with = "frozen_lockfile")]
    no_frozen_lockfile: bool,
}

impl ModeArgs {
    fn install_mode(self) -> InstallMode {
        InstallMode::from_flags(self.frozen_lockfile, self.no_frozen_lockfile)
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Write a .pnpmfile.cjs that routes pnpm's readPackage through `layerhoist hook`
    Init {
        /// Overwrite an existing .pnpmfile.cjs
        #[arg(long)]
        force: bool,

        /// layerhoist executable the generated file runs (default: found on PATH)
        #[arg(long, value_name = "PATH")]
        bin: Option<String>,
    },

    /// Run the manifest hook: one JSON manifest per stdin line, one rewritten manifest per stdout line
    Hook {
        #[command(flatten)]
        mode: ModeArgs,

        /// Discovery walk state shared by hook processes of the same walk
        #[arg(long, value_name = "PATH")]
        state: Option<PathBuf>,
    },

    /// Run discovery and rewrite hoist-layer.json
    Sync,

    /// List flattened layers
    Layers {
        #[command(flatten)]
        mode: ModeArgs,
    },

    /// Apply layers to one package.json and print the result
    Apply {
        /// Manifest to rewrite (relative to --cwd)
        manifest: PathBuf,

        #[command(flatten)]
        mode: ModeArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd.clone())
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_discovery_command(cli.discovery_cmd);

    // Commands that handle their own output, no logging
    let command = match cli.command {
        None | Some(Commands::Version) => return commands::version::run(cli.json),
        Some(Commands::Init { force, bin }) => {
            return commands::init::run(&cwd, bin.as_deref(), force, cli.json)
        }
        Some(command) => command,
    };

    logging::init(cli.verbose, cli.json);

    match command {
        Commands::Version | Commands::Init { .. } => unreachable!(), // Handled above
        Commands::Hook { mode, state } => {
            let span = tracing::info_span!("hook", cmd = "hook", cwd = %cwd.display());
            let _guard = span.enter();
            commands::hook::run(&config.with_mode(mode.install_mode()), state.as_deref())
        }
        Commands::Sync => {
            let span = tracing::info_span!("sync", cmd = "sync", cwd = %cwd.display());
            let _guard = span.enter();
            commands::sync::run(&config)
        }
        Commands::Layers { mode } => {
            let span = tracing::info_span!("layers", cmd = "layers", cwd = %cwd.display());
            let _guard = span.enter();
            commands::layers::run(&config.with_mode(mode.install_mode()))
        }
        Commands::Apply { manifest, mode } => {
            let span = tracing::info_span!("apply", cmd = "apply", cwd = %cwd.display());
            let _guard = span.enter();
            commands::apply::run(&config.with_mode(mode.install_mode()), &manifest)
        }
    }
}
