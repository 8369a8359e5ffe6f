//! `layerhoist hook` command implementation.
//!
//! Bridges the host's manifest hook to the engine: one JSON manifest per stdin
//! line in, one rewritten manifest per stdout line out. In the discovery role
//! the side-channel line for a manifest is written just before it.
//!
//! With `--state`, a discovery session starts from and ends by saving the
//! walk state, so one walk may span many short hook processes.

use super::{fail_on_stderr, log_load_report};
use layerhoist_core::hoist::{ApplyOutcome, HookEvent, HookOutput};
use layerhoist_core::{Config, Hook};
use miette::{IntoDiagnostic, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

/// Run the hook session until stdin closes or a manifest fails.
pub fn run(config: &Config, state: Option<&Path>) -> Result<()> {
    let mut hook = Hook::from_config(config);
    if let Some(path) = state {
        hook = match hook.resume(path) {
            Ok(hook) => hook,
            Err(err) => fail_on_stderr(&err, config.json_logs),
        };
    }
    debug!(
        role = hook.role().as_str(),
        mode = config.mode.as_str(),
        state = ?state,
        "hook session started"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut handled = 0usize;

    for line in stdin.lock().lines() {
        let line = line.into_diagnostic()?;
        if line.trim().is_empty() {
            continue;
        }

        let output = match hook.read_package_json(&line) {
            Ok(output) => output,
            Err(err) => {
                out.flush().into_diagnostic()?;
                fail_on_stderr(&err, config.json_logs);
            }
        };

        if let Some(report) = hook.take_load_report() {
            log_load_report(&report);
        }
        log_event(&output);

        if let Some(side_channel) = &output.side_channel {
            writeln!(out, "{side_channel}").into_diagnostic()?;
        }
        let manifest = output.manifest.to_json().into_diagnostic()?;
        writeln!(out, "{manifest}").into_diagnostic()?;
        out.flush().into_diagnostic()?;

        handled += 1;
    }

    if let Some(path) = state {
        if let Err(err) = hook.suspend(path) {
            fail_on_stderr(&err, config.json_logs);
        }
    }

    debug!(manifests = handled, role = hook.role().as_str(), "hook session finished");
    Ok(())
}

fn log_event(output: &HookOutput) {
    let name = output.manifest.name.as_str();
    match &output.event {
        HookEvent::Discovered { expanded } => debug!(
            name,
            expanded = *expanded,
            emitted = output.side_channel.is_some(),
            "collected"
        ),
        HookEvent::Applied(ApplyOutcome::Untouched) => {}
        HookEvent::Applied(ApplyOutcome::SelfLayer {
            dependencies,
            dev_dependencies,
        }) => debug!(
            name,
            dependencies = *dependencies,
            dev_dependencies = *dev_dependencies,
            "replaced layer with flattened entries"
        ),
        HookEvent::Applied(ApplyOutcome::Hoisted(layers)) => {
            for layer in layers {
                debug!(
                    name,
                    layer = %layer.layer,
                    dependencies = layer.dependencies_added,
                    dev_dependencies = layer.dev_dependencies_added,
                    "hoisted layer"
                );
            }
        }
    }
}
