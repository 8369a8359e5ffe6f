//! `layerhoist sync` command implementation.
//!
//! Runs discovery and flattening and rewrites `hoist-layer.json` without
//! applying anything.

use super::{fail, log_load_report};
use layerhoist_core::{Config, HoistContext, InstallMode};
use layerhoist_util::hash::short;
use miette::Result;
use tracing::info;

pub fn run(config: &Config) -> Result<()> {
    let config = config.clone().with_mode(InstallMode::Refresh);
    info!(command = %config.discovery_command(), "running discovery");

    let mut ctx = HoistContext::from_config(&config);
    if let Err(err) = ctx.ensure_ready() {
        fail(&err, config.json_logs);
    }

    let Some(report) = ctx.take_report() else {
        return Ok(());
    };
    log_load_report(&report);

    if config.json_logs {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "lock": report.lock_path.to_string_lossy(),
                "digest": report.digest,
                "layers": report.layers.len(),
                "referenced": report.referenced,
                "pruned": report.pruned,
                "ignored_lines": report.ignored_lines,
                "elapsed_ms": report.elapsed.as_millis() as u64,
            })
        );
    } else {
        println!(
            "Wrote {} ({} layers, digest {})",
            report.lock_path.display(),
            report.layers.len(),
            short(&report.digest)
        );
    }

    Ok(())
}
