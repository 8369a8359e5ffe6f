//! `layerhoist layers` command implementation.
//!
//! Loads the registry (from the lock with `--frozen-lockfile`) and lists each
//! flattened layer.

use super::{fail, log_load_report};
use layerhoist_core::{Config, HoistContext};
use layerhoist_util::hash::short;
use miette::Result;

pub fn run(config: &Config) -> Result<()> {
    let mut ctx = HoistContext::from_config(config);
    if let Err(err) = ctx.ensure_ready() {
        fail(&err, config.json_logs);
    }

    let report = ctx.take_report();
    if let Some(report) = &report {
        log_load_report(report);
    }
    let digest = report.as_ref().map(|r| r.digest.clone()).unwrap_or_default();
    let source = report.as_ref().map_or("unknown", |r| r.source.as_str());

    let Some(registry) = ctx.registry() else {
        return Ok(());
    };

    if config.json_logs {
        let layers: Vec<_> = registry
            .records()
            .map(|r| {
                serde_json::json!({
                    "name": r.name,
                    "dependencies": r.dependencies.len(),
                    "devDependencies": r.dev_dependencies.len(),
                    "hoistLayer": r.layer_refs().iter().map(|l| l.name()).collect::<Vec<_>>(),
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "source": source,
                "lock": config.lock_path().to_string_lossy(),
                "digest": digest,
                "layers": layers,
            })
        );
    } else {
        println!("Layers ({}), from {source}:", registry.len());
        for record in registry.records() {
            println!(
                "  {} ({} dependencies, {} devDependencies)",
                record.name,
                record.dependencies.len(),
                record.dev_dependencies.len()
            );
        }
        if !digest.is_empty() {
            println!("digest: {}", short(&digest));
        }
    }

    Ok(())
}
