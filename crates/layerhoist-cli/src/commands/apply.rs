//! `layerhoist apply` command implementation.
//!
//! Runs the apply hook on one manifest file and prints the result. The file
//! itself is never modified.

use super::{fail, log_load_report};
use layerhoist_core::hoist::{apply::apply, read_manifest, ApplyOutcome};
use layerhoist_core::{Config, HoistContext};
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use tracing::info;

pub fn run(config: &Config, manifest_path: &Path) -> Result<()> {
    let path = if manifest_path.is_absolute() {
        manifest_path.to_path_buf()
    } else {
        config.cwd.join(manifest_path)
    };

    let manifest = match read_manifest(&path) {
        Ok(manifest) => manifest,
        Err(err) => fail(&err.into_hoist(), config.json_logs),
    };

    let mut ctx = HoistContext::from_config(config);
    let (manifest, outcome) = match apply(manifest, &mut ctx) {
        Ok(result) => result,
        Err(err) => fail(&err, config.json_logs),
    };
    if let Some(report) = ctx.take_report() {
        log_load_report(&report);
    }

    let (kind, hoisted) = match &outcome {
        ApplyOutcome::Untouched => ("untouched", Vec::new()),
        ApplyOutcome::SelfLayer { .. } => ("layer", Vec::new()),
        ApplyOutcome::Hoisted(layers) => (
            "hoisted",
            layers.iter().map(|l| l.layer.clone()).collect::<Vec<_>>(),
        ),
    };
    info!(name = %manifest.name, outcome = kind, layers = ?hoisted, "applied layers");

    if config.json_logs {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "outcome": kind,
                "hoisted": hoisted,
                "manifest": manifest,
            })
        );
    } else {
        println!("{}", serde_json::to_string_pretty(&manifest).into_diagnostic()?);
    }

    Ok(())
}
