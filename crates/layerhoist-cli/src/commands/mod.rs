pub mod apply;
pub mod hook;
pub mod init;
pub mod layers;
pub mod sync;
pub mod version;

use layerhoist_core::hoist::LoadReport;
use layerhoist_core::HoistError;
use layerhoist_util::hash::short;
use std::io::Write;
use tracing::{debug, info, trace, warn};

/// Machine-readable error payload, shared by every command.
pub fn error_json(err: &HoistError) -> serde_json::Value {
    serde_json::json!({
        "ok": false,
        "error": {
            "code": err.code(),
            "message": err.message(),
            "details": err.details(),
            "missing": err.missing_names(),
        }
    })
}

fn write_error(out: &mut dyn Write, err: &HoistError, json: bool) {
    // Best effort: the process is about to exit anyway.
    if json {
        let _ = writeln!(out, "{}", error_json(err));
    } else {
        let _ = writeln!(out, "error: {err}");
        for detail in err.details() {
            let _ = writeln!(out, "  {detail}");
        }
    }
    let _ = out.flush();
}

/// Report a fatal error and exit 1. JSON goes to stdout, text to stderr.
pub fn fail(err: &HoistError, json: bool) -> ! {
    if json {
        write_error(&mut std::io::stdout(), err, true);
    } else {
        write_error(&mut std::io::stderr(), err, false);
    }
    std::process::exit(1);
}

/// Report a fatal error on stderr and exit 1, keeping stdout clean.
pub fn fail_on_stderr(err: &HoistError, json: bool) -> ! {
    write_error(&mut std::io::stderr(), err, json);
    std::process::exit(1);
}

/// Log what a registry load did.
pub fn log_load_report(report: &LoadReport) {
    info!(
        source = report.source.as_str(),
        layers = report.layers.len(),
        referenced = report.referenced.len(),
        pruned = report.pruned.len(),
        merges = report.flatten.merges.len(),
        flatten_rounds = report.flatten.rounds,
        elapsed_ms = report.elapsed.as_millis() as u64,
        digest = short(&report.digest),
        "layer registry ready"
    );

    if report.ignored_lines > 0 {
        warn!(
            count = report.ignored_lines,
            "ignored side-channel lines that did not parse"
        );
    }

    for dup in &report.duplicates {
        warn!(
            layer = %dup.layer,
            consumer = %dup.consumer,
            kept = ?dup.kept,
            ignored = ?dup.ignored,
            "conflicting exclusion list for layer; the first definition applies to other consumers"
        );
    }

    for merge in &report.flatten.merges {
        debug!(
            layer = %merge.target,
            from = %merge.source,
            dependencies = merge.dependencies,
            dev_dependencies = merge.dev_dependencies,
            "merged layer"
        );
    }

    for layer in &report.layers {
        trace!(
            name = %layer.name,
            dependencies = layer.dependencies,
            dev_dependencies = layer.dev_dependencies,
            "layer"
        );
    }
}
