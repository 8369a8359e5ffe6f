//! `layerhoist init` command implementation.
//!
//! Writes the `.pnpmfile.cjs` that connects pnpm to the hook. Leaves an
//! existing file alone unless `--force` is given.

use miette::{IntoDiagnostic, Result};
use std::path::Path;

/// File pnpm loads hooks from, in the workspace root.
pub const PNPMFILE_NAME: &str = ".pnpmfile.cjs";

const TEMPLATE: &str = include_str!("pnpmfile.cjs");
const BIN_PLACEHOLDER: &str = "__LAYERHOIST_BIN__";

/// Render the template to run `bin` (a name on `PATH` or a path).
pub fn render(bin: &str) -> Result<String> {
    let literal = serde_json::to_string(bin).into_diagnostic()?;
    Ok(TEMPLATE.replace(BIN_PLACEHOLDER, &literal))
}

/// Run the init command.
pub fn run(cwd: &Path, bin: Option<&str>, force: bool, json: bool) -> Result<()> {
    let path = cwd.join(PNPMFILE_NAME);
    let existed = path.exists();

    let written = if existed && !force {
        false
    } else {
        let content = render(bin.unwrap_or("layerhoist"))?;
        layerhoist_util::fs::atomic_write(&path, content.as_bytes())
            .map_err(|e| miette::miette!("Failed to write {}: {}", path.display(), e))?;
        true
    };

    if json {
        let output = serde_json::json!({
            "ok": true,
            "path": path.display().to_string(),
            "written": written,
            "replaced": written && existed,
        });
        println!("{output}");
    } else if written {
        println!("Wrote {}", path.display());
        println!("Run `pnpm install` to discover layers and write hoist-layer.json.");
    } else {
        println!(
            "Skipped {} (already exists, use --force to overwrite)",
            path.display()
        );
    }

    Ok(())
}
