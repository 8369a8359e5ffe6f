use layerhoist_core::version::{version_string, VersionInfo};
use miette::{IntoDiagnostic, Result};

pub fn run(json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(VersionInfo::current()).into_diagnostic()?;
        value["ok"] = serde_json::Value::Bool(true);
        println!("{value}");
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
