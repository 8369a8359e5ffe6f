//! Integration tests for `layerhoist init`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn layerhoist(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_layerhoist"));
    cmd.arg("--cwd").arg(root).env_remove("RUST_LOG");
    cmd
}

fn init(root: &Path, extra: &[&str]) -> Output {
    layerhoist(root)
        .args(["--json", "init"])
        .args(extra)
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document")
}

#[test]
fn test_init_writes_pnpmfile() {
    let dir = tempfile::tempdir().unwrap();
    let bin = env!("CARGO_BIN_EXE_layerhoist");

    let output = init(dir.path(), &["--bin", bin]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["written"], true);
    assert_eq!(json["replaced"], false);

    let content = fs::read_to_string(dir.path().join(".pnpmfile.cjs")).unwrap();
    assert!(content.contains(&serde_json::to_string(bin).unwrap()));
    assert!(content.contains(":::HoistLayerJson:::"));
    assert!(content.contains("HOIST_LAYER_FIND"));
    assert!(content.contains("'--frozen-lockfile'"));
    assert!(content.contains("['hook', '--frozen-lockfile']"));
    assert!(content.contains("layerhoist(['sync'], '')"));
    assert!(content.contains("module.exports"));
}

#[test]
fn test_init_keeps_existing_pnpmfile_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".pnpmfile.cjs");
    fs::write(&path, "module.exports = {};\n").unwrap();

    let output = init(dir.path(), &[]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["written"], false);
    assert_eq!(fs::read_to_string(&path).unwrap(), "module.exports = {};\n");

    let output = init(dir.path(), &["--force"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["written"], true);
    assert_eq!(json["replaced"], true);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(r#"process.env.LAYERHOIST_BIN || "layerhoist""#));
}
