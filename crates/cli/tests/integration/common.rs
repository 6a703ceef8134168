//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

pub fn layerkit_cmd() -> Command {
  cargo_bin_cmd!("layerkit")
}

/// Run `layerkit <args> --format json` on a fixture and parse stdout.
pub fn run_json(command: &str, fixture: &str, extra: &[&str]) -> serde_json::Value {
  let output = layerkit_cmd()
    .arg(command)
    .arg(fixture_path(fixture))
    .args(extra)
    .args(["--format", "json"])
    .output()
    .unwrap();

  assert!(
    output.status.success(),
    "layerkit {} failed: {}",
    command,
    String::from_utf8_lossy(&output.stderr)
  );
  serde_json::from_slice(&output.stdout).unwrap_or_else(|e| panic!("stdout is not JSON: {}", e))
}
