use predicates::prelude::*;

use super::common::{fixture_path, layerkit_cmd, run_json};

#[test]
fn lower_emits_graph_and_plan() {
  let output = run_json("lower", "node_plan.json", &["--platform", "linux/arm64"]);

  assert_eq!(output["platform"], "linux/arm64/v8");
  assert_eq!(output["plan"]["deploy"]["composition"], "merge");
  assert_eq!(output["plan"]["steps"].as_array().map(Vec::len), Some(3));
  assert!(output["hash"].as_str().is_some_and(|h| !h.is_empty()));

  let ops = output["graph"]["ops"].as_array().unwrap();
  assert!(ops.iter().any(|op| op["op"] == "merge"));
  assert!(
    ops
      .iter()
      .filter(|op| op["op"] == "image")
      .all(|op| op["platform"] == "linux/arm64/v8")
  );
}

#[test]
fn lower_is_deterministic() {
  let first = run_json("lower", "node_plan.json", &["--platform", "linux/amd64"]);
  let second = run_json("lower", "node_plan.json", &["--platform", "linux/amd64"]);
  assert_eq!(first["hash"], second["hash"]);
}

#[test]
fn raw_lowering_keeps_orphans() {
  let output = run_json("lower", "node_plan.json", &["--raw"]);
  assert_eq!(output["plan"]["steps"].as_array().map(Vec::len), Some(4));
}

#[test]
fn lower_text_shows_compositions() {
  layerkit_cmd()
    .arg("lower")
    .arg(fixture_path("node_plan.json"))
    .assert()
    .success()
    .stdout(
      predicate::str::contains("install")
        .and(predicate::str::contains("(copy)"))
        .and(predicate::str::contains("deploy"))
        .and(predicate::str::contains("(merge)")),
    );
}

#[test]
fn cyclic_plan_lowers_in_plan_order() {
  let output = run_json("lower", "cyclic_plan.json", &[]);

  let names: Vec<&str> = output["plan"]["steps"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|step| step["name"].as_str())
    .collect();
  assert_eq!(names, vec!["step1", "step2", "step3", "step4"]);
}

#[test]
fn cyclic_plan_warns_about_cycle() {
  layerkit_cmd()
    .arg("--verbose")
    .arg("lower")
    .arg(fixture_path("cyclic_plan.json"))
    .assert()
    .success()
    .stderr(predicate::str::contains("steps reference each other in a cycle"));
}

#[test]
fn filtered_base_fails() {
  layerkit_cmd()
    .arg("lower")
    .arg(fixture_path("filtered_base_plan.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("first input of step build"));
}
