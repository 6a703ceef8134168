//! Normalization of a full plan.

use layerkit_lib::plan::{BuildPlan, Layer};

use super::common::node_plan;

#[test]
fn orphan_step_is_pruned() {
  let mut plan = node_plan();
  let report = plan.normalize();

  let names: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
  assert_eq!(names, vec!["packages:mise", "install", "build"]);
  assert_eq!(report.pruned_steps, vec!["lint"]);
}

#[test]
fn empty_deploy_input_is_removed() {
  let mut plan = node_plan();
  assert_eq!(plan.deploy.inputs().len(), 4);

  let report = plan.normalize();
  assert_eq!(report.removed_layers, 1);
  assert!(plan.deploy.inputs().iter().all(|layer| !layer.is_empty()));
}

#[test]
fn normalize_is_idempotent_on_fixture() {
  let mut once = node_plan();
  once.normalize();
  let mut twice = once.clone();
  let report = twice.normalize();

  assert_eq!(once, twice);
  assert_eq!(report.removed_layers, 0);
  assert!(report.pruned_steps.is_empty());
}

#[test]
fn normalized_plan_survives_json() {
  let mut plan = node_plan();
  plan.normalize();

  let json = serde_json::to_string(&plan).unwrap();
  let decoded = BuildPlan::from_json(&json).unwrap();
  assert_eq!(decoded, plan);
}

#[test]
fn deploy_with_only_empty_inputs_becomes_unset() {
  let mut plan = node_plan();
  plan.deploy.inputs = Some(vec![Layer::default(), Layer::default()]);
  plan.normalize();

  assert_eq!(plan.deploy.inputs, None);
  assert!(!serde_json::to_string(&plan).unwrap().contains("\"inputs\":[]"));
}
