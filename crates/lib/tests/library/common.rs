//! Shared fixtures for library integration tests.

use layerkit_lib::lower::{LowerOptions, LoweredPlan, OpGraph, State, lower_plan};
use layerkit_lib::plan::BuildPlan;
use layerkit_lib::platform::BuildPlatform;

pub const NODE_PLAN: &str = include_str!("../fixtures/node_plan.json");

pub fn node_plan() -> BuildPlan {
  BuildPlan::from_json(NODE_PLAN).expect("fixture plan should decode")
}

pub fn options() -> LowerOptions {
  LowerOptions::default().with_platform(BuildPlatform::linux_amd64())
}

/// Normalize the node plan and lower it onto a fresh graph.
pub fn lower_node_plan() -> (OpGraph, LoweredPlan<State>) {
  let mut plan = node_plan();
  plan.normalize();
  let mut graph = OpGraph::new();
  let lowered = lower_plan(&plan, &mut graph, &options()).expect("fixture plan should lower");
  (graph, lowered)
}
