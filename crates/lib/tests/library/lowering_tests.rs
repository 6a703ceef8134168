//! End-to-end lowering of a full plan.

use layerkit_lib::consts::{BUILDER_IMAGE, DEFAULT_PATH, RUNTIME_IMAGE};
use layerkit_lib::lower::{
  CacheMount, Composition, CopyOptions, Engine, ExecSpec, FileSpec, LowerError, Op, lower_plan,
};
use layerkit_lib::plan::{BuildPlan, CacheType, Layer, Step};
use layerkit_lib::platform::BuildPlatform;
use layerkit_lib::util::hash::Hashable;

use super::common::{lower_node_plan, node_plan, options};

// =============================================================================
// OpGraph
// =============================================================================

#[test]
fn steps_follow_dependency_order() {
  let (_, lowered) = lower_node_plan();
  let names: Vec<&str> = lowered.steps.iter().map(|s| s.name.as_str()).collect();
  assert_eq!(names, vec!["packages:mise", "install", "build"]);
}

#[test]
fn local_inputs_use_copy() {
  let (_, lowered) = lower_node_plan();
  assert_eq!(lowered.step("packages:mise").unwrap().composition, Composition::Direct);
  assert_eq!(lowered.step("install").unwrap().composition, Composition::Copy);
  assert_eq!(lowered.step("build").unwrap().composition, Composition::Copy);
}

#[test]
fn install_runs_with_cache_and_all_secrets() {
  let (graph, lowered) = lower_node_plan();
  let install = lowered.step("install").unwrap();

  let Some(Op::Exec { base, spec }) = graph.op_for(install.state) else {
    panic!("install should end with an exec");
  };
  assert_eq!(spec.args, vec!["sh", "-c", "npm ci"]);
  assert_eq!(spec.env["NODE_ENV"], "production");
  assert_eq!(spec.env["PATH"], format!("/app/node_modules/.bin:{}", DEFAULT_PATH));
  assert_eq!(spec.secrets, vec!["NPM_TOKEN", "SENTRY_AUTH_TOKEN"]);
  assert_eq!(spec.mounts, vec![CacheMount {
    id: "npm".to_string(),
    target: "/root/.npm".to_string(),
    sharing: CacheType::Locked,
  }]);

  // package-lock.json is copied last, onto package.json
  let Some(Op::Copy {
    dest, src_path, dest_path, ..
  }) = graph.op_for(*base)
  else {
    panic!("install exec should run on copied sources");
  };
  assert_eq!(src_path, "package-lock.json");
  assert_eq!(dest_path, "/app/package-lock.json");
  assert!(matches!(graph.op_for(*dest), Some(Op::Copy { dest_path, .. }) if dest_path == "/app/package.json"));
}

#[test]
fn mise_step_writes_config_before_install() {
  let (graph, lowered) = lower_node_plan();
  let mise = lowered.step("packages:mise").unwrap();

  let Some(Op::Exec { base, spec }) = graph.op_for(mise.state) else {
    panic!("mise step should end with an exec");
  };
  assert_eq!(spec.label, "install mise packages: node");
  assert_eq!(spec.env["MISE_DATA_DIR"], "/mise");
  assert!(spec.env["PATH"].starts_with("/mise/shims:"));

  match graph.op_for(*base) {
    Some(Op::MkFile { base, spec }) => {
      assert_eq!(spec.path, "/etc/mise/config.toml");
      assert_eq!(spec.mode, 0o644);
      assert!(spec.contents.contains("node = \"22\""));
      assert!(matches!(graph.op_for(*base), Some(Op::Image { reference, .. }) if reference == BUILDER_IMAGE));
    }
    other => panic!("Expected MkFile op, got {:?}", other),
  }
}

#[test]
fn deploy_merges_disjoint_step_outputs() {
  let (graph, lowered) = lower_node_plan();
  assert_eq!(lowered.deploy.composition, Composition::Merge);

  let Some(Op::Merge { inputs, label }) = graph.op_for(lowered.deploy.state) else {
    panic!("deploy should be a merge");
  };
  assert_eq!(
    label,
    &format!("[layerkit] merge {}, $packages:mise, $install, $build", RUNTIME_IMAGE)
  );
  assert_eq!(inputs.len(), 4);
  assert!(matches!(graph.op_for(inputs[0]), Some(Op::Image { reference, .. }) if reference == RUNTIME_IMAGE));

  let Some(Op::Copy {
    dest,
    src,
    src_path,
    options,
    ..
  }) = graph.op_for(inputs[3])
  else {
    panic!("build output should be copied onto scratch");
  };
  assert!(dest.is_scratch());
  assert_eq!(*src, lowered.step("build").unwrap().state);
  assert_eq!(src_path, "/app");
  assert_eq!(options.exclude_patterns, vec!["node_modules", ".git"]);
}

#[test]
fn deploy_env_and_start_command() {
  let (_, lowered) = lower_node_plan();
  assert_eq!(lowered.deploy.start_command, "npm start");
  assert_eq!(lowered.deploy.env["NODE_ENV"], "production");
  assert_eq!(
    lowered.deploy.env["PATH"],
    format!("/app/node_modules/.bin:/mise/shims:{}", DEFAULT_PATH)
  );
}

#[test]
fn graph_hash_is_stable() {
  let (first, _) = lower_node_plan();
  let (second, _) = lower_node_plan();
  assert_eq!(first.compute_hash().unwrap(), second.compute_hash().unwrap());
}

#[test]
fn lowered_plan_serializes() {
  let (graph, lowered) = lower_node_plan();
  let json = serde_json::to_value(&lowered).unwrap();
  assert_eq!(json["deploy"]["composition"], "merge");
  assert_eq!(json["deploy"]["startCommand"], "npm start");

  let graph_json = serde_json::to_value(&graph).unwrap();
  assert!(graph_json["ops"].as_array().is_some_and(|ops| ops.len() == graph.len()));
}

#[test]
fn unnormalized_plan_still_lowers_orphans() {
  let plan = node_plan();
  let mut graph = layerkit_lib::lower::OpGraph::new();
  let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();
  assert!(lowered.step("lint").is_some());
}

// =============================================================================
// Custom engines
// =============================================================================

/// Engine whose states are readable descriptions of how they were built.
#[derive(Default)]
struct DescribeEngine;

impl Engine for DescribeEngine {
  type State = String;

  fn scratch(&mut self) -> String {
    "scratch".to_string()
  }

  fn image(&mut self, reference: &str, platform: &BuildPlatform) -> String {
    format!("image({}@{})", reference, platform)
  }

  fn local(&mut self) -> String {
    "local".to_string()
  }

  fn merge(&mut self, states: Vec<String>, _label: &str) -> String {
    format!("merge({})", states.join(" | "))
  }

  fn copy(&mut self, dest: &String, src: &String, src_path: &str, dest_path: &str, _options: &CopyOptions) -> String {
    format!("copy({} <- {}:{} -> {})", dest, src, src_path, dest_path)
  }

  fn exec(&mut self, base: &String, spec: &ExecSpec) -> String {
    format!("exec({}: {})", base, spec.label)
  }

  fn write_file(&mut self, base: &String, spec: &FileSpec) -> String {
    format!("file({}: {})", base, spec.path)
  }
}

#[test]
fn any_engine_can_be_lowered_onto() {
  let mut plan = BuildPlan::new();
  let mut step = Step::new("build").with_inputs(vec![Layer::image("alpine")]);
  step.add_command(layerkit_lib::plan::Command::exec_named("make", "make"));
  plan.add_step(step);
  plan.deploy.base = Layer::step("build");

  let lowered = lower_plan(&plan, &mut DescribeEngine, &options()).unwrap();
  assert_eq!(lowered.deploy.state, "exec(image(alpine@linux/amd64): make)");
}

#[test]
fn merge_keeps_scratch_diffs_for_other_engines() {
  let mut plan = BuildPlan::new();
  plan.add_step(Step::new("install").with_inputs(vec![Layer::image("node")]));
  plan.deploy.base = Layer::image("slim");
  plan.deploy.inputs = Some(vec![Layer::step_filtered(
    "install",
    layerkit_lib::plan::Filter::include_only(vec!["/app/node_modules".to_string()]),
  )]);

  let lowered = lower_plan(&plan, &mut DescribeEngine, &options()).unwrap();
  assert_eq!(
    lowered.deploy.state,
    "merge(image(slim@linux/amd64) | copy(scratch <- image(node@linux/amd64):/app/node_modules -> /app/node_modules))"
  );
}

#[test]
fn missing_asset_is_an_error() {
  let mut plan = BuildPlan::new();
  let mut step = Step::new("config");
  step.add_command(layerkit_lib::plan::Command::file("/etc/app.conf", "app.conf"));
  plan.add_step(step);

  let err = lower_plan(&plan, &mut DescribeEngine, &options()).unwrap_err();
  assert_eq!(err.to_string(), "step config has no asset named app.conf");
  assert!(matches!(err, LowerError::MissingAsset { .. }));
}
