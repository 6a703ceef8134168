//! Lowering a normalized build plan onto an execution engine.
//!
//! Lowering turns the declarative [`BuildPlan`](crate::plan::BuildPlan) into
//! filesystem states built by an [`Engine`]:
//!
//! 1. Check that every step's first input, and the deploy base, is unfiltered
//! 2. Order steps so dependencies are lowered before the steps naming them;
//!    inside a reference cycle steps keep plan order
//! 3. For each step, compose its inputs ([`layers`]) and apply its commands
//!    ([`step`])
//! 4. Compose the deploy layers into the final image
//!
//! Each step is lowered exactly once; every later reference reuses its state.
//!
//! # Submodules
//!
//! - [`engine`] - the [`Engine`] trait and the operation specs it consumes
//! - [`graph`] - [`OpGraph`], an engine that records a serializable graph
//! - [`layers`] - layer resolution and merge/copy composition
//! - [`paths`] - path cleaning, overlap checks and source/destination mapping
//! - [`dag`] - step ordering
//! - [`step`] - command lowering

pub mod dag;
pub mod engine;
pub mod graph;
pub mod layers;
pub mod paths;
pub mod step;
mod types;

pub use dag::StepDag;
pub use engine::{CacheMount, CopyOptions, Engine, ExecSpec, FileSpec};
pub use graph::{Op, OpGraph, OpId, State};
pub use layers::{Composer, composition_strategy, expand_spreads, should_merge};
pub use step::StepLowerer;
pub use types::*;

use tracing::{debug, info, warn};

use crate::plan::{BuildPlan, Layer};

/// Lower `plan` onto `engine`.
///
/// The plan should already be normalized. Step references to steps that do
/// not exist, or that are not lowered yet because of a reference cycle,
/// resolve to scratch.
///
/// # Errors
///
/// - [`LowerError::FilteredBaseLayer`] if a step's first input or the deploy
///   base has include or exclude patterns
/// - [`LowerError::MissingAsset`] if a file command names an unknown asset
pub fn lower_plan<E: Engine>(
  plan: &BuildPlan,
  engine: &mut E,
  options: &LowerOptions,
) -> Result<LoweredPlan<E::State>, LowerError> {
  validate_base_layers(plan)?;

  let dag = StepDag::from_plan(plan);
  for cycle in dag.cycles() {
    warn!(steps = %cycle.join(", "), "steps reference each other in a cycle, later members resolve to scratch");
  }
  let order = dag.topological_steps();
  info!(steps = order.len(), platform = %options.platform, "lowering plan");

  let mut states: StepStates<E::State> = StepStates::new();
  let mut lowered = Vec::with_capacity(order.len());

  for name in &order {
    let Some(step) = plan.step(name) else {
      continue;
    };

    let (base, composition) = Composer::new(engine, &states, &options.platform).compose(&step.inputs);
    debug!(step = %name, inputs = step.inputs.len(), %composition, "composed step inputs");

    let (state, env) = StepLowerer::new(engine, plan, step, options).apply(base)?;
    states.insert(name.clone(), state.clone());

    lowered.push(LoweredStep {
      name: name.clone(),
      state,
      composition,
      env,
    });
  }

  let duplicates = plan.steps.len() - order.len();
  if duplicates > 0 {
    warn!(duplicates, "plan has steps with duplicate names, only the first of each was lowered");
  }

  let deploy_layers = plan.deploy.layers();
  let (state, composition) = Composer::new(engine, &states, &options.platform).compose(&deploy_layers);
  debug!(inputs = deploy_layers.len(), %composition, "composed deploy");

  let deploy_env = StepEnv {
    variables: plan.deploy.variables.clone(),
    paths: plan.deploy.paths.clone(),
  };

  info!(steps = lowered.len(), "lowered plan");

  Ok(LoweredPlan {
    steps: lowered,
    deploy: LoweredDeploy {
      state,
      composition,
      env: deploy_env.to_env(&options.default_path),
      start_command: plan.deploy.start_command.clone(),
    },
  })
}

/// Every layer list lowering composes must start with an unfiltered layer.
fn validate_base_layers(plan: &BuildPlan) -> Result<(), LowerError> {
  fn check(owner: impl FnOnce() -> String, layers: &[Layer]) -> Result<(), LowerError> {
    match layers.first() {
      Some(first) if first.filter.has_patterns() => Err(LowerError::FilteredBaseLayer { owner: owner() }),
      _ => Ok(()),
    }
  }

  for step in &plan.steps {
    check(|| format!("step {}", step.name), &step.inputs)?;
  }
  check(|| "deploy".to_string(), &plan.deploy.layers())
}

#[cfg(test)]
mod tests {
  use tracing_test::traced_test;

  use super::*;
  use crate::plan::{Command, Filter, Step};
  use crate::platform::BuildPlatform;

  fn options() -> LowerOptions {
    LowerOptions::default().with_platform(BuildPlatform::linux_amd64())
  }

  fn include(paths: &[&str]) -> Filter {
    Filter::include_only(paths.iter().map(|p| p.to_string()).collect())
  }

  #[test]
  fn steps_are_lowered_in_dependency_order() {
    let mut plan = BuildPlan::new();
    plan.add_step(Step::new("build").with_inputs(vec![Layer::step("install")]));
    plan.add_step(Step::new("install").with_inputs(vec![Layer::image("node:22")]));
    plan.deploy.base = Layer::step("build");

    let mut graph = OpGraph::new();
    let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();

    let names: Vec<&str> = lowered.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["install", "build"]);
    assert_eq!(lowered.step("build").unwrap().state, lowered.step("install").unwrap().state);
    assert_eq!(lowered.deploy.state, lowered.step("build").unwrap().state);
  }

  #[test]
  fn filtered_step_base_is_rejected() {
    let mut plan = BuildPlan::new();
    plan.add_step(Step::new("build").with_inputs(vec![Layer::step_filtered("install", include(&["dist"]))]));

    let err = lower_plan(&plan, &mut OpGraph::new(), &options()).unwrap_err();
    assert_eq!(err, LowerError::FilteredBaseLayer {
      owner: "step build".to_string()
    });
  }

  #[test]
  fn filtered_deploy_base_is_rejected() {
    let mut plan = BuildPlan::new();
    plan.deploy.base = Layer::image_filtered("node:22", include(&["/usr"]));

    let err = lower_plan(&plan, &mut OpGraph::new(), &options()).unwrap_err();
    assert_eq!(err, LowerError::FilteredBaseLayer {
      owner: "deploy".to_string()
    });
  }

  #[test]
  #[traced_test]
  fn reference_cycle_lowers_in_plan_order() {
    let mut plan = BuildPlan::new();
    for (name, dep) in [("step1", "step2"), ("step2", "step3"), ("step3", "step1"), ("step4", "step1")] {
      let mut step = Step::new(name).with_inputs(vec![Layer::step(dep)]);
      step.add_command(Command::exec(format!("echo {}", name)));
      plan.add_step(step);
    }
    plan.deploy.base = Layer::step("step4");
    plan.normalize();
    assert_eq!(plan.steps.len(), 4);

    let mut graph = OpGraph::new();
    let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();

    let names: Vec<&str> = lowered.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["step1", "step2", "step3", "step4"]);
    match graph.op_for(lowered.step("step1").unwrap().state) {
      Some(Op::Exec { base, .. }) => assert!(base.is_scratch()),
      other => panic!("Expected Exec op, got {:?}", other),
    }
    match graph.op_for(lowered.step("step2").unwrap().state) {
      Some(Op::Exec { base, .. }) => assert!(base.is_scratch()),
      other => panic!("Expected Exec op, got {:?}", other),
    }
    match graph.op_for(lowered.step("step3").unwrap().state) {
      Some(Op::Exec { base, .. }) => assert_eq!(*base, lowered.step("step1").unwrap().state),
      other => panic!("Expected Exec op, got {:?}", other),
    }
    assert!(logs_contain("steps reference each other in a cycle"));
  }

  #[test]
  fn empty_deploy_base_copies_filtered_inputs_onto_scratch() {
    let mut plan = BuildPlan::new();
    let mut build = Step::new("build").with_inputs(vec![Layer::image("node:22")]);
    build.add_command(Command::exec("npm run build"));
    plan.add_step(build);
    plan.deploy.inputs = Some(vec![Layer::step_filtered("build", include(&["dist"]))]);
    plan.normalize();

    let mut graph = OpGraph::new();
    let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();
    assert_eq!(lowered.deploy.composition, Composition::Merge);

    let Some(Op::Copy { dest, src, dest_path, .. }) = graph.op_for(lowered.deploy.state).cloned() else {
      panic!("expected copy");
    };
    assert!(dest.is_scratch());
    assert_eq!(src, lowered.step("build").unwrap().state);
    assert_eq!(dest_path, "/app/dist");
  }

  #[test]
  fn empty_deploy_base_ignores_unfiltered_image_contents() {
    let mut plan = BuildPlan::new();
    plan.deploy.inputs = Some(vec![Layer::image("alpine")]);

    let lowered = lower_plan(&plan, &mut OpGraph::new(), &options()).unwrap();
    assert_eq!(lowered.deploy.composition, Composition::Copy);
    assert!(lowered.deploy.state.is_scratch());
  }

  #[test]
  fn self_reference_resolves_to_scratch() {
    let mut plan = BuildPlan::new();
    let mut step = Step::new("loop").with_inputs(vec![Layer::step("loop")]);
    step.add_command(Command::exec("true"));
    plan.add_step(step);

    let mut graph = OpGraph::new();
    let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();
    match graph.op_for(lowered.steps[0].state) {
      Some(Op::Exec { base, .. }) => assert!(base.is_scratch()),
      other => panic!("Expected Exec op, got {:?}", other),
    }
  }

  #[test]
  fn duplicate_steps_lower_once() {
    let mut plan = BuildPlan::new();
    plan.add_step(Step::new("build").with_inputs(vec![Layer::image("node:22")]));
    plan.add_step(Step::new("build").with_inputs(vec![Layer::image("python:3")]));

    let mut graph = OpGraph::new();
    let lowered = lower_plan(&plan, &mut graph, &options()).unwrap();
    assert_eq!(lowered.steps.len(), 1);
    assert!(matches!(graph.op_for(lowered.steps[0].state), Some(Op::Image { reference, .. }) if reference == "node:22"));
  }

  #[test]
  fn deploy_env_prepends_paths() {
    let mut plan = BuildPlan::new();
    plan.deploy.base = Layer::image("node:22-slim");
    plan.deploy.paths = vec!["/app/node_modules/.bin".to_string()];
    plan.deploy.variables.insert("PORT".to_string(), "3000".to_string());
    plan.deploy.start_command = "npm start".to_string();

    let opts = options();
    let lowered = lower_plan(&plan, &mut OpGraph::new(), &opts).unwrap();
    assert_eq!(lowered.deploy.env["PATH"], format!("/app/node_modules/.bin:{}", opts.default_path));
    assert_eq!(lowered.deploy.env["PORT"], "3000");
    assert_eq!(lowered.deploy.start_command, "npm start");
    assert_eq!(lowered.deploy.composition, Composition::Direct);
  }

  #[test]
  fn empty_plan_lowers_to_scratch() {
    let lowered = lower_plan(&BuildPlan::new(), &mut OpGraph::new(), &options()).unwrap();
    assert!(lowered.steps.is_empty());
    assert!(lowered.deploy.state.is_scratch());
    assert_eq!(lowered.deploy.composition, Composition::Scratch);
  }
}
