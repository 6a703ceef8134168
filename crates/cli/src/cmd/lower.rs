//! Implementation of the `layerkit lower` command.
//!
//! Decodes a plan, normalizes it unless `--raw` is given, and lowers it onto an
//! [`OpGraph`]. JSON output carries the full graph; text output summarizes how
//! each step was composed.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use layerkit_lib::lower::{LowerOptions, LoweredPlan, OpGraph, State, lower_plan};
use layerkit_lib::platform::BuildPlatform;
use layerkit_lib::util::hash::{Hashable, ObjectHash};

use super::load_plan;
use crate::output::{OutputFormat, print_entry, print_info, print_json, print_stat, print_success, short_hash};

#[derive(Serialize)]
struct LowerOutput<'a> {
  hash: ObjectHash,
  platform: &'a BuildPlatform,
  plan: &'a LoweredPlan<State>,
  graph: &'a OpGraph,
}

pub fn cmd_lower(
  file: &Path,
  platform: Option<BuildPlatform>,
  raw: bool,
  verbose: bool,
  output: OutputFormat,
) -> Result<()> {
  let mut plan = load_plan(file)?;
  if !raw {
    plan.normalize();
  }

  let mut options = LowerOptions::default();
  if let Some(platform) = platform {
    options = options.with_platform(platform);
  }

  let mut graph = OpGraph::new();
  let lowered =
    lower_plan(&plan, &mut graph, &options).with_context(|| format!("Failed to lower plan: {}", file.display()))?;
  let hash = graph.compute_hash().context("Failed to compute graph hash")?;

  if output.is_json() {
    return print_json(&LowerOutput {
      hash,
      platform: &options.platform,
      plan: &lowered,
      graph: &graph,
    });
  }

  print_success(&format!("Lowered plan {}", short_hash(&hash)));
  print_stat("Platform", &options.platform.to_string());
  print_stat("Steps", &lowered.steps.len().to_string());
  print_stat("Operations", &graph.len().to_string());

  println!();
  for step in &lowered.steps {
    print_entry(&step.name, &step.state.to_string(), &step.composition.to_string());
    if verbose {
      for (key, value) in step.env.to_env(&options.default_path) {
        println!("      {}={}", key, value);
      }
    }
  }
  print_entry(
    "deploy",
    &lowered.deploy.state.to_string(),
    &lowered.deploy.composition.to_string(),
  );

  if !lowered.deploy.start_command.is_empty() {
    println!();
    print_info(&format!("Start command: {}", lowered.deploy.start_command));
  }

  Ok(())
}
