//! Implementation of the `layerkit normalize` command.
//!
//! Decodes a plan, normalizes it and prints either the normalized plan (json)
//! or a summary of what changed (text).

use std::path::Path;

use anyhow::{Context, Result};

use layerkit_lib::util::hash::Hashable;

use super::load_plan;
use crate::output::{
  OutputFormat, print_entry, print_info, print_json, print_removed, print_stat, print_success, short_hash,
};

pub fn cmd_normalize(file: &Path, verbose: bool, output: OutputFormat) -> Result<()> {
  let mut plan = load_plan(file)?;
  let report = plan.normalize();

  if output.is_json() {
    return print_json(&plan);
  }

  let hash = plan.compute_hash().context("Failed to compute plan hash")?;

  print_success(&format!("Normalized plan {}", short_hash(&hash)));
  print_stat("Steps", &plan.steps.len().to_string());
  print_stat("Empty layers removed", &report.removed_layers.to_string());
  print_stat("Steps pruned", &report.pruned_steps.len().to_string());

  if !report.pruned_steps.is_empty() {
    println!();
    println!("Pruned:");
    for name in &report.pruned_steps {
      print_removed(name);
    }
  }

  if verbose {
    println!();
    if plan.steps.is_empty() {
      print_info("Plan has no steps");
    }
    for step in &plan.steps {
      let inputs: Vec<String> = step.inputs.iter().map(|layer| layer.display_name()).collect();
      print_entry(&step.name, "", &inputs.join(", "));
    }
  }

  Ok(())
}
