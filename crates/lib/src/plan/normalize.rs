//! Plan normalization.
//!
//! Normalization runs once, after providers have populated a plan and before
//! it is lowered. It has two independent passes:
//!
//! 1. **Empty-layer removal**: layers with no source are dropped from every
//!    step and from the deploy inputs.
//! 2. **Liveness pruning**: steps that the deploy stage cannot reach through
//!    step references are deleted.
//!
//! Step references may form cycles, including a step that references itself.
//! Reachability is therefore computed by a worklist scan whose number of passes
//! is bounded by `|steps|²`, not by recursion.

use std::collections::HashSet;

use tracing::{debug, info};

use super::types::BuildPlan;

/// What a call to [`BuildPlan::normalize`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
  /// Number of empty layers removed across steps and deploy.
  pub removed_layers: usize,
  /// Names of the steps that were pruned, in plan order.
  pub pruned_steps: Vec<String>,
}

impl BuildPlan {
  /// Remove empty layers and prune steps unreachable from the deploy stage.
  ///
  /// Idempotent and infallible. When the deploy stage references no step at
  /// all, every step is kept.
  pub fn normalize(&mut self) -> NormalizeReport {
    let removed_layers = self.remove_empty_layers();
    let pruned_steps = self.prune_unreachable_steps();

    if removed_layers > 0 || !pruned_steps.is_empty() {
      info!(
        removed_layers,
        pruned = pruned_steps.len(),
        remaining = self.steps.len(),
        "normalized build plan"
      );
    }

    NormalizeReport {
      removed_layers,
      pruned_steps,
    }
  }

  fn remove_empty_layers(&mut self) -> usize {
    let mut removed = 0;

    for step in &mut self.steps {
      let before = step.inputs.len();
      step.inputs.retain(|layer| !layer.is_empty());
      removed += before - step.inputs.len();
    }

    if let Some(inputs) = &mut self.deploy.inputs {
      let before = inputs.len();
      inputs.retain(|layer| !layer.is_empty());
      removed += before - inputs.len();

      if inputs.is_empty() {
        self.deploy.inputs = None;
      }
    }

    removed
  }

  /// Names of every step transitively referenced from the deploy stage.
  ///
  /// The result may contain names that do not exist in the plan.
  pub fn reachable_steps(&self) -> HashSet<String> {
    let mut referenced: HashSet<&str> = self.deploy.step_references().collect();
    let mut expanded: HashSet<&str> = HashSet::new();

    // Upper bound on distinct directed edges; once reached no new step can be found.
    let max_passes = self.steps.len() * self.steps.len();

    for pass in 0..max_passes {
      let mut found_new = false;

      for step in &self.steps {
        let name = step.name.as_str();
        if !referenced.contains(name) || !expanded.insert(name) {
          continue;
        }

        for dep in step.step_references() {
          if referenced.insert(dep) {
            found_new = true;
          }
        }
      }

      if !found_new {
        debug!(passes = pass + 1, reachable = referenced.len(), "liveness scan converged");
        break;
      }
    }

    referenced.into_iter().map(str::to_string).collect()
  }

  fn prune_unreachable_steps(&mut self) -> Vec<String> {
    let reachable = self.reachable_steps();
    if reachable.is_empty() {
      return Vec::new();
    }

    let mut pruned = Vec::new();
    self.steps.retain(|step| {
      let keep = reachable.contains(&step.name);
      if !keep {
        pruned.push(step.name.clone());
      }
      keep
    });

    pruned
  }
}
