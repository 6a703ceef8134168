//! Types for lowering a build plan.
//!
//! This module defines the error type, the configuration and the results
//! produced when lowering a normalized plan onto an [`Engine`](super::Engine).

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;

use crate::consts::DEFAULT_PATH;
use crate::platform::BuildPlatform;

/// Errors that can occur while lowering a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
  /// The first layer of a step or of the deploy stage carries a filter.
  #[error("first input of {owner} must not have include or exclude paths")]
  FilteredBaseLayer { owner: String },

  /// A file command names an asset the step does not define.
  #[error("step {step} has no asset named {asset}")]
  MissingAsset { step: String, asset: String },
}

/// Configuration for [`lower_plan`](super::lower_plan).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowerOptions {
  /// Platform image layers are resolved at.
  pub platform: BuildPlatform,
  /// `PATH` that path commands and deploy paths are prepended to.
  pub default_path: String,
}

impl Default for LowerOptions {
  fn default() -> Self {
    Self {
      platform: BuildPlatform::host(),
      default_path: DEFAULT_PATH.to_string(),
    }
  }
}

impl LowerOptions {
  pub fn with_platform(mut self, platform: BuildPlatform) -> Self {
    self.platform = platform;
    self
  }
}

/// How a list of layers was combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
  /// No layers: the empty filesystem.
  Scratch,
  /// A single layer used as-is.
  Direct,
  /// Independent per-layer diffs stacked with one merge.
  Merge,
  /// Filtered paths copied one layer after another onto the first.
  Copy,
}

impl std::fmt::Display for Composition {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Composition::Scratch => "scratch",
      Composition::Direct => "direct",
      Composition::Merge => "merge",
      Composition::Copy => "copy",
    };
    write!(f, "{}", name)
  }
}

/// Environment accumulated by a step's variable and path commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepEnv {
  pub variables: BTreeMap<String, String>,
  /// Directories prepended to `PATH`, most recently added first.
  pub paths: Vec<String>,
}

impl StepEnv {
  pub fn prepend_path(&mut self, path: impl Into<String>) {
    let path = path.into();
    self.paths.retain(|existing| *existing != path);
    self.paths.insert(0, path);
  }

  pub fn path_value(&self, default_path: &str) -> String {
    self
      .paths
      .iter()
      .map(String::as_str)
      .chain(std::iter::once(default_path).filter(|p| !p.is_empty()))
      .collect::<Vec<_>>()
      .join(":")
  }

  /// Variables plus the resulting `PATH`.
  pub fn to_env(&self, default_path: &str) -> BTreeMap<String, String> {
    let mut env = self.variables.clone();
    env.insert("PATH".to_string(), self.path_value(default_path));
    env
  }
}

/// The result of lowering one step.
#[derive(Debug, Clone, Serialize)]
pub struct LoweredStep<S> {
  pub name: String,
  pub state: S,
  pub composition: Composition,
  pub env: StepEnv,
}

/// The result of lowering the deploy stage.
#[derive(Debug, Clone, Serialize)]
pub struct LoweredDeploy<S> {
  pub state: S,
  pub composition: Composition,
  pub env: BTreeMap<String, String>,
  #[serde(rename = "startCommand")]
  pub start_command: String,
}

/// Every lowered step, in lowering order, plus the final image.
#[derive(Debug, Clone, Serialize)]
pub struct LoweredPlan<S> {
  pub steps: Vec<LoweredStep<S>>,
  pub deploy: LoweredDeploy<S>,
}

impl<S> LoweredPlan<S> {
  pub fn step(&self, name: &str) -> Option<&LoweredStep<S>> {
    self.steps.iter().find(|step| step.name == name)
  }
}

/// States of the steps lowered so far, keyed by step name.
///
/// Step layers are weak references: a name missing from the map is not an
/// error, [`get`](Self::get) simply returns `None` and the caller substitutes
/// scratch.
#[derive(Debug, Clone)]
pub struct StepStates<S> {
  states: HashMap<String, S>,
}

impl<S> Default for StepStates<S> {
  fn default() -> Self {
    Self { states: HashMap::new() }
  }
}

impl<S: Clone> StepStates<S> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<&S> {
    self.states.get(name)
  }

  /// Record a step's state. Returns `false`, leaving the first state in place,
  /// when the name was already lowered.
  pub fn insert(&mut self, name: impl Into<String>, state: S) -> bool {
    match self.states.entry(name.into()) {
      std::collections::hash_map::Entry::Occupied(_) => false,
      std::collections::hash_map::Entry::Vacant(entry) => {
        entry.insert(state);
        true
      }
    }
  }
}
