use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command::Command;
use super::layer::Layer;
use crate::util::hash::Hashable;

/// Errors raised while decoding a plan.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error("invalid input format: {0}")]
  InvalidLayer(String),

  #[error("layer sets more than one source: {0}")]
  AmbiguousLayer(String),

  #[error("invalid plan json: {0}")]
  Json(#[from] serde_json::Error),
}

/// How a cache directory is shared between concurrent builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
  #[default]
  Shared,
  Locked,
}

/// A directory persisted across builds and mounted into exec commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cache {
  pub directory: String,
  #[serde(rename = "type", default)]
  pub kind: CacheType,
}

impl Cache {
  pub fn new(directory: impl Into<String>, kind: CacheType) -> Self {
    Self {
      directory: directory.into(),
      kind,
    }
  }
}

/// A named build stage.
///
/// Other steps and the deploy stage refer to a step only by `name`; the name
/// is a lookup key, never an owning reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
  pub name: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inputs: Vec<Layer>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub commands: Vec<Command>,
  /// Names of entries in [`BuildPlan::caches`] mounted into exec commands.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub caches: Vec<String>,
  /// Secret names exposed to exec commands. `"*"` exposes every plan secret.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub secrets: Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, String>,
  /// File bodies referenced by file commands, keyed by asset name.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub assets: BTreeMap<String, String>,
}

impl Step {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_inputs(mut self, inputs: Vec<Layer>) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn add_command(&mut self, command: Command) {
    self.commands.push(command);
  }

  pub fn add_commands(&mut self, commands: impl IntoIterator<Item = Command>) {
    self.commands.extend(commands);
  }

  /// Names of the steps this step's inputs refer to, in input order.
  pub fn step_references(&self) -> impl Iterator<Item = &str> {
    self.inputs.iter().filter_map(Layer::step_name)
  }
}

/// The final image: a base layer, extra input layers and runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
  /// Must be unfiltered.
  #[serde(default, skip_serializing_if = "Layer::is_empty")]
  pub base: Layer,
  /// `None` means nothing was ever added, which normalization distinguishes
  /// from a list whose entries were all removed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inputs: Option<Vec<Layer>>,
  #[serde(rename = "startCommand", default, skip_serializing_if = "String::is_empty")]
  pub start_command: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, String>,
  /// Directories prepended to `PATH` in the final image.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub paths: Vec<String>,
}

impl Deploy {
  pub fn inputs(&self) -> &[Layer] {
    self.inputs.as_deref().unwrap_or_default()
  }

  /// Names of the steps the deploy stage refers to directly.
  pub fn step_references(&self) -> impl Iterator<Item = &str> {
    std::iter::once(&self.base)
      .chain(self.inputs())
      .filter_map(Layer::step_name)
  }

  /// Base followed by the inputs, the list composed into the final image.
  pub fn layers(&self) -> Vec<Layer> {
    std::iter::once(self.base.clone())
      .chain(self.inputs().iter().cloned())
      .collect()
  }
}

/// The build-plan intermediate representation.
///
/// Produced by providers, normalized once with [`BuildPlan::normalize`], then
/// handed read-only to the lowering engine.
///
/// # Example
///
/// ```json
/// {
///   "steps": [
///     { "name": "install", "inputs": [{"image": "node:22"}, "."], "commands": [{"cmd": "npm ci"}] }
///   ],
///   "caches": { "npm": { "directory": "/root/.npm", "type": "shared" } },
///   "secrets": ["NPM_TOKEN"],
///   "deploy": { "base": {"image": "node:22-slim"}, "inputs": [{"step": "install", "include": ["."]}],
///               "startCommand": "npm start" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub steps: Vec<Step>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub caches: BTreeMap<String, Cache>,
  #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
  pub secrets: BTreeSet<String>,
  #[serde(default)]
  pub deploy: Deploy,
}

impl Hashable for BuildPlan {}

impl BuildPlan {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_json(json: &str) -> Result<Self, PlanError> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn add_step(&mut self, step: Step) {
    self.steps.push(step);
  }

  /// Look up a step by name.
  pub fn step(&self, name: &str) -> Option<&Step> {
    self.steps.iter().find(|step| step.name == name)
  }
}
