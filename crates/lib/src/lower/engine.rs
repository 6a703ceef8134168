//! The seam between lowering and the build execution engine.
//!
//! Lowering never touches a filesystem. It asks an [`Engine`] for opaque
//! states and combines them; the engine decides what a state is. States are
//! values: every operation returns a new state and leaves its inputs intact,
//! so a state can be shared by any number of steps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::plan::CacheType;
use crate::platform::BuildPlatform;

/// Builds filesystem states for the lowering engine.
pub trait Engine {
  type State: Clone + std::fmt::Debug;

  /// The empty filesystem.
  fn scratch(&mut self) -> Self::State;

  /// The root filesystem of a container image at `platform`.
  fn image(&mut self, reference: &str, platform: &BuildPlatform) -> Self::State;

  /// The source tree being built.
  fn local(&mut self) -> Self::State;

  /// Stack `states` as independent diffs, first at the bottom.
  fn merge(&mut self, states: Vec<Self::State>, label: &str) -> Self::State;

  /// Copy `src_path` from `src` onto `dest` at `dest_path`.
  fn copy(
    &mut self,
    dest: &Self::State,
    src: &Self::State,
    src_path: &str,
    dest_path: &str,
    options: &CopyOptions,
  ) -> Self::State;

  /// Run a process on top of `base`.
  fn exec(&mut self, base: &Self::State, spec: &ExecSpec) -> Self::State;

  /// Write a single file on top of `base`.
  fn write_file(&mut self, base: &Self::State, spec: &FileSpec) -> Self::State;
}

/// Flags attached to a copy operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopyOptions {
  /// Copy the contents of a source directory rather than the directory itself.
  pub copy_dir_contents_only: bool,
  pub create_dest_path: bool,
  pub follow_symlinks: bool,
  pub allow_wildcard: bool,
  /// A wildcard that matches nothing is not an error.
  pub allow_empty_wildcard: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub exclude_patterns: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
}

impl CopyOptions {
  /// Options for copying one include entry of a layer filter.
  pub fn for_layer(exclude_patterns: &[String]) -> Self {
    Self {
      copy_dir_contents_only: true,
      create_dest_path: true,
      follow_symlinks: true,
      allow_wildcard: true,
      allow_empty_wildcard: true,
      exclude_patterns: exclude_patterns.to_vec(),
      label: None,
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }
}

/// A cache directory mounted into an exec operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheMount {
  /// Cache name, shared by every mount with the same name.
  pub id: String,
  pub target: String,
  pub sharing: CacheType,
}

/// A process to run inside a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecSpec {
  pub args: Vec<String>,
  pub cwd: String,
  pub env: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub mounts: Vec<CacheMount>,
  /// Secret names made available to the process; values never enter the graph.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub secrets: Vec<String>,
  pub label: String,
}

/// A file written into a state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSpec {
  pub path: String,
  pub contents: String,
  pub mode: u32,
  pub label: String,
}
