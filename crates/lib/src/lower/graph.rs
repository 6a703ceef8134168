//! An [`Engine`] that records operations into a serializable graph.
//!
//! Operations are interned: asking twice for the same image, or issuing the
//! same copy twice, yields the same node. The resulting [`OpGraph`] is the
//! low-level build graph handed to an external executor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::engine::{CopyOptions, Engine, ExecSpec, FileSpec};
use crate::consts::LOCAL_CONTEXT_NAME;
use crate::platform::BuildPlatform;
use crate::util::hash::Hashable;

/// Index of an operation in an [`OpGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId(pub usize);

impl std::fmt::Display for OpId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// A filesystem state: the operation producing it, or `None` for scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub Option<OpId>);

impl State {
  pub fn scratch() -> Self {
    Self(None)
  }

  pub fn is_scratch(&self) -> bool {
    self.0.is_none()
  }

  pub fn op(&self) -> Option<OpId> {
    self.0
  }
}

impl std::fmt::Display for State {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self.0 {
      Some(id) => write!(f, "{}", id),
      None => write!(f, "scratch"),
    }
  }
}

/// One node of the low-level build graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
  Image {
    reference: String,
    platform: String,
  },
  Local {
    name: String,
  },
  Copy {
    dest: State,
    src: State,
    src_path: String,
    dest_path: String,
    options: CopyOptions,
  },
  Merge {
    inputs: Vec<State>,
    label: String,
  },
  Exec {
    base: State,
    spec: ExecSpec,
  },
  MkFile {
    base: State,
    spec: FileSpec,
  },
}

impl Op {
  /// States this operation reads from.
  pub fn inputs(&self) -> Vec<State> {
    match self {
      Op::Image { .. } | Op::Local { .. } => Vec::new(),
      Op::Copy { dest, src, .. } => vec![*dest, *src],
      Op::Merge { inputs, .. } => inputs.clone(),
      Op::Exec { base, .. } | Op::MkFile { base, .. } => vec![*base],
    }
  }
}

/// Arena of interned operations.
#[derive(Debug, Clone, Serialize)]
pub struct OpGraph {
  ops: Vec<Op>,
  #[serde(skip)]
  index: HashMap<Op, OpId>,
  #[serde(skip)]
  local_name: String,
}

impl Hashable for OpGraph {}

impl Default for OpGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl OpGraph {
  pub fn new() -> Self {
    Self::with_local_name(LOCAL_CONTEXT_NAME)
  }

  /// Graph whose local source is registered under `name`.
  pub fn with_local_name(name: impl Into<String>) -> Self {
    Self {
      ops: Vec::new(),
      index: HashMap::new(),
      local_name: name.into(),
    }
  }

  pub fn ops(&self) -> &[Op] {
    &self.ops
  }

  pub fn get(&self, id: OpId) -> Option<&Op> {
    self.ops.get(id.0)
  }

  /// The operation producing `state`, `None` for scratch.
  pub fn op_for(&self, state: State) -> Option<&Op> {
    state.op().and_then(|id| self.get(id))
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  fn intern(&mut self, op: Op) -> State {
    if let Some(&id) = self.index.get(&op) {
      return State(Some(id));
    }
    let id = OpId(self.ops.len());
    self.index.insert(op.clone(), id);
    self.ops.push(op);
    State(Some(id))
  }
}

impl Engine for OpGraph {
  type State = State;

  fn scratch(&mut self) -> State {
    State::scratch()
  }

  fn image(&mut self, reference: &str, platform: &BuildPlatform) -> State {
    self.intern(Op::Image {
      reference: reference.to_string(),
      platform: platform.to_string(),
    })
  }

  fn local(&mut self) -> State {
    let name = self.local_name.clone();
    self.intern(Op::Local { name })
  }

  fn merge(&mut self, states: Vec<State>, label: &str) -> State {
    let inputs: Vec<State> = states.into_iter().filter(|s| !s.is_scratch()).collect();
    match inputs.len() {
      0 => State::scratch(),
      1 => inputs[0],
      _ => self.intern(Op::Merge {
        inputs,
        label: label.to_string(),
      }),
    }
  }

  fn copy(&mut self, dest: &State, src: &State, src_path: &str, dest_path: &str, options: &CopyOptions) -> State {
    self.intern(Op::Copy {
      dest: *dest,
      src: *src,
      src_path: src_path.to_string(),
      dest_path: dest_path.to_string(),
      options: options.clone(),
    })
  }

  fn exec(&mut self, base: &State, spec: &ExecSpec) -> State {
    self.intern(Op::Exec {
      base: *base,
      spec: spec.clone(),
    })
  }

  fn write_file(&mut self, base: &State, spec: &FileSpec) -> State {
    self.intern(Op::MkFile {
      base: *base,
      spec: spec.clone(),
    })
  }
}
