//! Resolving layers to states and composing a layer list into one state.
//!
//! A step's first input is its base. Every following input contributes only
//! the paths named by its include filter. There are two ways to lay those
//! paths onto the base:
//!
//! - **merge**: each secondary layer is copied onto its own scratch state and
//!   all diffs are stacked with a single merge. Cheap, but only correct when no
//!   two layers touch the same path.
//! - **copy**: secondary layers are copied one after another onto the base.
//!   Always correct; later layers shadow earlier ones.
//!
//! [`should_merge`] picks between them.

use tracing::{debug, warn};

use super::engine::{CopyOptions, Engine};
use super::paths::{is_root, paths_overlap, resolve_src_dest};
use super::types::{Composition, StepStates};
use crate::consts::LABEL_PREFIX;
use crate::plan::{IncludeState, Layer, LayerSource};
use crate::platform::BuildPlatform;

/// Whether `layers` can be combined with a single merge.
///
/// False when a secondary layer has no include list at all, when any layer
/// includes `/`, when any layer is local, or when the include sets of any two
/// layers overlap. An empty list is vacuously mergeable.
pub fn should_merge(layers: &[Layer]) -> bool {
  for (i, layer) in layers.iter().enumerate() {
    if i != 0 && layer.filter.include_state() == IncludeState::Absent {
      return false;
    }

    if layer.include().iter().any(|path| is_root(path)) {
      return false;
    }

    if layer.is_local() {
      return false;
    }

    if layers[i + 1..]
      .iter()
      .any(|other| paths_overlap(layer.include(), other.include()))
    {
      return false;
    }
  }
  true
}

/// The strategy [`Composer::compose`] will use for `layers`.
pub fn composition_strategy(layers: &[Layer]) -> Composition {
  match layers {
    [] => Composition::Scratch,
    [only] if only.is_empty() => Composition::Scratch,
    [_] => Composition::Direct,
    _ if should_merge(layers) => Composition::Merge,
    _ => Composition::Copy,
  }
}

/// Replace each spread marker with every concrete layer before it in the list.
///
/// The first layer is the base and always keeps its place: an empty base stays
/// as scratch, and a leading spread marker becomes an empty scratch base. Empty
/// layers after the base are dropped.
pub fn expand_spreads(layers: &[Layer]) -> Vec<Layer> {
  let mut expanded: Vec<Layer> = Vec::with_capacity(layers.len());
  for (i, layer) in layers.iter().enumerate() {
    if i == 0 && layer.is_spread() {
      expanded.push(Layer::default());
    } else if layer.is_spread() {
      let previous = expanded.clone();
      expanded.extend(previous);
    } else if i == 0 || !layer.is_empty() {
      expanded.push(layer.clone());
    }
  }
  expanded
}

/// Lowers layer lists against an [`Engine`].
///
/// Step layers are looked up in the states of the steps lowered so far; a
/// name that has not been lowered (or does not exist) resolves to scratch.
pub struct Composer<'a, E: Engine> {
  engine: &'a mut E,
  states: &'a StepStates<E::State>,
  platform: &'a BuildPlatform,
}

impl<'a, E: Engine> Composer<'a, E> {
  pub fn new(engine: &'a mut E, states: &'a StepStates<E::State>, platform: &'a BuildPlatform) -> Self {
    Self {
      engine,
      states,
      platform,
    }
  }

  /// The state a single layer points at, ignoring its filter.
  pub fn resolve_layer(&mut self, layer: &Layer) -> E::State {
    match &layer.source {
      Some(LayerSource::Image(reference)) => self.engine.image(reference, self.platform),
      Some(LayerSource::Local) => self.engine.local(),
      Some(LayerSource::Step(name)) => match self.states.get(name) {
        Some(state) => state.clone(),
        None => {
          debug!(step = %name, "step has no lowered state, using scratch");
          self.engine.scratch()
        }
      },
      Some(LayerSource::Spread) | None => self.engine.scratch(),
    }
  }

  /// Compose `layers` into one state.
  ///
  /// An empty first layer is a scratch base that the remaining layers are
  /// copied or merged onto.
  ///
  /// # Panics
  ///
  /// If the first layer carries include or exclude patterns. The base layer
  /// must be unfiltered; callers validate this before composing.
  pub fn compose(&mut self, layers: &[Layer]) -> (E::State, Composition) {
    if let Some(first) = layers.first() {
      assert!(
        !first.filter.has_patterns(),
        "first input {} must not have include or exclude paths",
        first.display_name()
      );
    }

    let layers = expand_spreads(layers);

    let strategy = composition_strategy(&layers);
    let state = match strategy {
      Composition::Scratch => self.engine.scratch(),
      Composition::Direct => self.resolve_layer(&layers[0]),
      Composition::Merge => self.merge_state(&layers),
      Composition::Copy => self.copy_state(&layers),
    };
    (state, strategy)
  }

  fn merge_state(&mut self, layers: &[Layer]) -> E::State {
    let mut states = vec![self.resolve_layer(&layers[0])];
    let mut names = vec![layers[0].display_name()];

    for input in &layers[1..] {
      if input.include().is_empty() {
        warn!(input = %input.display_name(), "input has no include or exclude paths, this is probably a mistake");
      }
      let input_state = self.resolve_layer(input);
      let scratch = self.engine.scratch();
      states.push(self.copy_layer_paths(scratch, &input_state, input));
      names.push(input.display_name());
    }

    let label = format!("{} merge {}", LABEL_PREFIX, names.join(", "));
    self.engine.merge(states, &label)
  }

  fn copy_state(&mut self, layers: &[Layer]) -> E::State {
    let mut state = self.resolve_layer(&layers[0]);
    for input in &layers[1..] {
      let input_state = self.resolve_layer(input);
      state = self.copy_layer_paths(state, &input_state, input);
    }
    state
  }

  /// Copy every include entry of `layer` from `src` onto `dest`.
  fn copy_layer_paths(&mut self, mut dest: E::State, src: &E::State, layer: &Layer) -> E::State {
    for include in layer.include() {
      let (src_path, dest_path) = resolve_src_dest(include, layer.is_local());

      let mut options = CopyOptions::for_layer(layer.exclude());
      if src_path == dest_path {
        options = options.with_label(format!("copy {}", src_path));
      }

      dest = self.engine.copy(&dest, src, &src_path, &dest_path, &options);
    }
    dest
  }
}
