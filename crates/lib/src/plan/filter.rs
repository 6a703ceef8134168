use serde::{Deserialize, Serialize};

/// Include/exclude path patterns attached to a [`Layer`](super::Layer).
///
/// Each list is tri-state: `None` means the list was never given, `Some(vec![])`
/// means it was given but is empty. The lowering engine treats the two
/// differently when deciding whether layers can be merged (see
/// [`IncludeState`]), so serialization preserves the distinction: an absent
/// list is omitted from JSON and an empty list is written as `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub include: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exclude: Option<Vec<String>>,
}

/// Whether a filter's include list is absent, present but empty, or populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeState {
  Absent,
  Empty,
  NonEmpty,
}

impl Filter {
  pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
    Self {
      include: Some(include),
      exclude: Some(exclude),
    }
  }

  pub fn include_only(include: Vec<String>) -> Self {
    Self {
      include: Some(include),
      exclude: None,
    }
  }

  /// Include patterns, or an empty slice when none were given.
  pub fn includes(&self) -> &[String] {
    self.include.as_deref().unwrap_or_default()
  }

  /// Exclude patterns, or an empty slice when none were given.
  pub fn excludes(&self) -> &[String] {
    self.exclude.as_deref().unwrap_or_default()
  }

  pub fn include_state(&self) -> IncludeState {
    match &self.include {
      None => IncludeState::Absent,
      Some(paths) if paths.is_empty() => IncludeState::Empty,
      Some(_) => IncludeState::NonEmpty,
    }
  }

  /// True when the filter has at least one include or exclude pattern.
  ///
  /// Empty lists do not count; a layer with `include: []` is still unfiltered.
  pub fn has_patterns(&self) -> bool {
    !self.includes().is_empty() || !self.excludes().is_empty()
  }
}
