//! Typed, filtered references to the inputs of a step or of the deploy stage.
//!
//! # Encoding
//!
//! A layer is written either as an object or as a string shortcut:
//!
//! ```json
//! {"step": "build", "include": ["dist"], "exclude": ["*.map"]}
//! {"image": "node:22-slim"}
//! {"local": true, "include": ["src"]}
//! "."        // local layer including the whole context
//! "..."      // spread marker
//! "$install" // unfiltered reference to the step named "install"
//! ```
//!
//! Decoding tries the object form first and only falls back to the shortcut
//! table when the value is not an object.

use serde::{Deserialize, Serialize};

use super::PlanError;
use super::filter::Filter;

/// What a layer points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerSource {
  /// A container image reference.
  Image(String),
  /// The output of another step, looked up by name.
  Step(String),
  /// The source tree being built.
  Local,
  /// Expands to the layers accumulated before it.
  Spread,
}

/// A typed reference plus the filter applied when copying from it.
///
/// A layer without a source is empty and is removed by
/// [`BuildPlan::normalize`](super::BuildPlan::normalize).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "LayerObject")]
pub struct Layer {
  pub source: Option<LayerSource>,
  pub filter: Filter,
}

impl Layer {
  /// Unfiltered reference to a step's output.
  pub fn step(name: impl Into<String>) -> Self {
    Self {
      source: Some(LayerSource::Step(name.into())),
      filter: Filter::default(),
    }
  }

  pub fn step_filtered(name: impl Into<String>, filter: Filter) -> Self {
    Self {
      source: Some(LayerSource::Step(name.into())),
      filter,
    }
  }

  pub fn image(reference: impl Into<String>) -> Self {
    Self {
      source: Some(LayerSource::Image(reference.into())),
      filter: Filter::default(),
    }
  }

  pub fn image_filtered(reference: impl Into<String>, filter: Filter) -> Self {
    Self {
      source: Some(LayerSource::Image(reference.into())),
      filter,
    }
  }

  /// The whole local context (`include: ["."]`).
  pub fn local() -> Self {
    Self::local_filtered(Filter::include_only(vec![".".to_string()]))
  }

  pub fn local_filtered(filter: Filter) -> Self {
    Self {
      source: Some(LayerSource::Local),
      filter,
    }
  }

  pub fn spread() -> Self {
    Self {
      source: Some(LayerSource::Spread),
      filter: Filter::default(),
    }
  }

  /// True when no source is set.
  pub fn is_empty(&self) -> bool {
    self.source.is_none()
  }

  pub fn is_local(&self) -> bool {
    matches!(self.source, Some(LayerSource::Local))
  }

  pub fn is_spread(&self) -> bool {
    matches!(self.source, Some(LayerSource::Spread))
  }

  /// Name of the referenced step, if this is a step layer.
  pub fn step_name(&self) -> Option<&str> {
    match &self.source {
      Some(LayerSource::Step(name)) => Some(name),
      _ => None,
    }
  }

  pub fn include(&self) -> &[String] {
    self.filter.includes()
  }

  pub fn exclude(&self) -> &[String] {
    self.filter.excludes()
  }

  /// Short human-readable label used in operation names.
  pub fn display_name(&self) -> String {
    let include = self.include().join(", ");
    match &self.source {
      Some(LayerSource::Local) => format!("local {}", include),
      Some(LayerSource::Spread) => format!("spread {}", include),
      Some(LayerSource::Step(name)) => format!("${}", name),
      Some(LayerSource::Image(reference)) => reference.clone(),
      None => format!("input {}", include),
    }
  }
}

impl std::fmt::Display for Layer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

/// Replace every spread marker in `overrides` with the layers of `previous`.
///
/// This is how an override list such as `["...", "$extra"]` extends a list of
/// defaults. The spread marker's own filter is discarded.
pub fn spread_layers(overrides: &[Layer], previous: &[Layer]) -> Vec<Layer> {
  let mut result = Vec::with_capacity(overrides.len() + previous.len());
  for layer in overrides {
    if layer.is_spread() {
      result.extend(previous.iter().cloned());
    } else {
      result.push(layer.clone());
    }
  }
  result
}

/// Object form of a layer as it appears on the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerObject {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  image: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  step: Option<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  local: bool,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  spread: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  include: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  exclude: Option<Vec<String>>,
}

impl TryFrom<LayerObject> for Layer {
  type Error = PlanError;

  fn try_from(obj: LayerObject) -> Result<Self, Self::Error> {
    let image = obj.image.filter(|image| !image.is_empty());
    let step = obj.step.filter(|step| !step.is_empty());

    let mut sources = Vec::new();
    if let Some(image) = image {
      sources.push(LayerSource::Image(image));
    }
    if let Some(step) = step {
      sources.push(LayerSource::Step(step));
    }
    if obj.local {
      sources.push(LayerSource::Local);
    }
    if obj.spread {
      sources.push(LayerSource::Spread);
    }

    if sources.len() > 1 {
      return Err(PlanError::AmbiguousLayer(
        sources.iter().map(source_kind).collect::<Vec<_>>().join(", "),
      ));
    }

    Ok(Layer {
      source: sources.pop(),
      filter: Filter {
        include: obj.include,
        exclude: obj.exclude,
      },
    })
  }
}

impl<'de> Deserialize<'de> for Layer {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    use serde::de::Error;

    // Objects report their own decode errors instead of falling through to
    // the shortcut table.
    match serde_json::Value::deserialize(deserializer)? {
      value @ serde_json::Value::Object(_) => {
        let obj = LayerObject::deserialize(value).map_err(D::Error::custom)?;
        Layer::try_from(obj).map_err(D::Error::custom)
      }
      serde_json::Value::String(shortcut) => parse_shortcut(&shortcut).map_err(D::Error::custom),
      other => Err(D::Error::custom(PlanError::InvalidLayer(other.to_string()))),
    }
  }
}

impl From<Layer> for LayerObject {
  fn from(layer: Layer) -> Self {
    let mut obj = LayerObject {
      include: layer.filter.include,
      exclude: layer.filter.exclude,
      ..Default::default()
    };
    match layer.source {
      Some(LayerSource::Image(image)) => obj.image = Some(image),
      Some(LayerSource::Step(step)) => obj.step = Some(step),
      Some(LayerSource::Local) => obj.local = true,
      Some(LayerSource::Spread) => obj.spread = true,
      None => {}
    }
    obj
  }
}

fn parse_shortcut(shortcut: &str) -> Result<Layer, PlanError> {
  match shortcut {
    "." => Ok(Layer::local()),
    "..." => Ok(Layer::spread()),
    _ => match shortcut.strip_prefix('$') {
      Some(name) if !name.is_empty() => Ok(Layer::step(name)),
      _ => Err(PlanError::InvalidLayer(shortcut.to_string())),
    },
  }
}

fn source_kind(source: &LayerSource) -> &'static str {
  match source {
    LayerSource::Image(_) => "image",
    LayerSource::Step(_) => "step",
    LayerSource::Local => "local",
    LayerSource::Spread => "spread",
  }
}
