//! The build-plan intermediate representation.
//!
//! A [`BuildPlan`] is an ordered list of [`Step`]s plus a [`Deploy`] stage.
//! Steps consume [`Layer`]s (filtered references to images, other steps or the
//! local source tree) and run [`Command`]s on top of them.
//!
//! # Submodules
//!
//! - [`filter`] - include/exclude path patterns
//! - [`layer`] - layer references and their JSON encoding
//! - [`command`] - the closed set of step commands
//! - [`normalize`] - empty-layer removal and liveness pruning

pub mod command;
pub mod filter;
pub mod layer;
pub mod normalize;
mod types;

pub use command::Command;
pub use filter::{Filter, IncludeState};
pub use layer::{Layer, LayerSource, spread_layers};
pub use normalize::NormalizeReport;
pub use types::*;
