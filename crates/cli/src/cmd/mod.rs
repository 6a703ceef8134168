mod info;
mod lower;
mod normalize;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use layerkit_lib::plan::BuildPlan;

pub use info::cmd_info;
pub use lower::cmd_lower;
pub use normalize::cmd_normalize;

/// Read and decode a build plan file.
fn load_plan(path: &Path) -> Result<BuildPlan> {
  let json = fs::read_to_string(path).with_context(|| format!("Failed to read plan: {}", path.display()))?;
  BuildPlan::from_json(&json).with_context(|| format!("Failed to parse plan: {}", path.display()))
}
