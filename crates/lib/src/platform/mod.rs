//! Target platform for image builds.
//!
//! Image layers are requested from the execution engine at a specific
//! platform. The platform is either parsed from an `os/arch[/variant]` string
//! or derived from the host.

pub mod arch;
pub mod os;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arch::Arch;
use os::Os;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
  #[error("invalid platform format: {0}. Must be one of: linux/amd64, linux/arm64, etc")]
  Invalid(String),
}

/// Platform identifier for image builds (e.g., "linux/arm64/v8")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildPlatform {
  pub os: Os,
  pub arch: Arch,
  pub variant: Option<String>,
}

impl BuildPlatform {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self {
      os,
      arch,
      variant: arch.default_variant().map(str::to_string),
    }
  }

  pub fn linux_amd64() -> Self {
    Self::new(Os::Linux, Arch::Amd64)
  }

  pub fn linux_arm64() -> Self {
    Self::new(Os::Linux, Arch::Arm64)
  }

  /// Linux platform matching the host architecture.
  pub fn host() -> Self {
    Self::new(Os::Linux, Arch::host())
  }

  /// Parse a platform string, falling back to the host platform when empty.
  pub fn parse(value: &str) -> Result<Self, PlatformError> {
    let value = value.trim();
    if value.is_empty() {
      return Ok(Self::host());
    }

    let invalid = || PlatformError::Invalid(value.to_string());
    let mut parts = value.split('/');

    let os = parts.next().and_then(Os::parse).ok_or_else(invalid)?;
    let arch = parts.next().and_then(Arch::parse).ok_or_else(invalid)?;
    let variant = match parts.next() {
      Some("") => return Err(invalid()),
      Some(variant) => Some(variant.to_string()),
      None => arch.default_variant().map(str::to_string),
    };

    if parts.next().is_some() {
      return Err(invalid());
    }

    Ok(Self { os, arch, variant })
  }
}

impl Default for BuildPlatform {
  fn default() -> Self {
    Self::host()
  }
}

impl fmt::Display for BuildPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.variant {
      Some(variant) => write!(f, "{}/{}/{}", self.os, self.arch, variant),
      None => write!(f, "{}/{}", self.os, self.arch),
    }
  }
}

impl FromStr for BuildPlatform {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for BuildPlatform {
  type Error = PlatformError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<BuildPlatform> for String {
  fn from(platform: BuildPlatform) -> Self {
    platform.to_string()
  }
}
