use std::fmt;

/// CPU architectures a build can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  Amd64,
  Arm64,
  Arm,
}

impl Arch {
  /// Architecture of the machine running the build.
  ///
  /// Anything that is not a 64-bit ARM host builds for `amd64`.
  pub fn host() -> Self {
    match std::env::consts::ARCH {
      "aarch64" => Self::Arm64,
      _ => Self::Amd64,
    }
  }

  /// Parse an architecture name, accepting the Rust target spellings as aliases.
  pub fn parse(name: &str) -> Option<Self> {
    match name.to_ascii_lowercase().as_str() {
      "amd64" | "x86_64" | "x86-64" => Some(Self::Amd64),
      "arm64" | "aarch64" => Some(Self::Arm64),
      "arm" => Some(Self::Arm),
      _ => None,
    }
  }

  /// Returns the OCI identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm64 => "arm64",
      Self::Arm => "arm",
    }
  }

  /// Variant implied by the architecture when none is given.
  pub fn default_variant(&self) -> Option<&'static str> {
    match self {
      Self::Arm64 => Some("v8"),
      Self::Amd64 | Self::Arm => None,
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
