//! Commands executed inside a build step.
//!
//! Commands are a closed set. On the wire each kind is recognised by its
//! fields rather than a tag:
//!
//! | Kind       | Shape                                             |
//! |------------|---------------------------------------------------|
//! | `Exec`     | `{"cmd": "npm ci", "customName": "install"}`      |
//! | `Copy`     | `{"src": ".", "dest": ".", "image": "node:22"}`   |
//! | `File`     | `{"path": "/root", "name": ".npmrc", "mode": 384}`|
//! | `Variable` | `{"name": "NODE_ENV", "value": "production"}`     |
//! | `Path`     | `{"path": "/app/node_modules/.bin"}`              |
//!
//! Unknown fields are rejected so a shape can never be mistaken for another.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
  Exec(ExecCommand),
  Copy(CopyCommand),
  File(FileCommand),
  Variable(VariableCommand),
  Path(PathCommand),
}

/// Run a shell command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecCommand {
  pub cmd: String,
  #[serde(rename = "customName", default, skip_serializing_if = "Option::is_none")]
  pub custom_name: Option<String>,
}

/// Copy a path from the local context, or from an image when `image` is set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyCommand {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<String>,
  pub src: String,
  pub dest: String,
}

/// Write the step asset called `name` to `path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileCommand {
  pub path: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<u32>,
  #[serde(rename = "customName", default, skip_serializing_if = "Option::is_none")]
  pub custom_name: Option<String>,
}

/// Set an environment variable for the commands that follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableCommand {
  pub name: String,
  pub value: String,
}

/// Prepend a directory to `PATH` for the commands that follow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathCommand {
  pub path: String,
}

impl Command {
  pub fn exec(cmd: impl Into<String>) -> Self {
    Command::Exec(ExecCommand {
      cmd: cmd.into(),
      custom_name: None,
    })
  }

  pub fn exec_named(cmd: impl Into<String>, custom_name: impl Into<String>) -> Self {
    Command::Exec(ExecCommand {
      cmd: cmd.into(),
      custom_name: Some(custom_name.into()),
    })
  }

  /// Copy `src` from the local context to the same relative destination.
  pub fn copy(src: impl Into<String>) -> Self {
    let src = src.into();
    Command::Copy(CopyCommand {
      image: None,
      dest: src.clone(),
      src,
    })
  }

  pub fn copy_to(src: impl Into<String>, dest: impl Into<String>) -> Self {
    Command::Copy(CopyCommand {
      image: None,
      src: src.into(),
      dest: dest.into(),
    })
  }

  pub fn copy_from_image(image: impl Into<String>, src: impl Into<String>, dest: impl Into<String>) -> Self {
    Command::Copy(CopyCommand {
      image: Some(image.into()),
      src: src.into(),
      dest: dest.into(),
    })
  }

  pub fn file(path: impl Into<String>, name: impl Into<String>) -> Self {
    Command::File(FileCommand {
      path: path.into(),
      name: name.into(),
      mode: None,
      custom_name: None,
    })
  }

  pub fn variable(name: impl Into<String>, value: impl Into<String>) -> Self {
    Command::Variable(VariableCommand {
      name: name.into(),
      value: value.into(),
    })
  }

  pub fn path(path: impl Into<String>) -> Self {
    Command::Path(PathCommand { path: path.into() })
  }
}
