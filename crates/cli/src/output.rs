//! CLI output formatting utilities.
//!
//! Text output is a status line, labelled stats and indented step lists; JSON
//! output is the pretty-printed value.

use anyhow::Context;
use clap::ValueEnum;
use layerkit_lib::util::hash::ObjectHash;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const MINUS: &str = "-";
}

/// Leading characters of a plan or graph hash shown in text output.
pub const SHORT_HASH_LEN: usize = 12;

pub fn short_hash(hash: &ObjectHash) -> &str {
  let len = hash.0.len().min(SHORT_HASH_LEN);
  &hash.0[..len]
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One indented list line: `• name → target (detail)`.
///
/// `target` and `detail` are skipped when empty.
pub fn print_entry(name: &str, target: &str, detail: &str) {
  let mut line = format!("  {} {}", symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()), name);
  if !target.is_empty() {
    line.push_str(&format!(" {} {}", symbols::ARROW, target));
  }
  if !detail.is_empty() {
    line.push_str(&format!(" ({})", detail.if_supports_color(Stream::Stdout, |s| s.dimmed())));
  }
  println!("{}", line);
}

/// An indented `- name` line for something that was dropped.
pub fn print_removed(name: &str) {
  println!("  {} {}", symbols::MINUS.if_supports_color(Stream::Stdout, |s| s.red()), name);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
