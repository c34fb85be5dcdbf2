//! CLI output formatting utilities.

use anyhow::Context;
use clap::ValueEnum;
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
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

/// Follow-up advice printed under an error.
pub fn print_hint(hint: &str) {
  eprintln!(
    "  {} {}",
    symbols::ARROW.if_supports_color(Stream::Stderr, |s| s.dimmed()),
    hint.if_supports_color(Stream::Stderr, |s| s.dimmed())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
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

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Width-padded artifact name followed by what happened to it.
pub fn step_line(artifact: &str, outcome: &str) -> String {
  format!("{artifact:<24} {outcome}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn step_lines_align() {
    assert_eq!(step_line("0001_p.json", "created dev-demo-p"), format!("0001_p.json{} created dev-demo-p", " ".repeat(13)));
    let long = "0042_a_very_long_artifact.json";
    assert!(step_line(long, "x").starts_with(long));
  }
}
