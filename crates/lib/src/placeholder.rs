//! Placeholder parsing and substitution for parameter files.
//!
//! Parameter values are written once and reused across stages and regions.
//! Placeholders let them refer to the deployment they are loaded for.
//!
//! # Placeholder Formats
//!
//! - `$${stage}` - the stage being deployed
//! - `$${region}` - the resolved region
//! - `$${env:NAME}` - the value of environment variable `NAME`
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so values like `$HOME` or
//! CloudFormation `${AWS::Region}` substitutions are left alone.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use stratus_lib::placeholder::{parse, Segment, Placeholder};
//!
//! let segments = parse("app-$${stage}.example.com").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("app-".to_string()),
//!     Segment::Placeholder(Placeholder::Stage),
//!     Segment::Literal(".example.com".to_string()),
//! ]);
//! ```

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  /// `$${stage}`
  Stage,

  /// `$${region}`
  Region,

  /// `$${env:NAME}`
  Env(String),
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during placeholder parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("environment variable '{0}' is not set")]
  UnresolvedEnv(String),
}

/// Resolves placeholder values for one deployment.
pub trait Resolver {
  fn resolve_stage(&self) -> &str;

  fn resolve_region(&self) -> &str;

  /// Look up an environment variable.
  fn resolve_env(&self, name: &str) -> Result<String, PlaceholderError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is malformed (unclosed, unknown type, etc.)
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();
            if let Some((_, '{')) = chars.peek() {
              // $$${ -> literal $${
              literal.push_str("$${");
              chars.next();
            } else {
              literal.push_str("$$$");
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut content = String::new();
            let mut found_close = false;
            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              content.push(c);
            }

            if !found_close {
              return Err(PlaceholderError::Unclosed(pos));
            }

            segments.push(Segment::Placeholder(parse_placeholder_content(&content)?));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content between `$${` and `}`.
fn parse_placeholder_content(content: &str) -> Result<Placeholder, PlaceholderError> {
  match content {
    "stage" => return Ok(Placeholder::Stage),
    "region" => return Ok(Placeholder::Region),
    _ => {}
  }

  let (kind, rest) = content
    .split_once(':')
    .ok_or_else(|| PlaceholderError::UnknownType(content.to_string()))?;

  match kind {
    "env" => {
      if rest.is_empty() {
        return Err(PlaceholderError::Malformed(format!("env placeholder missing name: '{content}'")));
      }
      Ok(Placeholder::Env(rest.to_string()))
    }
    _ => Err(PlaceholderError::UnknownType(kind.to_string())),
  }
}

/// Substitute all placeholders in a string using the provided resolver.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Placeholder(Placeholder::Stage) => result.push_str(resolver.resolve_stage()),
      Segment::Placeholder(Placeholder::Region) => result.push_str(resolver.resolve_region()),
      Segment::Placeholder(Placeholder::Env(name)) => result.push_str(&resolver.resolve_env(&name)?),
    }
  }

  Ok(result)
}
