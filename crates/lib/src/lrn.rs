//! Logical Resource Names.
//!
//! An LRN is the only identifier that is stable across build and apply:
//!
//! ```text
//! {kind}:{app}:{name}[:{alias}]
//! ```
//!
//! `app` is empty for resources declared at the project level. The
//! provisioning identifier used inside templates is derived from the LRN alone,
//! so two templates built independently always agree on it.
//!
//! # Example
//!
//! ```
//! use stratus_lib::lrn::Lrn;
//!
//! let lrn: Lrn = "lambda::hello:current".parse().unwrap();
//! assert_eq!(lrn.app(), None);
//! assert_eq!(lrn.provisioning_id(), "LambdaHelloCurrent");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing an LRN.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LrnError {
  #[error("'{0}' is not a valid resource name: expected kind:app:name[:alias]")]
  Malformed(String),

  #[error("'{0}' is not a valid resource name: {1} must not be empty")]
  EmptySegment(String, &'static str),
}

/// A parsed Logical Resource Name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Lrn {
  kind: String,
  app: String,
  name: String,
  alias: Option<String>,
}

impl Lrn {
  /// Build an LRN for a resource declared at project level (`app` is `None`)
  /// or inside an app.
  pub fn new(kind: &str, app: Option<&str>, name: &str) -> Self {
    Self {
      kind: kind.to_string(),
      app: app.unwrap_or_default().to_string(),
      name: name.to_string(),
      alias: None,
    }
  }

  /// Returns a copy of this LRN pointing at `alias`.
  pub fn with_alias(&self, alias: &str) -> Self {
    Self {
      alias: Some(alias.to_string()),
      ..self.clone()
    }
  }

  /// Returns this LRN without its alias.
  pub fn base(&self) -> Self {
    Self {
      alias: None,
      ..self.clone()
    }
  }

  pub fn kind(&self) -> &str {
    &self.kind
  }

  pub fn app(&self) -> Option<&str> {
    if self.app.is_empty() { None } else { Some(&self.app) }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn alias(&self) -> Option<&str> {
    self.alias.as_deref()
  }

  /// The name a resource is known by inside its project: `app.name` or `name`.
  pub fn in_project_name(&self) -> String {
    match self.app() {
      Some(app) => format!("{}.{}", app, self.name),
      None => self.name.clone(),
    }
  }

  /// Derive the template identifier for this LRN.
  ///
  /// Pure function of the LRN: every segment is title-cased and every
  /// non-alphanumeric character is dropped.
  pub fn provisioning_id(&self) -> String {
    let mut segments = vec![self.kind.as_str(), self.app.as_str(), self.name.as_str()];
    if let Some(alias) = &self.alias {
      segments.push(alias);
    }
    template_name(&segments)
  }
}

impl fmt::Display for Lrn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}", self.kind, self.app, self.name)?;
    if let Some(alias) = &self.alias {
      write!(f, ":{}", alias)?;
    }
    Ok(())
  }
}

impl FromStr for Lrn {
  type Err = LrnError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = s.split(':').collect();
    let (kind, app, name, alias) = match parts.as_slice() {
      [kind, app, name] => (*kind, *app, *name, None),
      [kind, app, name, alias] => (*kind, *app, *name, Some(*alias)),
      _ => return Err(LrnError::Malformed(s.to_string())),
    };

    if kind.is_empty() {
      return Err(LrnError::EmptySegment(s.to_string(), "kind"));
    }
    if name.is_empty() {
      return Err(LrnError::EmptySegment(s.to_string(), "name"));
    }
    if alias.is_some_and(str::is_empty) {
      return Err(LrnError::EmptySegment(s.to_string(), "alias"));
    }

    Ok(Self {
      kind: kind.to_string(),
      app: app.to_string(),
      name: name.to_string(),
      alias: alias.map(str::to_string),
    })
  }
}

impl TryFrom<String> for Lrn {
  type Error = LrnError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Lrn> for String {
  fn from(value: Lrn) -> Self {
    value.to_string()
  }
}

/// Build a template-safe name out of free-form parts.
///
/// Each part is title-cased (the first letter of every run of letters is
/// upper-cased, the rest lower-cased) and everything that is not an ASCII
/// letter or digit is removed.
pub fn template_name(parts: &[&str]) -> String {
  let mut out = String::new();
  for part in parts {
    let mut previous_is_letter = false;
    for ch in part.chars() {
      if ch.is_alphabetic() {
        let cased: String = if previous_is_letter {
          ch.to_lowercase().collect()
        } else {
          ch.to_uppercase().collect()
        };
        out.extend(cased.chars().filter(char::is_ascii_alphanumeric));
        previous_is_letter = true;
      } else {
        if ch.is_ascii_digit() {
          out.push(ch);
        }
        previous_is_letter = false;
      }
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_project_level_name() {
    let lrn: Lrn = "lambda::hello".parse().unwrap();
    assert_eq!(lrn.kind(), "lambda");
    assert_eq!(lrn.app(), None);
    assert_eq!(lrn.name(), "hello");
    assert_eq!(lrn.alias(), None);
    assert_eq!(lrn.to_string(), "lambda::hello");
  }

  #[test]
  fn parses_alias() {
    let lrn: Lrn = "lambda:api:hello:current".parse().unwrap();
    assert_eq!(lrn.app(), Some("api"));
    assert_eq!(lrn.alias(), Some("current"));
    assert_eq!(lrn.base().to_string(), "lambda:api:hello");
  }

  #[test]
  fn rejects_malformed_names() {
    assert!(matches!("lambda".parse::<Lrn>(), Err(LrnError::Malformed(_))));
    assert!(matches!("a:b:c:d:e".parse::<Lrn>(), Err(LrnError::Malformed(_))));
    assert!(matches!(":app:name".parse::<Lrn>(), Err(LrnError::EmptySegment(_, "kind"))));
    assert!(matches!("lambda:app:".parse::<Lrn>(), Err(LrnError::EmptySegment(_, "name"))));
    assert!(matches!("lambda:app:x:".parse::<Lrn>(), Err(LrnError::EmptySegment(_, "alias"))));
  }

  #[test]
  fn provisioning_id_is_alphanumeric_title_case() {
    let lrn: Lrn = "lambda:my_app:say-hello:current".parse().unwrap();
    assert_eq!(lrn.provisioning_id(), "LambdaMyAppSayHelloCurrent");
  }

  #[test]
  fn provisioning_id_depends_only_on_the_name() {
    let a: Lrn = "stream:app:clicks".parse().unwrap();
    let b = Lrn::new("stream", Some("app"), "clicks");
    assert_eq!(a.provisioning_id(), b.provisioning_id());
  }

  #[test]
  fn template_name_follows_title_rules() {
    assert_eq!(template_name(&["s3version"]), "S3Version");
    assert_eq!(template_name(&["HELLO", "world"]), "HelloWorld");
    assert_eq!(template_name(&["code.bucket"]), "CodeBucket");
  }

  #[test]
  fn serde_uses_string_form() {
    let lrn: Lrn = "lambda::hello:current".parse().unwrap();
    let json = serde_json::to_string(&lrn).unwrap();
    assert_eq!(json, "\"lambda::hello:current\"");
    let back: Lrn = serde_json::from_str(&json).unwrap();
    assert_eq!(back, lrn);
  }
}
