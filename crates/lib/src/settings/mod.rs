//! Typed property bags for resources.
//!
//! Resource sections of `settings.yml` are free-form YAML. They are converted
//! once, at load time, into [`Settings`]: a map of [`SettingValue`]s where
//! `ref://` and `lrn://` strings have already been turned into references.
//! Every bag is validated against the schema of its resource kind before the
//! build starts.

mod load;
mod parameters;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorKind;
use crate::lrn::{Lrn, LrnError};
use crate::placeholder::PlaceholderError;

pub use load::{AppEntry, AppSettings, ProjectSettings, ResourceSections, load_app_settings, load_project_settings};
pub use parameters::{ParameterContext, load_parameters};

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("unknown protocol '{protocol}://' in value '{value}'")]
  UnknownProtocol { protocol: String, value: String },

  #[error(transparent)]
  InvalidLrn(#[from] LrnError),

  #[error("{owner}: unsupported value for '{key}': {reason}")]
  UnsupportedValue { owner: String, key: String, reason: String },

  #[error("{owner}: unknown setting '{key}' (allowed: {})", .allowed.join(", "))]
  UnknownKey {
    owner: String,
    key: String,
    allowed: Vec<String>,
  },

  #[error("{owner}: missing required setting '{key}'")]
  MissingKey { owner: String, key: String },

  #[error("{owner}: setting '{key}' must be {expected}")]
  InvalidType {
    owner: String,
    key: String,
    expected: &'static str,
  },

  #[error("{owner}: invalid value for '{key}': {message}")]
  InvalidValue { owner: String, key: String, message: String },

  #[error("{path}: parameter '{key}' {message}")]
  Parameter { path: PathBuf, key: String, message: String },

  #[error("{path}: parameter '{key}': {source}")]
  Placeholder {
    path: PathBuf,
    key: String,
    #[source]
    source: PlaceholderError,
  },
}

impl SettingsError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      SettingsError::UnknownKey { .. }
      | SettingsError::MissingKey { .. }
      | SettingsError::InvalidType { .. }
      | SettingsError::InvalidValue { .. } => ErrorKind::Validation,
      _ => ErrorKind::Configuration,
    }
  }
}

/// One value of a property bag.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
  String(String),
  Int(i64),
  Bool(bool),
  List(Vec<SettingValue>),
  Map(BTreeMap<String, SettingValue>),
  /// `ref://Name`: a raw template reference, filled from the apply context.
  Ref(String),
  /// `lrn://kind:app:name[:alias]`: another resource, resolved at build time.
  Lrn(Lrn),
}

impl SettingValue {
  /// Convert a YAML value, interpreting reference protocols in strings.
  pub fn from_yaml(owner: &str, key: &str, value: &serde_yaml::Value) -> Result<Self, SettingsError> {
    use serde_yaml::Value;

    let unsupported = |reason: &str| SettingsError::UnsupportedValue {
      owner: owner.to_string(),
      key: key.to_string(),
      reason: reason.to_string(),
    };

    match value {
      Value::Null => Err(unsupported("value is empty")),
      Value::Bool(b) => Ok(SettingValue::Bool(*b)),
      Value::Number(n) => match n.as_i64() {
        Some(i) => Ok(SettingValue::Int(i)),
        None => Ok(SettingValue::String(n.to_string())),
      },
      Value::String(s) => parse_protocol(s),
      Value::Sequence(items) => items
        .iter()
        .map(|item| SettingValue::from_yaml(owner, key, item))
        .collect::<Result<Vec<_>, _>>()
        .map(SettingValue::List),
      Value::Mapping(mapping) => {
        let mut map = BTreeMap::new();
        for (k, v) in mapping {
          let k = k.as_str().ok_or_else(|| unsupported("map keys must be strings"))?;
          map.insert(k.to_string(), SettingValue::from_yaml(owner, key, v)?);
        }
        Ok(SettingValue::Map(map))
      }
      Value::Tagged(_) => Err(unsupported("YAML tags are not supported")),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      SettingValue::String(s) => Some(s),
      _ => None,
    }
  }
}

/// Split `word://rest` strings into references. Unknown protocols are
/// rejected so a typo never reaches a template as a literal.
fn parse_protocol(s: &str) -> Result<SettingValue, SettingsError> {
  let Some((protocol, rest)) = s.split_once("://") else {
    return Ok(SettingValue::String(s.to_string()));
  };
  if protocol.is_empty() || !protocol.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Ok(SettingValue::String(s.to_string()));
  }

  match protocol {
    "ref" => Ok(SettingValue::Ref(rest.to_string())),
    "lrn" => Ok(SettingValue::Lrn(rest.parse()?)),
    _ => Err(SettingsError::UnknownProtocol {
      protocol: protocol.to_string(),
      value: s.to_string(),
    }),
  }
}

/// Keys accepted by one resource kind.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
  pub required: &'static [&'static str],
  pub optional: &'static [&'static str],
}

/// The property bag of one resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Settings {
  owner: String,
  values: BTreeMap<String, SettingValue>,
}

impl Settings {
  pub fn new(owner: impl Into<String>) -> Self {
    Self {
      owner: owner.into(),
      values: BTreeMap::new(),
    }
  }

  /// Convert the YAML mapping declared for `owner`.
  pub fn from_yaml(owner: impl Into<String>, value: &serde_yaml::Value) -> Result<Self, SettingsError> {
    let mut settings = Self::new(owner);
    match value {
      serde_yaml::Value::Null => {}
      serde_yaml::Value::Mapping(mapping) => {
        for (k, v) in mapping {
          let key = k.as_str().ok_or_else(|| SettingsError::UnsupportedValue {
            owner: settings.owner.clone(),
            key: format!("{k:?}"),
            reason: "setting names must be strings".to_string(),
          })?;
          let parsed = SettingValue::from_yaml(&settings.owner, key, v)?;
          settings.values.insert(key.to_string(), parsed);
        }
      }
      _ => {
        return Err(SettingsError::UnsupportedValue {
          owner: settings.owner,
          key: String::new(),
          reason: "resource settings must be a map".to_string(),
        });
      }
    }
    Ok(settings)
  }

  pub fn owner(&self) -> &str {
    &self.owner
  }

  pub fn insert(&mut self, key: impl Into<String>, value: SettingValue) {
    self.values.insert(key.into(), value);
  }

  /// Overlay `other` on top of these settings, key by key.
  pub fn merge(&mut self, other: Settings) {
    self.values.extend(other.values);
  }

  /// Check keys against `schema`: unknown keys and missing required keys are
  /// both rejected.
  pub fn validate(&self, schema: &Schema) -> Result<(), SettingsError> {
    for key in self.values.keys() {
      if !schema.required.contains(&key.as_str()) && !schema.optional.contains(&key.as_str()) {
        let mut allowed: Vec<String> = schema.required.iter().chain(schema.optional).map(|k| k.to_string()).collect();
        allowed.sort();
        return Err(SettingsError::UnknownKey {
          owner: self.owner.clone(),
          key: key.clone(),
          allowed,
        });
      }
    }
    for key in schema.required {
      if !self.values.contains_key(*key) {
        return Err(SettingsError::MissingKey {
          owner: self.owner.clone(),
          key: key.to_string(),
        });
      }
    }
    Ok(())
  }

  pub fn get(&self, key: &str) -> Option<&SettingValue> {
    self.values.get(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
    self.values.iter()
  }

  pub fn require(&self, key: &str) -> Result<&SettingValue, SettingsError> {
    self.get(key).ok_or_else(|| SettingsError::MissingKey {
      owner: self.owner.clone(),
      key: key.to_string(),
    })
  }

  pub fn get_str(&self, key: &str) -> Result<Option<&str>, SettingsError> {
    match self.get(key) {
      None => Ok(None),
      Some(SettingValue::String(s)) => Ok(Some(s)),
      Some(_) => Err(self.invalid_type(key, "a string")),
    }
  }

  pub fn require_str(&self, key: &str) -> Result<&str, SettingsError> {
    self.require(key)?;
    self.get_str(key).map(Option::unwrap_or_default)
  }

  pub fn get_int(&self, key: &str) -> Result<Option<i64>, SettingsError> {
    match self.get(key) {
      None => Ok(None),
      Some(SettingValue::Int(i)) => Ok(Some(*i)),
      Some(SettingValue::String(s)) => s
        .parse()
        .map(Some)
        .map_err(|_| self.invalid_type(key, "an integer")),
      Some(_) => Err(self.invalid_type(key, "an integer")),
    }
  }

  pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SettingsError> {
    match self.get(key) {
      None => Ok(None),
      Some(SettingValue::Bool(b)) => Ok(Some(*b)),
      Some(_) => Err(self.invalid_type(key, "a boolean")),
    }
  }

  pub fn get_map(&self, key: &str) -> Result<Option<&BTreeMap<String, SettingValue>>, SettingsError> {
    match self.get(key) {
      None => Ok(None),
      Some(SettingValue::Map(m)) => Ok(Some(m)),
      Some(_) => Err(self.invalid_type(key, "a map")),
    }
  }

  /// A setting naming another resource, either as `lrn://...` or as a bare
  /// in-project name which `default` turns into an LRN.
  pub fn get_lrn(&self, key: &str, default: impl FnOnce(&str) -> Lrn) -> Result<Option<Lrn>, SettingsError> {
    match self.get(key) {
      None => Ok(None),
      Some(SettingValue::Lrn(lrn)) => Ok(Some(lrn.clone())),
      Some(SettingValue::String(s)) => Ok(Some(default(s))),
      Some(_) => Err(self.invalid_type(key, "a resource name")),
    }
  }

  pub fn invalid_value(&self, key: &str, message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
      owner: self.owner.clone(),
      key: key.to_string(),
      message: message.into(),
    }
  }

  fn invalid_type(&self, key: &str, expected: &'static str) -> SettingsError {
    SettingsError::InvalidType {
      owner: self.owner.clone(),
      key: key.to_string(),
      expected,
    }
  }
}
