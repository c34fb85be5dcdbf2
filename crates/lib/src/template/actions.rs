//! Action templates: local side effects run between remote stacks.
//!
//! An action template is an ordered list of actions plus named outputs. Each
//! output is either a literal or an attribute of one of the actions' results.
//! Values that are only known at apply time are written as references into
//! the apply context.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::TemplateError;

/// The `_type` marker of every action template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemplateMarker {
  #[default]
  ActionsTemplate,
}

/// A string known at build time, or a reference into the apply context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum ActionValue {
  Literal { value: String },
  Ref { name: String },
}

impl ActionValue {
  pub fn literal(value: impl Into<String>) -> Self {
    ActionValue::Literal { value: value.into() }
  }

  pub fn reference(name: impl Into<String>) -> Self {
    ActionValue::Ref { name: name.into() }
  }

  /// Resolve against `context`. Returns the missing name on failure.
  pub fn resolve<'a>(&'a self, context: &'a BTreeMap<String, String>) -> Result<&'a str, &'a str> {
    match self {
      ActionValue::Literal { value } => Ok(value),
      ActionValue::Ref { name } => context.get(name).map(String::as_str).ok_or(name.as_str()),
    }
  }
}

/// Where an action template output takes its value from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum OutputValue {
  Literal { value: String },
  GetAttr { action: String, attr: String },
}

/// Upload a packaged file from the build directory to the object store.
///
/// Produces the attributes `url` and `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPackage {
  pub name: String,
  pub bucket: ActionValue,
  pub key: ActionValue,
  /// Path relative to the build directory.
  pub filename: ActionValue,
}

/// Like [`UploadPackage`], but first adds a JSON entry holding selected
/// context values to a copy of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectContextAndUpload {
  pub name: String,
  pub bucket: ActionValue,
  pub key: ActionValue,
  pub filename: ActionValue,
  #[serde(default)]
  pub context_to_inject: BTreeMap<String, ActionValue>,
  #[serde(default = "default_context_destination")]
  pub context_destination: String,
}

fn default_context_destination() -> String {
  ".context".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Action {
  UploadPackage(UploadPackage),
  InjectContextAndUpload(InjectContextAndUpload),
}

impl Action {
  pub fn name(&self) -> &str {
    match self {
      Action::UploadPackage(a) => &a.name,
      Action::InjectContextAndUpload(a) => &a.name,
    }
  }

  /// Every value the action reads.
  pub fn values(&self) -> Vec<&ActionValue> {
    match self {
      Action::UploadPackage(a) => vec![&a.bucket, &a.key, &a.filename],
      Action::InjectContextAndUpload(a) => {
        let mut values = vec![&a.bucket, &a.key, &a.filename];
        values.extend(a.context_to_inject.values());
        values
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionTemplate {
  #[serde(rename = "_type")]
  pub marker: TemplateMarker,
  #[serde(default)]
  pub actions: Vec<Action>,
  #[serde(default)]
  pub outputs: BTreeMap<String, OutputValue>,
}

impl ActionTemplate {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append `action`. Action results are looked up by name, so names must be
  /// unique within a template.
  pub fn add(&mut self, action: Action) -> Result<(), TemplateError> {
    if self.actions.iter().any(|a| a.name() == action.name()) {
      return Err(TemplateError::DuplicateActionName(action.name().to_string()));
    }
    self.actions.push(action);
    Ok(())
  }

  /// Check a template read from disk for repeated action names.
  pub fn check_names(&self) -> Result<(), TemplateError> {
    let mut seen = BTreeSet::new();
    for action in &self.actions {
      if !seen.insert(action.name()) {
        return Err(TemplateError::DuplicateActionName(action.name().to_string()));
      }
    }
    Ok(())
  }

  pub fn add_output(&mut self, name: impl Into<String>, value: OutputValue) {
    self.outputs.insert(name.into(), value);
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }

  /// Context names the actions read.
  pub fn refs(&self) -> BTreeSet<&str> {
    self
      .actions
      .iter()
      .flat_map(Action::values)
      .filter_map(|v| match v {
        ActionValue::Ref { name } => Some(name.as_str()),
        ActionValue::Literal { .. } => None,
      })
      .collect()
  }
}
