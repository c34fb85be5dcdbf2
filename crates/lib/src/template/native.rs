//! Native provisioning templates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TemplateError;
use super::expr::Expr;

const FORMAT_VERSION: &str = "2010-09-09";

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
  #[serde(rename = "Type")]
  pub param_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl Parameter {
  pub fn string() -> Self {
    Self {
      param_type: "String".to_string(),
      default: None,
      description: None,
    }
  }
}

/// A resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
  #[serde(rename = "Type")]
  pub resource_type: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub properties: BTreeMap<String, Expr>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<String>,
}

impl Resource {
  pub fn new(resource_type: impl Into<String>) -> Self {
    Self {
      resource_type: resource_type.into(),
      properties: BTreeMap::new(),
      depends_on: Vec::new(),
    }
  }

  pub fn property(mut self, key: impl Into<String>, value: impl Into<Expr>) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
    self.depends_on.push(logical_id.into());
    self
  }
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
  pub value: Expr,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// A template for the remote provisioning service.
///
/// Maps are ordered so serialization is byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NativeTemplate {
  #[serde(rename = "AWSTemplateFormatVersion", default = "format_version")]
  pub format_version: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub parameters: BTreeMap<String, Parameter>,
  #[serde(default)]
  pub resources: BTreeMap<String, Resource>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub outputs: BTreeMap<String, Output>,
}

fn format_version() -> String {
  FORMAT_VERSION.to_string()
}

impl Default for NativeTemplate {
  fn default() -> Self {
    Self {
      format_version: format_version(),
      parameters: BTreeMap::new(),
      resources: BTreeMap::new(),
      outputs: BTreeMap::new(),
    }
  }
}

impl NativeTemplate {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare a parameter. Declaring the same name twice keeps the first one.
  pub fn add_parameter(&mut self, name: impl Into<String>, parameter: Parameter) {
    self.parameters.entry(name.into()).or_insert(parameter);
  }

  pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<(), TemplateError> {
    let logical_id = logical_id.into();
    if self.resources.contains_key(&logical_id) {
      return Err(TemplateError::DuplicateLogicalId(logical_id));
    }
    self.resources.insert(logical_id, resource);
    Ok(())
  }

  pub fn add_output(&mut self, name: impl Into<String>, value: Expr) -> Result<(), TemplateError> {
    let name = name.into();
    if self.outputs.contains_key(&name) {
      return Err(TemplateError::DuplicateLogicalId(name));
    }
    self.outputs.insert(name, Output { value, description: None });
    Ok(())
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty() && self.outputs.is_empty()
  }

  /// Merge another template into this one. Logical ids must not collide.
  pub fn extend(&mut self, other: NativeTemplate) -> Result<(), TemplateError> {
    for (name, parameter) in other.parameters {
      self.add_parameter(name, parameter);
    }
    for (id, resource) in other.resources {
      self.add_resource(id, resource)?;
    }
    for (name, output) in other.outputs {
      self.add_output(name, output.value)?;
    }
    Ok(())
  }

  /// Parameters without a default value.
  pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
    self
      .parameters
      .iter()
      .filter(|(_, p)| p.default.is_none())
      .map(|(name, _)| name.as_str())
  }

  /// Promote every unresolved `Ref` to a `String` parameter.
  ///
  /// A reference is unresolved when it names neither a parameter nor a
  /// resource of this template and is not a provider pseudo parameter
  /// (`AWS::*`). Returns the promoted names.
  pub fn promote_forward_refs(&mut self) -> Vec<String> {
    let mut referenced = BTreeSet::new();
    for resource in self.resources.values() {
      for value in resource.properties.values() {
        referenced.extend(value.refs().into_iter().map(str::to_string));
      }
    }
    for output in self.outputs.values() {
      referenced.extend(output.value.refs().into_iter().map(str::to_string));
    }

    let promoted: Vec<String> = referenced
      .into_iter()
      .filter(|name| {
        !name.starts_with("AWS::") && !self.parameters.contains_key(name) && !self.resources.contains_key(name)
      })
      .collect();

    for name in &promoted {
      debug!(parameter = %name, "promoting forward reference to parameter");
      self.parameters.insert(name.clone(), Parameter::string());
    }
    promoted
  }
}
