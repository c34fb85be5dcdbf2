//! Wire types of the extension control protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ExtensionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
  Create,
  Update,
  Delete,
}

/// A lifecycle request sent by the provisioning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionRequest {
  pub request_type: RequestType,
  #[serde(rename = "ResponseURL")]
  pub response_url: String,
  pub stack_id: String,
  pub request_id: String,
  pub resource_type: String,
  pub logical_resource_id: String,
  /// Present on update and delete.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub physical_resource_id: Option<String>,
  #[serde(default)]
  pub resource_properties: BTreeMap<String, Value>,
  /// Present on update.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub old_resource_properties: Option<BTreeMap<String, Value>>,
}

impl ExtensionRequest {
  pub fn from_json(value: Value) -> Result<Self, ExtensionError> {
    serde_json::from_value(value).map_err(ExtensionError::Request)
  }

  pub fn property(&self, name: &str) -> Option<&Value> {
    self.resource_properties.get(name)
  }

  pub fn require_str(&self, name: &'static str) -> Result<&str, ExtensionError> {
    match self.property(name) {
      Some(Value::String(s)) => Ok(s),
      Some(other) => Err(ExtensionError::InvalidProperty {
        name,
        message: format!("expected a string, got {other}"),
      }),
      None => Err(ExtensionError::MissingProperty(name)),
    }
  }

  /// A non-negative integer property. The service sends every scalar as a
  /// string, so numeric strings are accepted.
  pub fn require_u64(&self, name: &'static str) -> Result<u64, ExtensionError> {
    let invalid = |message: String| ExtensionError::InvalidProperty { name, message };
    match self.property(name) {
      Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(format!("{n} is not a non-negative integer"))),
      Some(Value::String(s)) => s
        .trim()
        .parse()
        .map_err(|_| invalid(format!("'{s}' is not a non-negative integer"))),
      Some(other) => Err(invalid(format!("expected an integer, got {other}"))),
      None => Err(ExtensionError::MissingProperty(name)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
  Success,
  Failed,
}

/// The callback body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtensionResponse {
  pub status: ResponseStatus,
  pub reason: String,
  pub physical_resource_id: String,
  pub stack_id: String,
  pub request_id: String,
  pub logical_resource_id: String,
  pub data: BTreeMap<String, Value>,
}

/// What a handler reports back on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
  /// Overrides the physical id taken from the request.
  pub physical_resource_id: Option<String>,
  pub data: BTreeMap<String, Value>,
}

impl Outcome {
  pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.data.insert(key.into(), value.into());
    self
  }
}
