//! The apply context: a flat string map threaded from artifact to artifact.

use std::collections::BTreeMap;

use tracing::debug;

use crate::template::NativeTemplate;

use super::types::ApplyError;

/// Values known so far during one apply run.
///
/// Seeded with `Stage`, `Region` and the parameters files; every applied
/// artifact merges its outputs in. Later writes win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyContext {
  values: BTreeMap<String, String>,
}

impl ApplyContext {
  pub fn seed(stage: &str, region: &str, parameters: BTreeMap<String, String>) -> Self {
    let mut context = Self::default();
    context.set("Stage", stage);
    context.set("Region", region);
    context.merge(parameters);
    context
  }

  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();
    if let Some(previous) = self.values.get(&key)
      && *previous != value
    {
      debug!(key = %key, "overwriting context value");
    }
    self.values.insert(key, value);
  }

  pub fn merge(&mut self, values: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in values {
      self.set(key, value);
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  pub fn values(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  pub fn into_values(self) -> BTreeMap<String, String> {
    self.values
  }

  /// Parameter values for `template`: the context entries whose keys it
  /// declares. A declared parameter without default must be present.
  pub fn parameters_for(
    &self,
    artifact: &str,
    template: &NativeTemplate,
  ) -> Result<BTreeMap<String, String>, ApplyError> {
    if let Some(missing) = template.required_parameters().find(|name| !self.values.contains_key(*name)) {
      return Err(ApplyError::MissingParameter {
        artifact: artifact.to_string(),
        parameter: missing.to_string(),
      });
    }

    Ok(
      template
        .parameters
        .keys()
        .filter_map(|name| self.values.get(name).map(|value| (name.clone(), value.clone())))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use crate::template::native::Parameter;

  #[test]
  fn seed_contains_stage_region_and_parameters() {
    let context = ApplyContext::seed(
      "dev",
      "eu-west-1",
      BTreeMap::from([("Vpc".to_string(), "vpc-1".to_string())]),
    );
    assert_eq!(context.get("Stage"), Some("dev"));
    assert_eq!(context.get("Region"), Some("eu-west-1"));
    assert_eq!(context.get("Vpc"), Some("vpc-1"));
  }

  #[test]
  fn last_write_wins() {
    let mut context = ApplyContext::default();
    context.set("Url", "a");
    context.merge([("Url".to_string(), "b".to_string())]);
    assert_eq!(context.get("Url"), Some("b"));
  }

  #[test]
  fn parameters_are_filtered_to_declared_names() {
    let mut template = NativeTemplate::new();
    template.add_parameter("Stage", Parameter::string());
    template.add_parameter(
      "Memory",
      Parameter {
        default: Some("128".to_string()),
        ..Parameter::string()
      },
    );

    let context = ApplyContext::seed("dev", "eu-west-1", BTreeMap::new());
    let parameters = context.parameters_for("0001_p.json", &template).unwrap();
    assert_eq!(parameters, BTreeMap::from([("Stage".to_string(), "dev".to_string())]));
  }

  #[test]
  fn missing_required_parameter_is_a_validation_error() {
    let mut template = NativeTemplate::new();
    template.add_parameter("CodeBucket", Parameter::string());

    let err = ApplyContext::default().parameters_for("0003_r.json", &template).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("CodeBucket"));
  }
}
