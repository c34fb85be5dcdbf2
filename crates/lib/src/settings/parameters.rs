//! Stage parameter files.
//!
//! `parameters/common.yml` is read first, then `parameters/<stage>.yml`;
//! a key in the stage file replaces the common one. Both files are flat maps
//! of scalars and are optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::SettingsError;
use crate::consts::{COMMON_PARAMETERS, PARAMETERS_DIR};
use crate::placeholder::{self, PlaceholderError, Resolver};

/// The deployment parameter files are loaded for.
#[derive(Debug, Clone)]
pub struct ParameterContext {
  pub stage: String,
  pub region: String,
}

impl Resolver for ParameterContext {
  fn resolve_stage(&self) -> &str {
    &self.stage
  }

  fn resolve_region(&self) -> &str {
    &self.region
  }

  fn resolve_env(&self, name: &str) -> Result<String, PlaceholderError> {
    std::env::var(name).map_err(|_| PlaceholderError::UnresolvedEnv(name.to_string()))
  }
}

/// Load and merge the parameter files of `project_root` for `ctx.stage`.
pub fn load_parameters(project_root: &Path, ctx: &ParameterContext) -> Result<BTreeMap<String, String>, SettingsError> {
  let dir = project_root.join(PARAMETERS_DIR);
  let mut parameters = BTreeMap::new();

  for name in [COMMON_PARAMETERS, ctx.stage.as_str()] {
    let path = dir.join(format!("{name}.yml"));
    if !path.is_file() {
      debug!(path = %path.display(), "parameter file not present");
      continue;
    }
    let loaded = load_file(&path, ctx)?;
    debug!(path = %path.display(), count = loaded.len(), "loaded parameters");
    parameters.extend(loaded);
  }

  Ok(parameters)
}

fn load_file(path: &Path, ctx: &ParameterContext) -> Result<BTreeMap<String, String>, SettingsError> {
  let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  if content.trim().is_empty() {
    return Ok(BTreeMap::new());
  }

  let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(&content).map_err(|e| SettingsError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })?;

  let mut out = BTreeMap::new();
  for (key, value) in raw {
    let value = scalar(path, &key, value)?;
    let value = placeholder::substitute(&value, ctx).map_err(|source| SettingsError::Placeholder {
      path: path.to_path_buf(),
      key: key.clone(),
      source,
    })?;
    out.insert(key, value);
  }
  Ok(out)
}

fn scalar(path: &Path, key: &str, value: serde_yaml::Value) -> Result<String, SettingsError> {
  let err = |message: &str| SettingsError::Parameter {
    path: PathBuf::from(path),
    key: key.to_string(),
    message: message.to_string(),
  };
  match value {
    serde_yaml::Value::String(s) => Ok(s),
    serde_yaml::Value::Number(n) => Ok(n.to_string()),
    serde_yaml::Value::Bool(b) => Ok(b.to_string()),
    serde_yaml::Value::Null => Err(err("has no value")),
    _ => Err(err("must be a string, number or boolean")),
  }
}
