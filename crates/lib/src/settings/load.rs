//! Loading of `settings.yml` files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::SettingsError;

/// Resource sections shared by project and app settings.
///
/// Each section maps a resource name to its raw settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSections {
  #[serde(default)]
  pub lambdas: BTreeMap<String, serde_yaml::Value>,
  #[serde(default)]
  pub streams: BTreeMap<String, serde_yaml::Value>,
  #[serde(default)]
  pub extensions: BTreeMap<String, serde_yaml::Value>,
}

impl ResourceSections {
  /// Iterate sections as `(section name, resources)`.
  pub fn sections(&self) -> [(&'static str, &BTreeMap<String, serde_yaml::Value>); 3] {
    [
      ("lambdas", &self.lambdas),
      ("streams", &self.streams),
      ("extensions", &self.extensions),
    ]
  }

  /// Raw overrides declared for `name` in `section`, if any.
  pub fn lookup(&self, section: &str, name: &str) -> Option<&serde_yaml::Value> {
    self
      .sections()
      .into_iter()
      .find(|(s, _)| *s == section)
      .and_then(|(_, resources)| resources.get(name))
  }
}

/// An entry of the project's `apps` list.
///
/// Either a plain app name, or a single-key map from the app name to
/// overrides for the app's resources.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AppEntry {
  Name(String),
  WithOverrides(BTreeMap<String, ResourceSections>),
}

impl AppEntry {
  pub fn name(&self) -> Option<&str> {
    match self {
      AppEntry::Name(name) => Some(name),
      AppEntry::WithOverrides(map) if map.len() == 1 => map.keys().next().map(String::as_str),
      AppEntry::WithOverrides(_) => None,
    }
  }

  pub fn overrides(&self) -> Option<&ResourceSections> {
    match self {
      AppEntry::Name(_) => None,
      AppEntry::WithOverrides(map) => map.values().next(),
    }
  }
}

/// Root `settings.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectSettings {
  pub project: String,
  #[serde(default)]
  pub default_region: Option<String>,
  #[serde(default)]
  pub code_bucket: Option<String>,
  #[serde(default)]
  pub apps: Vec<AppEntry>,
  #[serde(default)]
  pub lambdas: BTreeMap<String, serde_yaml::Value>,
  #[serde(default)]
  pub streams: BTreeMap<String, serde_yaml::Value>,
  #[serde(default)]
  pub extensions: BTreeMap<String, serde_yaml::Value>,
}

impl ProjectSettings {
  /// Resources declared directly at project level.
  pub fn resources(&self) -> ResourceSections {
    ResourceSections {
      lambdas: self.lambdas.clone(),
      streams: self.streams.clone(),
      extensions: self.extensions.clone(),
    }
  }
}

/// An app's `settings.yml`.
pub type AppSettings = ResourceSections;

/// Load the root `settings.yml` of a project.
pub fn load_project_settings(path: &Path) -> Result<ProjectSettings, SettingsError> {
  let content = read(path)?;
  parse(path, &content)
}

/// Load an app's `settings.yml`. A missing or empty file declares nothing.
pub fn load_app_settings(path: &Path) -> Result<AppSettings, SettingsError> {
  if !path.exists() {
    debug!(path = %path.display(), "no app settings file");
    return Ok(AppSettings::default());
  }
  let content = read(path)?;
  if content.trim().is_empty() {
    return Ok(AppSettings::default());
  }
  parse(path, &content)
}

fn read(path: &Path) -> Result<String, SettingsError> {
  fs::read_to_string(path).map_err(|source| SettingsError::Read {
    path: path.to_path_buf(),
    source,
  })
}

fn parse<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, SettingsError> {
  serde_yaml::from_str(content).map_err(|e| SettingsError::Parse {
    path: path.to_path_buf(),
    message: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("settings.yml");
    fs::write(&path, content).unwrap();
    path
  }

  #[test]
  fn loads_project_settings() {
    let temp = TempDir::new().unwrap();
    let path = write(
      &temp,
      r#"
project: demo
default-region: eu-west-1
apps:
  - api
  - workers:
      lambdas:
        consumer:
          memory: 512
lambdas:
  hello:
    code: hello
"#,
    );

    let settings = load_project_settings(&path).unwrap();
    assert_eq!(settings.project, "demo");
    assert_eq!(settings.default_region.as_deref(), Some("eu-west-1"));
    assert_eq!(settings.apps.len(), 2);
    assert_eq!(settings.apps[0].name(), Some("api"));
    assert_eq!(settings.apps[1].name(), Some("workers"));
    let overrides = settings.apps[1].overrides().unwrap();
    assert!(overrides.lookup("lambdas", "consumer").is_some());
    assert!(settings.lambdas.contains_key("hello"));
  }

  #[test]
  fn unknown_project_keys_are_rejected() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "project: demo\nlambda:\n  x: {}\n");
    let err = load_project_settings(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Parse { .. }));
  }

  #[test]
  fn missing_project_file_is_a_read_error() {
    let temp = TempDir::new().unwrap();
    let err = load_project_settings(&temp.path().join("settings.yml")).unwrap_err();
    assert!(matches!(err, SettingsError::Read { .. }));
  }

  #[test]
  fn empty_app_settings_declare_nothing() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "\n");
    let settings = load_app_settings(&path).unwrap();
    assert!(settings.lambdas.is_empty());
  }
}
