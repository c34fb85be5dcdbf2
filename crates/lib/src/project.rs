//! Project loading.
//!
//! A project is a directory with a root `settings.yml`, optional app
//! directories (each with its own `settings.yml`) and optional parameter
//! files. Loading reads every settings file, validates every resource against
//! the schema of its kind and registers every resource name.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::build::adapters;
use crate::consts::{BUILD_DIR, SETTINGS_FILENAME};
use crate::error::Error;
use crate::lrn::Lrn;
use crate::registry::Registry;
use crate::settings::{
  ProjectSettings, ResourceSections, Settings, SettingsError, load_app_settings, load_project_settings,
};

/// Kinds of resource a project can declare, in the order their hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
  Lambda,
  Stream,
  Extension,
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 3] = [ResourceKind::Lambda, ResourceKind::Stream, ResourceKind::Extension];

  /// Kind segment of LRNs of this kind.
  pub fn as_str(self) -> &'static str {
    match self {
      ResourceKind::Lambda => "lambda",
      ResourceKind::Stream => "stream",
      ResourceKind::Extension => "extension",
    }
  }

  /// Settings section declaring resources of this kind.
  pub fn section(self) -> &'static str {
    match self {
      ResourceKind::Lambda => "lambdas",
      ResourceKind::Stream => "streams",
      ResourceKind::Extension => "extensions",
    }
  }

  pub fn from_section(section: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.section() == section)
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One declared resource.
#[derive(Debug, Clone)]
pub struct Resource {
  pub lrn: Lrn,
  pub kind: ResourceKind,
  pub settings: Settings,
  /// Directory relative paths in the settings are resolved against.
  pub root: PathBuf,
}

impl Resource {
  pub fn name(&self) -> &str {
    self.lrn.name()
  }

  pub fn app(&self) -> Option<&str> {
    self.lrn.app()
  }

  /// LRN of a resource of `kind` named `name` in the same app as this one.
  pub fn sibling(&self, kind: ResourceKind, name: &str) -> Lrn {
    Lrn::new(kind.as_str(), self.app(), name)
  }
}

/// A loaded project.
#[derive(Debug)]
pub struct Project {
  pub name: String,
  pub root: PathBuf,
  pub settings: ProjectSettings,
  /// Every resource, sorted by LRN.
  pub resources: Vec<Arc<Resource>>,
  pub registry: Registry<Arc<Resource>>,
}

impl Project {
  /// Load the project rooted at `root`.
  pub fn load(root: &Path) -> Result<Self, Error> {
    let settings = load_project_settings(&root.join(SETTINGS_FILENAME))?;
    validate_project_name(&settings.project)?;

    let mut resources = collect(root, None, &settings.resources(), None)?;

    for app in &settings.apps {
      let name = app.name().ok_or_else(|| SettingsError::InvalidValue {
        owner: "project".to_string(),
        key: "apps".to_string(),
        message: "each app entry must be a name or a single-key map".to_string(),
      })?;
      let dir = root.join(name);
      if !dir.is_dir() {
        return Err(
          SettingsError::InvalidValue {
            owner: "project".to_string(),
            key: "apps".to_string(),
            message: format!("app directory {} does not exist", dir.display()),
          }
          .into(),
        );
      }
      let app_settings = load_app_settings(&dir.join(SETTINGS_FILENAME))?;
      debug!(app = name, "loading app");
      resources.extend(collect(&dir, Some(name), &app_settings, app.overrides())?);
    }

    resources.sort_by(|a, b| a.lrn.cmp(&b.lrn));

    let mut registry = Registry::new();
    for resource in &resources {
      let adapter = adapters::adapter(resource.kind);
      resource.settings.validate(&adapter.schema())?;
      for lrn in adapter.names(resource) {
        let id = lrn.provisioning_id();
        registry.register(lrn, id, Arc::clone(resource))?;
      }
    }

    info!(project = %settings.project, resources = resources.len(), "loaded project");
    Ok(Self {
      name: settings.project.clone(),
      root: root.to_path_buf(),
      settings,
      resources,
      registry,
    })
  }

  pub fn build_dir(&self) -> PathBuf {
    self.root.join(BUILD_DIR)
  }

  /// Resources of one kind, sorted by LRN.
  pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Arc<Resource>> {
    self.resources.iter().filter(move |r| r.kind == kind)
  }

  pub fn default_region(&self) -> Option<&str> {
    self.settings.default_region.as_deref()
  }
}

fn collect(
  root: &Path,
  app: Option<&str>,
  sections: &ResourceSections,
  overrides: Option<&ResourceSections>,
) -> Result<Vec<Arc<Resource>>, Error> {
  let mut out = Vec::new();

  if let Some(overrides) = overrides {
    for (section, declared) in overrides.sections() {
      if let Some(name) = declared.keys().find(|name| sections.lookup(section, name).is_none()) {
        return Err(
          SettingsError::InvalidValue {
            owner: format!("app {}", app.unwrap_or_default()),
            key: format!("{section}.{name}"),
            message: "override for a resource the app does not declare".to_string(),
          }
          .into(),
        );
      }
    }
  }

  for (section, declared) in sections.sections() {
    let Some(kind) = ResourceKind::from_section(section) else {
      continue;
    };
    for (name, raw) in declared {
      let lrn = Lrn::new(kind.as_str(), app, name);
      let mut settings = Settings::from_yaml(format!("{kind} {}", lrn.in_project_name()), raw)?;
      if let Some(patch) = overrides.and_then(|o| o.lookup(section, name)) {
        settings.merge(Settings::from_yaml(settings.owner().to_string(), patch)?);
      }
      out.push(Arc::new(Resource {
        lrn,
        kind,
        settings,
        root: root.to_path_buf(),
      }));
    }
  }

  Ok(out)
}

/// Project names end up in stack names, so they are restricted to what the
/// remote service accepts there.
fn validate_project_name(name: &str) -> Result<(), SettingsError> {
  let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
  if valid {
    Ok(())
  } else {
    Err(SettingsError::InvalidValue {
      owner: "project".to_string(),
      key: "project".to_string(),
      message: format!("'{name}' must start with a letter and contain only letters, digits and '-'"),
    })
  }
}
