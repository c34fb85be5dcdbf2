use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ErrorKind;
use crate::package::PackageError;
use crate::project::Project;
use crate::registry::RegistryError;
use crate::settings::SettingsError;
use crate::template::{ActionTemplate, NativeTemplate, TemplateError, TemplateStage};

/// Errors raised while building a project.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A resource's settings are invalid.
  #[error(transparent)]
  Settings(#[from] SettingsError),

  /// A referenced resource name is unknown.
  #[error(transparent)]
  Registry(#[from] RegistryError),

  /// A template could not be assembled or written.
  #[error(transparent)]
  Template(#[from] TemplateError),

  /// Packaging code failed.
  #[error(transparent)]
  Package(#[from] PackageError),

  /// The build directory could not be prepared.
  #[error("failed to prepare {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// An adapter wrote the wrong kind of document for a stage.
  #[error("stage {stage} produced content of the wrong kind")]
  StageKindMismatch { stage: TemplateStage },
}

impl BuildError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      BuildError::Settings(e) => e.kind(),
      BuildError::Registry(e) => e.kind(),
      BuildError::Template(e) => e.kind(),
      _ => ErrorKind::Generic,
    }
  }
}

/// What the hooks of one stage contribute.
///
/// Only the half matching the stage kind may be filled.
#[derive(Debug, Default)]
pub struct StageOutput {
  pub native: NativeTemplate,
  pub actions: ActionTemplate,
}

/// Read-only view adapters get of the build.
pub struct BuildContext<'a> {
  pub project: &'a Project,
  pub build_dir: &'a Path,
}

impl BuildContext<'_> {
  /// Path of a package file, relative to the build directory.
  pub fn package_rel_path(&self, key: &str) -> String {
    format!("{}/{}", crate::consts::CODE_DIR, key)
  }
}

/// Summary of a finished build.
#[derive(Debug, Default)]
pub struct BuildReport {
  /// Artifacts written, in sequence order.
  pub artifacts: Vec<PathBuf>,
}
