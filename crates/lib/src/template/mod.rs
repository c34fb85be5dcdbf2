//! Template documents and their on-disk artifacts.
//!
//! Two kinds of documents flow from build to apply:
//! - [`native::NativeTemplate`]: sent as-is to the remote stack service
//! - [`actions::ActionTemplate`]: local actions run by the orchestrator
//!
//! Which kind a stage produces is fixed by the stage itself.

pub mod actions;
pub mod artifact;
pub mod expr;
pub mod native;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorKind;

pub use actions::ActionTemplate;
pub use artifact::{Artifact, Document};
pub use expr::Expr;
pub use native::NativeTemplate;

#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("logical id '{0}' is declared twice in the same template")]
  DuplicateLogicalId(String),

  #[error("action '{0}' is declared twice in the same template")]
  DuplicateActionName(String),

  #[error("no build found at {0}")]
  BuildNotPerformed(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid template {path}: {message}")]
  Parse { path: PathBuf, message: String },

  #[error("{path}: unknown stage suffix '{suffix}'")]
  UnknownStage { path: PathBuf, suffix: String },

  #[error("{path}: expected a {expected} template")]
  KindMismatch { path: PathBuf, expected: StageKind },
}

impl TemplateError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      TemplateError::DuplicateLogicalId(_) | TemplateError::DuplicateActionName(_) => ErrorKind::DuplicateName,
      TemplateError::BuildNotPerformed(_) => ErrorKind::BuildNotPerformed,
      _ => ErrorKind::Generic,
    }
  }
}

/// What a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
  Native,
  Actions,
}

impl fmt::Display for StageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StageKind::Native => write!(f, "native"),
      StageKind::Actions => write!(f, "actions"),
    }
  }
}

/// Build stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemplateStage {
  PreProject,
  Project,
  PreResources,
  Resources,
  PostResources,
}

impl TemplateStage {
  pub const ALL: [TemplateStage; 5] = [
    TemplateStage::PreProject,
    TemplateStage::Project,
    TemplateStage::PreResources,
    TemplateStage::Resources,
    TemplateStage::PostResources,
  ];

  pub fn suffix(self) -> &'static str {
    match self {
      TemplateStage::PreProject => "pr_p",
      TemplateStage::Project => "p",
      TemplateStage::PreResources => "pr_r",
      TemplateStage::Resources => "r",
      TemplateStage::PostResources => "ps_r",
    }
  }

  pub fn from_suffix(suffix: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.suffix() == suffix)
  }

  pub fn kind(self) -> StageKind {
    match self {
      TemplateStage::Project | TemplateStage::Resources => StageKind::Native,
      _ => StageKind::Actions,
    }
  }
}

impl fmt::Display for TemplateStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TemplateStage::PreProject => "pre_project",
      TemplateStage::Project => "project",
      TemplateStage::PreResources => "pre_resources",
      TemplateStage::Resources => "resources",
      TemplateStage::PostResources => "post_resources",
    };
    f.write_str(name)
  }
}
