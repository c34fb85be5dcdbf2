//! Types for applying and deleting build artifacts.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::consts::{DEFAULT_POLL_INTERVAL, DEFAULT_STACK_TIMEOUT_MINUTES};
use crate::error::ErrorKind;
use crate::package::PackageError;
use crate::template::TemplateError;

use super::status::StackStatus;

/// Errors that can occur while applying or deleting artifacts.
#[derive(Debug, Error)]
pub enum ApplyError {
  /// An artifact could not be listed or read.
  #[error(transparent)]
  Template(#[from] TemplateError),

  /// Uploading a package failed.
  #[error(transparent)]
  Package(#[from] PackageError),

  /// A call to the remote stack service failed.
  #[error("{operation} of stack {stack} failed: {message}")]
  Remote {
    operation: &'static str,
    stack: String,
    message: String,
  },

  /// A declared template parameter has no default and no context value.
  #[error("{artifact}: parameter '{parameter}' has no value in the apply context")]
  MissingParameter { artifact: String, parameter: String },

  /// An action references a context value that does not exist.
  #[error("{artifact}: action '{action}' references unknown context value '{name}'")]
  MissingContext {
    artifact: String,
    action: String,
    name: String,
  },

  /// An action template output names an attribute no action produced.
  #[error("{artifact}: output '{output}' refers to missing attribute '{attr}' of action '{action}'")]
  MissingActionOutput {
    artifact: String,
    output: String,
    action: String,
    attr: String,
  },

  /// The stack is busy with another operation.
  #[error("stack {stack} is in progress ({status})")]
  StackInProgress { stack: String, status: StackStatus },

  /// The stack ended (or already was) in a failed state.
  #[error("stack {stack} is in a failed state ({status}){}", .reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
  StackTerminalFailure {
    stack: String,
    status: StackStatus,
    reason: Option<String>,
  },

  /// The stack did not settle within the time budget.
  #[error("stack {stack} did not settle within {}s (last status {status})", .waited.as_secs())]
  PollTimeout {
    stack: String,
    status: StackStatus,
    waited: Duration,
  },

  /// A stack vanished while it was expected to exist.
  #[error("stack {0} disappeared while waiting for it")]
  StackVanished(String),
}

impl ApplyError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApplyError::Template(e) => e.kind(),
      ApplyError::MissingParameter { .. } | ApplyError::MissingContext { .. } => ErrorKind::Validation,
      ApplyError::StackInProgress { .. } => ErrorKind::StackInProgress,
      ApplyError::StackTerminalFailure { .. } => ErrorKind::StackTerminalFailure,
      ApplyError::PollTimeout { .. } => ErrorKind::PollTimeout,
      _ => ErrorKind::Generic,
    }
  }
}

/// Deployment settings threaded through apply and delete.
#[derive(Debug, Clone)]
pub struct DeployConfig {
  /// Stage name, part of every stack name.
  pub stage: String,

  /// Region every remote call targets.
  pub region: String,

  /// Delay between two status polls.
  pub poll_interval: Duration,

  /// Overall budget for one stack operation.
  pub timeout: Duration,
}

impl DeployConfig {
  pub fn new(stage: impl Into<String>, region: impl Into<String>) -> Self {
    Self {
      stage: stage.into(),
      region: region.into(),
      poll_interval: DEFAULT_POLL_INTERVAL,
      timeout: Duration::from_secs(DEFAULT_STACK_TIMEOUT_MINUTES * 60),
    }
  }

  pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
    self.timeout = Duration::from_secs(minutes * 60);
    self
  }

  /// Name of the stack holding the artifact with `suffix`.
  pub fn stack_name(&self, project: &str, suffix: &str) -> String {
    format!("{}-{}-{}", self.stage, project, suffix.replace('_', "-"))
  }
}

/// What happened to one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
  Created { stack: String },
  Updated { stack: String },
  Unchanged { stack: String },
  ActionsRun { count: usize },
  Deleted { stack: String },
  WouldDelete { stack: String },
  Absent { stack: String },
  Skipped,
}

impl fmt::Display for StepOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StepOutcome::Created { stack } => write!(f, "created {stack}"),
      StepOutcome::Updated { stack } => write!(f, "updated {stack}"),
      StepOutcome::Unchanged { stack } => write!(f, "{stack} unchanged"),
      StepOutcome::ActionsRun { count } => write!(f, "ran {count} action(s)"),
      StepOutcome::Deleted { stack } => write!(f, "deleted {stack}"),
      StepOutcome::WouldDelete { stack } => write!(f, "would delete {stack}"),
      StepOutcome::Absent { stack } => write!(f, "{stack} does not exist"),
      StepOutcome::Skipped => write!(f, "skipped (no delete hook)"),
    }
  }
}

/// One processed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub artifact: String,
  pub outcome: StepOutcome,
}

/// Result of an apply or delete run.
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
  pub steps: Vec<Step>,

  /// Final apply context. Empty for delete.
  pub context: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stack_names_join_stage_project_and_suffix() {
    let config = DeployConfig::new("test", "eu-west-1");
    assert_eq!(config.stack_name("proj", "r"), "test-proj-r");
    assert_eq!(config.stack_name("proj", "p"), "test-proj-p");
  }

  #[test]
  fn timeout_is_configured_in_minutes() {
    let config = DeployConfig::new("dev", "eu-west-1").with_timeout_minutes(2);
    assert_eq!(config.timeout, Duration::from_secs(120));
    assert_eq!(DeployConfig::new("dev", "x").timeout, Duration::from_secs(900));
  }
}
