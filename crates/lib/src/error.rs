//! Crate-level error aggregation.
//!
//! Every module owns a `thiserror` enum. [`Error`] wraps them so callers can
//! map any failure to a process exit code and a short hint.

use thiserror::Error;

use crate::build::BuildError;
use crate::execute::ApplyError;
use crate::extension::ExtensionError;
use crate::invoke::InvokeError;
use crate::lrn::LrnError;
use crate::package::PackageError;
use crate::registry::RegistryError;
use crate::settings::SettingsError;
use crate::template::TemplateError;

/// Category of a failure, which decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Generic,
  Configuration,
  Validation,
  NotFound,
  DuplicateName,
  BuildNotPerformed,
  StackTerminalFailure,
  StackInProgress,
  PollTimeout,
}

impl ErrorKind {
  pub fn exit_code(self) -> i32 {
    match self {
      ErrorKind::Generic => 1,
      ErrorKind::Configuration => 2,
      ErrorKind::Validation => 3,
      ErrorKind::NotFound => 4,
      ErrorKind::DuplicateName => 8,
      ErrorKind::BuildNotPerformed => 9,
      ErrorKind::StackTerminalFailure => 10,
      ErrorKind::StackInProgress => 14,
      ErrorKind::PollTimeout => 15,
    }
  }

  pub fn hint(self) -> &'static str {
    match self {
      ErrorKind::Generic => "an unexpected error occurred",
      ErrorKind::Configuration => "check settings.yml and the parameter files",
      ErrorKind::Validation => "a resource or parameter value is invalid",
      ErrorKind::NotFound => "a referenced resource does not exist",
      ErrorKind::DuplicateName => "two resources share the same name",
      ErrorKind::BuildNotPerformed => "run `stratus build` before applying",
      ErrorKind::StackTerminalFailure => "the stack is in a failed state; fix or delete it before applying again",
      ErrorKind::StackInProgress => "another operation is running on the stack; wait for it to finish",
      ErrorKind::PollTimeout => "the stack did not settle in time; raise --cf-timeout or check the console",
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Lrn(#[from] LrnError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Package(#[from] PackageError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error(transparent)]
  Apply(#[from] ApplyError),

  #[error(transparent)]
  Extension(#[from] ExtensionError),

  #[error(transparent)]
  Invoke(#[from] InvokeError),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Lrn(_) => ErrorKind::Configuration,
      Error::Registry(e) => e.kind(),
      Error::Settings(e) => e.kind(),
      Error::Package(_) => ErrorKind::Generic,
      Error::Template(e) => e.kind(),
      Error::Build(e) => e.kind(),
      Error::Apply(e) => e.kind(),
      Error::Extension(e) => e.kind(),
      Error::Invoke(e) => e.kind(),
    }
  }

  pub fn exit_code(&self) -> i32 {
    self.kind().exit_code()
  }

  pub fn hint(&self) -> &'static str {
    self.kind().hint()
  }
}

impl RegistryError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      RegistryError::DuplicateName(_) | RegistryError::DuplicateId { .. } => ErrorKind::DuplicateName,
      RegistryError::NotFound { .. } => ErrorKind::NotFound,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
