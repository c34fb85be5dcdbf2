//! Local runs of a function through its `local-command`.
//!
//! The command runs through the system shell in the function's code
//! directory, with the event JSON on stdin. Nothing remote is touched.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::build::BuildError;
use crate::build::adapters::LambdaAdapter;
use crate::error::ErrorKind;
use crate::lrn::Lrn;
use crate::project::{Project, ResourceKind};
use crate::registry::RegistryError;
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("{0} is not a lambda")]
  NotALambda(Lrn),

  #[error("{0} has no local-command")]
  NoLocalCommand(Lrn),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Settings(#[from] SettingsError),

  #[error(transparent)]
  Build(#[from] BuildError),

  #[error("failed to read event {path}: {source}")]
  ReadEvent {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("event {path} is not valid JSON: {message}")]
  InvalidEvent { path: PathBuf, message: String },

  #[error("failed to run `{command}`: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("`{command}` exited with {}: {stderr}", .code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".to_string()))]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

impl InvokeError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      InvokeError::NotALambda(_) | InvokeError::NoLocalCommand(_) | InvokeError::InvalidEvent { .. } => {
        ErrorKind::Validation
      }
      InvokeError::Registry(e) => e.kind(),
      InvokeError::Settings(e) => e.kind(),
      InvokeError::Build(e) => e.kind(),
      _ => ErrorKind::Generic,
    }
  }
}

/// Read the event file, or an empty object without one.
pub fn load_event(path: Option<&Path>) -> Result<Value, InvokeError> {
  let Some(path) = path else {
    return Ok(Value::Object(Default::default()));
  };
  let body = std::fs::read_to_string(path).map_err(|source| InvokeError::ReadEvent {
    path: path.to_path_buf(),
    source,
  })?;
  serde_json::from_str(&body).map_err(|e| InvokeError::InvalidEvent {
    path: path.to_path_buf(),
    message: e.to_string(),
  })
}

/// Run the `local-command` of the lambda `lrn` with `event` and return its
/// trimmed stdout.
pub async fn run_local(project: &Project, lrn: &Lrn, event: &Value) -> Result<String, InvokeError> {
  if lrn.kind() != ResourceKind::Lambda.as_str() {
    return Err(InvokeError::NotALambda(lrn.clone()));
  }
  let resource = project.registry.resolve_object(&lrn.base())?;
  let command = resource
    .settings
    .get_str("local-command")?
    .ok_or_else(|| InvokeError::NoLocalCommand(lrn.clone()))?
    .to_string();

  let code = LambdaAdapter::code_path(resource)?;
  let working_dir = if code.is_dir() {
    code
  } else {
    code.parent().map(Path::to_path_buf).unwrap_or_else(|| resource.root.clone())
  };

  info!(lrn = %lrn, command = %command, "running function locally");
  let (shell, flag) = shell();
  let mut child = Command::new(shell)
    .arg(flag)
    .arg(&command)
    .current_dir(&working_dir)
    .env("STRATUS_FUNCTION", lrn.to_string())
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|source| InvokeError::Spawn {
      command: command.clone(),
      source,
    })?;

  let payload = event.to_string();
  if let Some(mut stdin) = child.stdin.take() {
    // A command that ignores its input may exit before reading it all.
    if let Err(e) = stdin.write_all(payload.as_bytes()).await {
      debug!(error = %e, "command closed stdin early");
    }
  }

  let output = child.wait_with_output().await.map_err(|source| InvokeError::Spawn {
    command: command.clone(),
    source,
  })?;

  if !output.status.success() {
    return Err(InvokeError::Failed {
      command,
      code: output.status.code(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  debug!(bytes = stdout.len(), "command output");
  Ok(stdout)
}

#[cfg(unix)]
fn shell() -> (&'static str, &'static str) {
  ("/bin/sh", "-c")
}

#[cfg(windows)]
fn shell() -> (&'static str, &'static str) {
  ("cmd.exe", "/C")
}
