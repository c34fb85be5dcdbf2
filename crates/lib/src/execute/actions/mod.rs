//! Running action templates.
//!
//! Every action returns a set of named attributes. Template outputs pick
//! literals or attributes of earlier actions and are merged into the apply
//! context by the caller.

pub mod upload;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::package::ObjectStore;
use crate::template::actions::{Action, ActionTemplate, OutputValue};

use super::context::ApplyContext;
use super::types::ApplyError;

pub use upload::{inject_and_upload, upload_package};

/// Attributes produced by one action.
pub type ActionResult = BTreeMap<String, String>;

/// What actions may touch.
pub struct ActionEnv<'a> {
  /// Directory the artifacts were read from; file names are relative to it.
  pub build_dir: &'a Path,
  pub region: &'a str,
  pub store: &'a dyn ObjectStore,
}

/// Run every action of `template` in order and compute its outputs.
///
/// Action names and all context references are checked before the first
/// action runs.
pub async fn run_actions(
  artifact: &str,
  template: &ActionTemplate,
  context: &ApplyContext,
  env: &ActionEnv<'_>,
) -> Result<BTreeMap<String, String>, ApplyError> {
  template.check_names()?;
  for action in &template.actions {
    for value in action.values() {
      if let Err(name) = value.resolve(context.values()) {
        return Err(ApplyError::MissingContext {
          artifact: artifact.to_string(),
          action: action.name().to_string(),
          name: name.to_string(),
        });
      }
    }
  }

  let mut results: BTreeMap<&str, ActionResult> = BTreeMap::new();
  for action in &template.actions {
    debug!(artifact, action = action.name(), "running action");
    let result = execute_action(action, context, env).await?;
    results.insert(action.name(), result);
  }

  let mut outputs = BTreeMap::new();
  for (output, value) in &template.outputs {
    let resolved = match value {
      OutputValue::Literal { value } => value.clone(),
      OutputValue::GetAttr { action, attr } => results
        .get(action.as_str())
        .and_then(|result| result.get(attr))
        .cloned()
        .ok_or_else(|| ApplyError::MissingActionOutput {
          artifact: artifact.to_string(),
          output: output.clone(),
          action: action.clone(),
          attr: attr.clone(),
        })?,
    };
    outputs.insert(output.clone(), resolved);
  }

  info!(artifact, actions = template.actions.len(), outputs = outputs.len(), "actions complete");
  Ok(outputs)
}

/// Run a single action against the current context.
pub async fn execute_action(
  action: &Action,
  context: &ApplyContext,
  env: &ActionEnv<'_>,
) -> Result<ActionResult, ApplyError> {
  match action {
    Action::UploadPackage(upload) => upload_package(upload, context, env).await,
    Action::InjectContextAndUpload(inject) => inject_and_upload(inject, context, env).await,
  }
}
