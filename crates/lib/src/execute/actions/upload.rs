//! Package upload actions.

use std::collections::BTreeMap;

use tracing::debug;

use crate::package::{self, PackageError};
use crate::template::actions::{ActionValue, InjectContextAndUpload, UploadPackage};

use crate::execute::context::ApplyContext;
use crate::execute::types::ApplyError;
use super::{ActionEnv, ActionResult};

/// Public URL of an object.
pub fn object_url(region: &str, bucket: &str, key: &str) -> String {
  format!("https://s3.{region}.amazonaws.com/{bucket}/{key}")
}

fn resolve(value: &ActionValue, context: &ApplyContext, action: &str) -> Result<String, ApplyError> {
  value
    .resolve(context.values())
    .map(str::to_string)
    .map_err(|name| ApplyError::MissingContext {
      artifact: String::new(),
      action: action.to_string(),
      name: name.to_string(),
    })
}

fn result(env: &ActionEnv<'_>, bucket: &str, key: &str, version: String) -> ActionResult {
  BTreeMap::from([
    ("url".to_string(), object_url(env.region, bucket, key)),
    ("version".to_string(), version),
  ])
}

/// Upload a package from the build directory.
///
/// Attributes: `url` and `version`.
pub async fn upload_package(
  action: &UploadPackage,
  context: &ApplyContext,
  env: &ActionEnv<'_>,
) -> Result<ActionResult, ApplyError> {
  let bucket = resolve(&action.bucket, context, &action.name)?;
  let key = resolve(&action.key, context, &action.name)?;
  let path = env.build_dir.join(resolve(&action.filename, context, &action.name)?);

  let digest = package::digest(&path)?;
  let uploaded = package::upload(env.store, &path, &bucket, &key, &digest).await?;
  Ok(result(env, &bucket, &key, uploaded.version_id))
}

/// Upload a package after adding the selected context values to it.
///
/// The injected copy lives in a temporary file; the build directory is left
/// untouched so a rebuild stays byte-identical.
pub async fn inject_and_upload(
  action: &InjectContextAndUpload,
  context: &ApplyContext,
  env: &ActionEnv<'_>,
) -> Result<ActionResult, ApplyError> {
  let bucket = resolve(&action.bucket, context, &action.name)?;
  let key = resolve(&action.key, context, &action.name)?;
  let source = env.build_dir.join(resolve(&action.filename, context, &action.name)?);

  let mut injected = BTreeMap::new();
  for (name, value) in &action.context_to_inject {
    injected.insert(name.clone(), resolve(value, context, &action.name)?);
  }

  let staged = tempfile::Builder::new()
    .prefix("stratus-")
    .suffix(".zip")
    .tempfile()
    .map_err(|e| PackageError::io(&std::env::temp_dir(), e))?;
  package::inject_context(&source, &injected, &action.context_destination, staged.path())?;
  debug!(action = %action.name, keys = injected.len(), "staged package with context");

  let digest = package::digest(staged.path())?;
  let uploaded = package::upload(env.store, staged.path(), &bucket, &key, &digest).await?;
  Ok(result(env, &bucket, &key, uploaded.version_id))
}
