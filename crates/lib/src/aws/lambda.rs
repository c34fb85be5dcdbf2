use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::DisplayErrorContext;
use tracing::debug;

use crate::extension::{ExtensionError, FunctionVersions};

const LATEST: &str = "$LATEST";

/// [`FunctionVersions`] backed by Lambda.
#[derive(Clone)]
pub struct LambdaVersions {
  client: Client,
}

impl LambdaVersions {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

fn remote_error(operation: &'static str, function: &str, err: impl std::error::Error) -> ExtensionError {
  ExtensionError::Remote {
    operation,
    message: format!("{function}: {}", DisplayErrorContext(err)),
  }
}

/// The newest published version whose code has `digest`.
fn newest_with_digest<'a>(versions: impl IntoIterator<Item = (&'a str, &'a str)>, digest: &str) -> Option<String> {
  versions
    .into_iter()
    .filter(|(version, sha)| *version != LATEST && *sha == digest)
    .filter_map(|(version, _)| version.parse::<u64>().ok())
    .max()
    .map(|n| n.to_string())
}

#[async_trait]
impl FunctionVersions for LambdaVersions {
  async fn code_digest(&self, function: &str) -> Result<String, ExtensionError> {
    let config = self
      .client
      .get_function_configuration()
      .function_name(function)
      .send()
      .await
      .map_err(|e| remote_error("get_function_configuration", function, e))?;
    config.code_sha256().map(str::to_string).ok_or_else(|| ExtensionError::Remote {
      operation: "get_function_configuration",
      message: format!("{function}: no code digest reported"),
    })
  }

  async fn find_version(&self, function: &str, digest: &str) -> Result<Option<String>, ExtensionError> {
    let mut published = Vec::new();
    let mut marker = None;
    loop {
      let page = self
        .client
        .list_versions_by_function()
        .function_name(function)
        .set_marker(marker)
        .send()
        .await
        .map_err(|e| remote_error("list_versions_by_function", function, e))?;

      for config in page.versions.unwrap_or_default() {
        if let (Some(version), Some(sha)) = (config.version, config.code_sha256) {
          published.push((version, sha));
        }
      }
      marker = page.next_marker;
      if marker.is_none() {
        break;
      }
    }

    debug!(function, versions = published.len(), "listed function versions");
    Ok(newest_with_digest(
      published.iter().map(|(v, s)| (v.as_str(), s.as_str())),
      digest,
    ))
  }

  async fn publish(&self, function: &str, digest: &str) -> Result<String, ExtensionError> {
    let published = self
      .client
      .publish_version()
      .function_name(function)
      .code_sha256(digest)
      .send()
      .await
      .map_err(|e| remote_error("publish_version", function, e))?;
    published.version().map(str::to_string).ok_or_else(|| ExtensionError::Remote {
      operation: "publish_version",
      message: format!("{function}: no version returned"),
    })
  }
}
