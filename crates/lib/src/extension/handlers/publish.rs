use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::ExtensionHandler;
use crate::extension::dispatch::Deadline;
use crate::extension::types::{ExtensionRequest, Outcome, RequestType};
use crate::extension::ExtensionError;

/// Function version management of the compute service.
#[async_trait]
pub trait FunctionVersions: Send + Sync {
  /// Digest of the function's current code.
  async fn code_digest(&self, function: &str) -> Result<String, ExtensionError>;

  /// An already published version with `digest`, if any.
  async fn find_version(&self, function: &str, digest: &str) -> Result<Option<String>, ExtensionError>;

  /// Publish the current code, guarded by `digest`. Returns the version.
  async fn publish(&self, function: &str, digest: &str) -> Result<String, ExtensionError>;
}

/// Publishes a version of `FunctionName` unless one with the same code
/// already exists. Versions are kept on delete.
pub struct PublishVersion<V> {
  versions: V,
  /// Time given to a fresh version to become invocable.
  settle: Duration,
}

impl<V: FunctionVersions> PublishVersion<V> {
  pub fn new(versions: V) -> Self {
    Self {
      versions,
      settle: Duration::from_secs(5),
    }
  }

  pub fn with_settle(mut self, settle: Duration) -> Self {
    self.settle = settle;
    self
  }
}

#[async_trait]
impl<V: FunctionVersions> ExtensionHandler for PublishVersion<V> {
  async fn handle(&self, request: &ExtensionRequest, deadline: Deadline) -> Result<Outcome, ExtensionError> {
    if request.request_type == RequestType::Delete {
      return Ok(Outcome::default());
    }

    let function = request.require_str("FunctionName")?;
    let digest = match request.property("CodeSha256") {
      Some(_) => request.require_str("CodeSha256")?.to_string(),
      None => self.versions.code_digest(function).await?,
    };

    let version = match self.versions.find_version(function, &digest).await? {
      Some(existing) => {
        info!(function, version = %existing, "version already published");
        existing
      }
      None => {
        let published = self.versions.publish(function, &digest).await?;
        info!(function, version = %published, "published version");
        deadline.sleep(self.settle).await;
        published
      }
    };

    Ok(Outcome {
      physical_resource_id: Some(format!("{function}:{version}")),
      ..Default::default()
    }
    .with_data("Version", version))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::HashMap;
  use std::sync::Mutex;

  #[derive(Default)]
  struct FakeVersions {
    published: Mutex<HashMap<String, String>>,
    publishes: Mutex<usize>,
  }

  #[async_trait]
  impl FunctionVersions for FakeVersions {
    async fn code_digest(&self, _: &str) -> Result<String, ExtensionError> {
      Ok("digest-a".to_string())
    }

    async fn find_version(&self, _: &str, digest: &str) -> Result<Option<String>, ExtensionError> {
      Ok(self.published.lock().unwrap().get(digest).cloned())
    }

    async fn publish(&self, _: &str, digest: &str) -> Result<String, ExtensionError> {
      let mut count = self.publishes.lock().unwrap();
      *count += 1;
      let version = count.to_string();
      self.published.lock().unwrap().insert(digest.to_string(), version.clone());
      Ok(version)
    }
  }

  fn request(request_type: &str) -> ExtensionRequest {
    ExtensionRequest::from_json(json!({
      "RequestType": request_type,
      "ResponseURL": "https://example.com",
      "StackId": "s",
      "RequestId": "r",
      "ResourceType": "Custom::PublishVersion",
      "LogicalResourceId": "Publish",
      "PhysicalResourceId": "hello:1",
      "ResourceProperties": {"FunctionName": "hello"}
    }))
    .unwrap()
  }

  fn handler() -> PublishVersion<FakeVersions> {
    PublishVersion::new(FakeVersions::default()).with_settle(Duration::ZERO)
  }

  #[tokio::test]
  async fn publishes_once_per_code_digest() {
    let handler = handler();
    let deadline = Deadline::after(Duration::from_secs(5));

    let first = handler.handle(&request("Create"), deadline).await.unwrap();
    let second = handler.handle(&request("Update"), deadline).await.unwrap();

    assert_eq!(first.data["Version"], json!("1"));
    assert_eq!(first.physical_resource_id.as_deref(), Some("hello:1"));
    assert_eq!(second, first);
    assert_eq!(*handler.versions.publishes.lock().unwrap(), 1);
  }

  #[tokio::test]
  async fn delete_keeps_versions() {
    let handler = handler();
    let outcome = handler
      .handle(&request("Delete"), Deadline::after(Duration::from_secs(5)))
      .await
      .unwrap();
    assert!(outcome.physical_resource_id.is_none());
    assert_eq!(*handler.versions.publishes.lock().unwrap(), 0);
  }
}
