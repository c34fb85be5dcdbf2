use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::package::{ObjectStore, PackageError, RemoteObject};

/// [`ObjectStore`] backed by S3.
pub struct S3Objects {
  client: Client,
}

impl S3Objects {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

fn remote_error(operation: &'static str, bucket: &str, key: &str, err: impl std::error::Error) -> PackageError {
  PackageError::Remote {
    operation,
    bucket: bucket.to_string(),
    key: key.to_string(),
    message: DisplayErrorContext(err).to_string(),
  }
}

#[async_trait]
impl ObjectStore for S3Objects {
  async fn head(&self, bucket: &str, key: &str) -> Result<Option<RemoteObject>, PackageError> {
    match self.client.head_object().bucket(bucket).key(key).send().await {
      Ok(head) => Ok(Some(RemoteObject {
        metadata: head.metadata().cloned().unwrap_or_default(),
        version_id: head.version_id().map(str::to_string),
      })),
      Err(e) => {
        let service_error = e.into_service_error();
        if service_error.is_not_found() {
          debug!(bucket, key, "object does not exist");
          Ok(None)
        } else {
          Err(remote_error("head", bucket, key, service_error))
        }
      }
    }
  }

  async fn put(
    &self,
    bucket: &str,
    key: &str,
    path: &Path,
    metadata: HashMap<String, String>,
  ) -> Result<Option<String>, PackageError> {
    let body = ByteStream::from_path(path)
      .await
      .map_err(|e| remote_error("read", bucket, key, e))?;

    let put = self
      .client
      .put_object()
      .bucket(bucket)
      .key(key)
      .body(body)
      .set_metadata(Some(metadata))
      .send()
      .await
      .map_err(|e| remote_error("put", bucket, key, e))?;
    Ok(put.version_id().map(str::to_string))
  }
}
