//! Content-addressed packages.
//!
//! A package is uploaded only when its content changed. The digest of what
//! was uploaded is stored as metadata on the remote object; re-zipping an
//! unchanged directory produces the same digest, so the stored object and
//! its version id are reused.

pub mod archive;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DIGEST_METADATA_KEY;
use crate::util::hash::{self, ContentHash, HashError};

pub use archive::{archive_entries, inject_context, package, source_digest};

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("failed to access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Hash(#[from] HashError),

  #[error("invalid archive {path}: {message}")]
  Zip { path: PathBuf, message: String },

  #[error("object store {operation} failed for {bucket}/{key}: {message}")]
  Remote {
    operation: &'static str,
    bucket: String,
    key: String,
    message: String,
  },

  #[error("bucket {bucket} returned no version for {key}; versioning must be enabled")]
  Unversioned { bucket: String, key: String },
}

impl PackageError {
  pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
    PackageError::Io {
      path: path.to_path_buf(),
      source,
    }
  }

  pub(crate) fn zip(path: &Path, err: impl std::fmt::Display) -> Self {
    PackageError::Zip {
      path: path.to_path_buf(),
      message: err.to_string(),
    }
  }
}

/// Metadata of an object already present in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteObject {
  pub metadata: HashMap<String, String>,
  pub version_id: Option<String>,
}

impl RemoteObject {
  pub fn digest(&self) -> Option<&str> {
    self.metadata.get(DIGEST_METADATA_KEY).map(String::as_str)
  }
}

/// Remote object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Metadata of `bucket/key`, or `None` if it does not exist.
  async fn head(&self, bucket: &str, key: &str) -> Result<Option<RemoteObject>, PackageError>;

  /// Store the file at `path` as `bucket/key`. Returns the new version id.
  async fn put(
    &self,
    bucket: &str,
    key: &str,
    path: &Path,
    metadata: HashMap<String, String>,
  ) -> Result<Option<String>, PackageError>;
}

/// Result of [`upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
  pub version_id: String,
  /// False when the stored object already had the same digest.
  pub transferred: bool,
}

/// Digest of a file, directory or zip archive.
///
/// Zip archives are hashed by their sorted entries, so two archives with the
/// same files in a different order share a digest, and a directory has the
/// digest of the package built from it.
pub fn digest(path: &Path) -> Result<ContentHash, PackageError> {
  if path.is_dir() {
    return source_digest(path);
  }
  if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")) {
    return Ok(hash::hash_entries(archive_entries(path)?));
  }
  Ok(hash::hash_file(path)?)
}

/// True unless `remote` exists and carries `local` as its digest.
pub fn should_upload(local: &ContentHash, remote: Option<&RemoteObject>) -> bool {
  match remote.and_then(RemoteObject::digest) {
    Some(stored) => stored != local.0,
    None => true,
  }
}

/// Upload `path` to `bucket/key` unless the stored copy has the same digest.
pub async fn upload(
  store: &dyn ObjectStore,
  path: &Path,
  bucket: &str,
  key: &str,
  local: &ContentHash,
) -> Result<Uploaded, PackageError> {
  let unversioned = || PackageError::Unversioned {
    bucket: bucket.to_string(),
    key: key.to_string(),
  };

  let remote = store.head(bucket, key).await?;
  if !should_upload(local, remote.as_ref()) {
    let version_id = remote.and_then(|r| r.version_id).ok_or_else(unversioned)?;
    debug!(bucket, key, digest = %local.prefix(8), "already uploaded");
    return Ok(Uploaded {
      version_id,
      transferred: false,
    });
  }

  let metadata = HashMap::from([(DIGEST_METADATA_KEY.to_string(), local.0.clone())]);
  let version_id = store.put(bucket, key, path, metadata).await?.ok_or_else(unversioned)?;
  info!(bucket, key, digest = %local.prefix(8), version = %version_id, "uploaded");
  Ok(Uploaded {
    version_id,
    transferred: true,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{MemoryStore, write_file};
  use tempfile::TempDir;

  #[test]
  fn should_upload_compares_stored_digest() {
    let local = ContentHash("abc".to_string());
    assert!(should_upload(&local, None));

    let mut remote = RemoteObject::default();
    assert!(should_upload(&local, Some(&remote)));

    remote.metadata.insert(DIGEST_METADATA_KEY.to_string(), "abc".to_string());
    assert!(!should_upload(&local, Some(&remote)));

    remote.metadata.insert(DIGEST_METADATA_KEY.to_string(), "def".to_string());
    assert!(should_upload(&local, Some(&remote)));
  }

  #[test]
  fn zip_digest_ignores_entry_order() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/b.py", "b");
    write_file(temp.path(), "src/a.py", "a");

    let zip = temp.path().join("code.zip");
    let packaged = package(&temp.path().join("src"), &zip).unwrap();
    assert_eq!(digest(&zip).unwrap(), packaged);
    assert_eq!(digest(&temp.path().join("src")).unwrap(), packaged);
  }

  #[tokio::test]
  async fn matching_digest_skips_transfer_and_returns_stored_version() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "code.zip", "not really a zip");
    let local = ContentHash("d1".to_string());

    let store = MemoryStore::new();
    store.seed("bucket", "code.zip", "d1", "v-7");

    let uploaded = upload(&store, &temp.path().join("code.zip"), "bucket", "code.zip", &local)
      .await
      .unwrap();
    assert_eq!(
      uploaded,
      Uploaded {
        version_id: "v-7".to_string(),
        transferred: false,
      }
    );
    assert_eq!(store.puts(), 0);
    assert_eq!(store.heads(), 1);
  }

  #[tokio::test]
  async fn changed_digest_uploads_with_metadata() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "code.zip", "bytes");
    let local = ContentHash("d2".to_string());

    let store = MemoryStore::new();
    store.seed("bucket", "code.zip", "d1", "v-1");

    let uploaded = upload(&store, &temp.path().join("code.zip"), "bucket", "code.zip", &local)
      .await
      .unwrap();
    assert!(uploaded.transferred);
    assert_eq!(store.puts(), 1);

    let stored = store.head("bucket", "code.zip").await.unwrap().unwrap();
    assert_eq!(stored.digest(), Some("d2"));
    assert_eq!(stored.version_id, Some(uploaded.version_id));
  }
}
