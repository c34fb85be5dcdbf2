//! Hashing utilities for content-addressed packages.
//!
//! This module provides:
//! - `ContentHash`: a full 64-character SHA-256 digest
//! - `hash_entries()`: digest of a set of named blobs, independent of order
//! - `hash_directory()`: deterministic directory hashing
//! - `hash_file()`: single file hashing
//! - `hash_bytes()`: arbitrary byte hashing
//!
//! A directory and a zip archive holding the same files produce the same
//! digest, since both are reduced to their sorted `(name, content)` pairs.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A full 64-character SHA-256 hash of some content.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// The first `len` characters, used where identifiers must stay short.
  pub fn prefix(&self, len: usize) -> &str {
    &self.0[..len.min(self.0.len())]
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error during content hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
  #[error("failed to walk directory: {message}")]
  WalkDir { message: String },

  #[error("failed to read file {path}: {message}")]
  ReadFile { path: String, message: String },
}

/// Hash a set of `(name, content)` pairs.
///
/// Pairs are sorted by name first, so the order they are produced in never
/// affects the result.
pub fn hash_entries(mut entries: Vec<(String, Vec<u8>)>) -> ContentHash {
  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let mut hasher = Sha256::new();
  for (name, content) in entries {
    hasher.update(name.as_bytes());
    hasher.update(b"\0");
    hasher.update(hash_bytes(&content).0.as_bytes());
    hasher.update(b"\n");
  }

  ContentHash(format!("{:x}", hasher.finalize()))
}

/// Collect every regular file below `path` as `(relative path, content)`.
///
/// Relative paths always use `/` as separator. Entries whose file name is in
/// `exclude` are skipped along with everything below them.
pub fn directory_entries(path: &Path, exclude: &[&str]) -> Result<Vec<(String, Vec<u8>)>, HashError> {
  let mut entries = Vec::new();

  let walker = WalkDir::new(path)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| {
      e.file_name()
        .to_str()
        .map(|name| !exclude.contains(&name))
        .unwrap_or(true)
    });

  for entry in walker {
    let entry = entry.map_err(|e| HashError::WalkDir { message: e.to_string() })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let entry_path = entry.path();
    let rel_path = entry_path
      .strip_prefix(path)
      .unwrap_or(entry_path)
      .components()
      .map(|c| c.as_os_str().to_string_lossy().to_string())
      .collect::<Vec<_>>()
      .join("/");

    let content = fs::read(entry_path).map_err(|e| HashError::ReadFile {
      path: entry_path.display().to_string(),
      message: e.to_string(),
    })?;
    entries.push((rel_path, content));
  }

  Ok(entries)
}

/// Compute a deterministic hash of a directory's contents.
///
/// Only file contents and relative paths count; timestamps, permissions and
/// empty directories do not.
pub fn hash_directory(path: &Path, exclude: &[&str]) -> Result<ContentHash, HashError> {
  Ok(hash_entries(directory_entries(path, exclude)?))
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let read_err = |e: std::io::Error| HashError::ReadFile {
    path: path.display().to_string(),
    message: e.to_string(),
  };
  let mut file = fs::File::open(path).map_err(read_err)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(read_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(format!("{:x}", hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(format!("{:x}", hasher.finalize()))
}
