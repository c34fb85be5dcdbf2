//! Deterministic zip archives.
//!
//! Entries are written sorted by name with a fixed 1980-01-01 timestamp and
//! fixed permissions, so identical sources always produce identical bytes.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::PackageError;
use crate::util::hash::{ContentHash, directory_entries, hash_entries};

/// Names never included in a package.
const EXCLUDED: &[&str] = &[".git", "__pycache__", ".DS_Store"];

type Entries = Vec<(String, Vec<u8>)>;

/// Entries a package of `source` would hold.
///
/// A directory contributes every file below it, relative to itself. A single
/// file is stored under its own name.
pub fn source_entries(source: &Path) -> Result<Entries, PackageError> {
  if source.is_dir() {
    return Ok(directory_entries(source, EXCLUDED)?);
  }
  let content = fs::read(source).map_err(|e| PackageError::io(source, e))?;
  let name = source
    .file_name()
    .map(|n| n.to_string_lossy().to_string())
    .unwrap_or_default();
  Ok(vec![(name, content)])
}

/// Digest a package of `source` would have, without writing it.
pub fn source_digest(source: &Path) -> Result<ContentHash, PackageError> {
  Ok(hash_entries(source_entries(source)?))
}

/// Package a file or directory into a zip at `destination`.
///
/// Returns the digest of the contents.
pub fn package(source: &Path, destination: &Path) -> Result<ContentHash, PackageError> {
  let entries = source_entries(source)?;

  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;
  }

  write_archive(destination, entries.clone())?;
  let digest = hash_entries(entries);
  debug!(source = %source.display(), destination = %destination.display(), digest = %digest.prefix(8), "packaged");
  Ok(digest)
}

/// Read every file entry of a zip archive.
pub fn archive_entries(path: &Path) -> Result<Entries, PackageError> {
  let file = File::open(path).map_err(|e| PackageError::io(path, e))?;
  let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| PackageError::zip(path, e))?;

  let mut entries = Vec::with_capacity(archive.len());
  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(|e| PackageError::zip(path, e))?;
    if entry.is_dir() {
      continue;
    }
    let mut content = Vec::new();
    entry.read_to_end(&mut content).map_err(|e| PackageError::io(path, e))?;
    entries.push((entry.name().to_string(), content));
  }
  Ok(entries)
}

/// Write a copy of `archive` to `destination` with an extra JSON entry
/// `entry_name` holding `context`. An existing entry of that name is replaced.
pub fn inject_context(
  archive: &Path,
  context: &BTreeMap<String, String>,
  entry_name: &str,
  destination: &Path,
) -> Result<(), PackageError> {
  let mut entries = archive_entries(archive)?;
  entries.retain(|(name, _)| name != entry_name);

  let body = serde_json::to_vec(context).map_err(|e| PackageError::Zip {
    path: destination.to_path_buf(),
    message: e.to_string(),
  })?;
  entries.push((entry_name.to_string(), body));

  write_archive(destination, entries)?;
  debug!(archive = %archive.display(), entry = entry_name, keys = context.len(), "injected context");
  Ok(())
}

fn write_archive(destination: &Path, mut entries: Entries) -> Result<(), PackageError> {
  entries.sort_by(|a, b| a.0.cmp(&b.0));

  let file = File::create(destination).map_err(|e| PackageError::io(destination, e))?;
  let mut zip = ZipWriter::new(file);
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default())
    .unix_permissions(0o644);

  for (name, content) in entries {
    zip
      .start_file(name, options)
      .map_err(|e| PackageError::zip(destination, e))?;
    zip.write_all(&content).map_err(|e| PackageError::io(destination, e))?;
  }
  zip.finish().map_err(|e| PackageError::zip(destination, e))?;
  Ok(())
}
