//! Symbol table from LRNs to provisioning ids and resources.
//!
//! Resources refer to each other by LRN before any of them exists remotely.
//! The registry is filled once while the project loads and is read-only
//! afterwards; entries are never removed.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::trace;

use crate::lrn::Lrn;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  #[error("resource name '{0}' is already registered")]
  DuplicateName(String),

  #[error("provisioning id '{id}' of '{lrn}' is already used by '{existing}'")]
  DuplicateId { lrn: String, id: String, existing: String },

  #[error("'{name}' is not a known resource (known: {})", .known.join(", "))]
  NotFound { name: String, known: Vec<String> },
}

/// A single registered name.
#[derive(Debug, Clone)]
pub struct Entry<R> {
  pub lrn: Lrn,
  pub provisioning_id: String,
  pub resource: R,
}

/// Write-once map of every resource name known to a project.
#[derive(Debug, Clone)]
pub struct Registry<R> {
  entries: BTreeMap<Lrn, Entry<R>>,
  ids: HashMap<String, Lrn>,
}

impl<R> Default for Registry<R> {
  fn default() -> Self {
    Self {
      entries: BTreeMap::new(),
      ids: HashMap::new(),
    }
  }
}

impl<R> Registry<R> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `lrn` under `provisioning_id`.
  ///
  /// Fails if either the name or the id is already taken.
  pub fn register(&mut self, lrn: Lrn, provisioning_id: String, resource: R) -> Result<(), RegistryError> {
    if self.entries.contains_key(&lrn) {
      return Err(RegistryError::DuplicateName(lrn.to_string()));
    }
    if let Some(existing) = self.ids.get(&provisioning_id) {
      return Err(RegistryError::DuplicateId {
        lrn: lrn.to_string(),
        id: provisioning_id,
        existing: existing.to_string(),
      });
    }

    trace!(lrn = %lrn, id = %provisioning_id, "registered");
    self.ids.insert(provisioning_id.clone(), lrn.clone());
    self.entries.insert(
      lrn.clone(),
      Entry {
        lrn,
        provisioning_id,
        resource,
      },
    );
    Ok(())
  }

  /// Provisioning id of a registered name.
  pub fn resolve(&self, lrn: &Lrn) -> Result<&str, RegistryError> {
    self.entry(lrn).map(|e| e.provisioning_id.as_str())
  }

  /// Resource registered under a name.
  pub fn resolve_object(&self, lrn: &Lrn) -> Result<&R, RegistryError> {
    self.entry(lrn).map(|e| &e.resource)
  }

  pub fn entry(&self, lrn: &Lrn) -> Result<&Entry<R>, RegistryError> {
    self.entries.get(lrn).ok_or_else(|| RegistryError::NotFound {
      name: lrn.to_string(),
      known: self.names(),
    })
  }

  pub fn contains(&self, lrn: &Lrn) -> bool {
    self.entries.contains_key(lrn)
  }

  /// Every registered name, sorted.
  pub fn names(&self) -> Vec<String> {
    self.entries.keys().map(Lrn::to_string).collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
