//! The remote stack service as seen by the orchestrator.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::status::StackStatus;
use super::types::ApplyError;

/// Snapshot of a remote stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
  pub name: String,
  pub status: StackStatus,
  pub status_reason: Option<String>,
  /// Outputs, populated once the stack reached a terminal status.
  pub outputs: BTreeMap<String, String>,
}

/// Everything needed to create or update a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
  pub name: String,
  /// Template document, sent verbatim.
  pub body: String,
  pub parameters: BTreeMap<String, String>,
  pub tags: BTreeMap<String, String>,
  /// Provider-side timeout, only honoured on create.
  pub timeout_minutes: u32,
}

/// Result of an update call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
  Updated,
  /// The provider reported that no updates are to be performed.
  NoChanges,
}

/// Remote stack-based provisioning service.
#[async_trait]
pub trait StackApi: Send + Sync {
  /// Current state of `name`, or `None` if no such stack exists.
  async fn describe(&self, name: &str) -> Result<Option<StackDescription>, ApplyError>;

  async fn create(&self, request: &StackRequest) -> Result<(), ApplyError>;

  async fn update(&self, request: &StackRequest) -> Result<UpdateOutcome, ApplyError>;

  async fn delete(&self, name: &str) -> Result<(), ApplyError>;
}
