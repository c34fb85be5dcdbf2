//! Built-in extension handlers.
//!
//! Handlers decide what to do from the state of their target, not from the
//! request type alone, so a retried or replayed request is harmless.

mod publish;
mod sleep;

use async_trait::async_trait;

use super::dispatch::Deadline;
use super::types::{ExtensionRequest, Outcome};
use super::ExtensionError;

pub use publish::{FunctionVersions, PublishVersion};
pub use sleep::Sleep;

/// A user-defined resource lifecycle implementation.
#[async_trait]
pub trait ExtensionHandler: Send + Sync {
  async fn handle(&self, request: &ExtensionRequest, deadline: Deadline) -> Result<Outcome, ExtensionError>;
}
