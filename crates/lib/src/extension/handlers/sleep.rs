use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::ExtensionHandler;
use crate::extension::dispatch::Deadline;
use crate::extension::types::{ExtensionRequest, Outcome, RequestType};
use crate::extension::ExtensionError;

/// Waits `Time` seconds on create and update. Used to give eventually
/// consistent services time to settle between two resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sleep;

#[async_trait]
impl ExtensionHandler for Sleep {
  async fn handle(&self, request: &ExtensionRequest, deadline: Deadline) -> Result<Outcome, ExtensionError> {
    if request.request_type == RequestType::Delete {
      return Ok(Outcome::default());
    }

    let wanted = Duration::from_secs(request.require_u64("Time")?);
    let slept = deadline.sleep(wanted).await;
    if slept < wanted {
      debug!(wanted_s = wanted.as_secs(), slept_ms = slept.as_millis() as u64, "sleep cut short by deadline");
    }
    Ok(Outcome::default())
  }
}
