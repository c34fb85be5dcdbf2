//! Waiting for a stack operation to settle.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::remote::{StackApi, StackDescription};
use super::status::{Settlement, StackStatus};
use super::types::ApplyError;

/// Time source used while polling.
#[async_trait]
pub trait Clock: Send + Sync {
  /// Time elapsed since an arbitrary fixed origin.
  fn now(&self) -> Duration;

  async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  origin: Instant,
}

impl SystemClock {
  pub fn new() -> Self {
    Self { origin: Instant::now() }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl Clock for SystemClock {
  fn now(&self) -> Duration {
    self.origin.elapsed()
  }

  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// The state a wait is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor {
  /// A create or update settled.
  Deployed,
  /// A delete finished; a stack that no longer exists counts too.
  Deleted,
}

/// How long and how often to poll.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
  pub interval: Duration,
  pub timeout: Duration,
}

/// Poll `name` until its status settles.
///
/// Returns the final description on success, or `None` once a deleted stack
/// is gone.
pub async fn wait_for_stack(
  api: &dyn StackApi,
  clock: &dyn Clock,
  name: &str,
  policy: PollPolicy,
  target: WaitFor,
) -> Result<Option<StackDescription>, ApplyError> {
  let started = clock.now();
  let mut last_status: Option<StackStatus> = None;

  loop {
    let Some(description) = api.describe(name).await? else {
      if target == WaitFor::Deleted {
        debug!(stack = name, "stack is gone");
        return Ok(None);
      }
      return Err(ApplyError::StackVanished(name.to_string()));
    };

    if last_status.as_ref() != Some(&description.status) {
      debug!(stack = name, status = %description.status, "stack status");
    }

    let settlement = match target {
      WaitFor::Deployed => description.status.settlement(),
      WaitFor::Deleted => description.status.delete_settlement(),
    };
    match settlement {
      Settlement::Succeeded => return Ok(Some(description)),
      Settlement::Failed => {
        return Err(ApplyError::StackTerminalFailure {
          stack: name.to_string(),
          status: description.status,
          reason: description.status_reason,
        });
      }
      Settlement::InProgress => {}
    }

    let waited = clock.now().saturating_sub(started);
    if waited >= policy.timeout {
      return Err(ApplyError::PollTimeout {
        stack: name.to_string(),
        status: description.status,
        waited,
      });
    }

    last_status = Some(description.status);
    trace!(stack = name, interval_ms = policy.interval.as_millis() as u64, "sleeping");
    clock.sleep(policy.interval).await;
  }
}
