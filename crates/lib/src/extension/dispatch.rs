//! Running a handler under a deadline and answering exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use super::handlers::ExtensionHandler;
use super::responder::Responder;
use super::types::{ExtensionRequest, ResponseStatus};
use super::ExtensionError;
use crate::consts::CALLBACK_SAFETY_MARGIN;

/// Point in time a handler has to be done by.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  at: Instant,
}

impl Deadline {
  pub fn after(budget: Duration) -> Self {
    Self {
      at: Instant::now() + budget,
    }
  }

  pub fn remaining(&self) -> Duration {
    self.at.saturating_duration_since(Instant::now())
  }

  /// Sleep for `duration`, but never past the deadline. Returns the time
  /// actually slept.
  pub async fn sleep(&self, duration: Duration) -> Duration {
    let capped = duration.min(self.remaining());
    tokio::time::sleep(capped).await;
    capped
  }
}

/// The invocation environment of a handler.
#[derive(Debug, Clone)]
pub struct Invocation {
  /// Time left before the runtime kills the invocation.
  pub remaining: Duration,
  pub log_stream: String,
}

/// Run `handler` for `request` and deliver its callback.
///
/// The handler gets the invocation's remaining time minus a safety margin.
/// A handler error, panic or overrun still produces a `FAILED` callback.
/// Returns the status that was delivered.
pub async fn dispatch(
  handler: Arc<dyn ExtensionHandler>,
  request: ExtensionRequest,
  invocation: &Invocation,
  client: reqwest::Client,
) -> Result<ResponseStatus, ExtensionError> {
  let responder = Responder::new(client, &request, &invocation.log_stream);
  let budget = invocation.remaining.saturating_sub(CALLBACK_SAFETY_MARGIN);
  let deadline = Deadline::after(budget);
  info!(
    request_type = ?request.request_type,
    resource = %request.logical_resource_id,
    budget_ms = budget.as_millis() as u64,
    "handling extension request"
  );

  let mut task = tokio::spawn(async move { handler.handle(&request, deadline).await });

  let failure = match tokio::time::timeout(budget, &mut task).await {
    Ok(Ok(Ok(outcome))) => {
      responder.success(outcome).await?;
      return Ok(ResponseStatus::Success);
    }
    Ok(Ok(Err(e))) => {
      warn!(error = %e, "handler failed");
      e.to_string()
    }
    Ok(Err(join)) => {
      error!(error = %join, "handler panicked");
      "handler panicked".to_string()
    }
    Err(_) => {
      task.abort();
      warn!("handler ran out of time");
      format!("handler did not finish within {}ms", budget.as_millis())
    }
  };

  responder.failure(failure).await?;
  Ok(ResponseStatus::Failed)
}

/// Entry point for a function runtime: parse the raw `event` and dispatch it.
///
/// An event that does not parse carries no usable response URL, so the error
/// is returned to the runtime instead of being called back.
pub async fn handle_event(
  handler: Arc<dyn ExtensionHandler>,
  event: serde_json::Value,
  remaining: Duration,
  log_stream: &str,
) -> Result<ResponseStatus, ExtensionError> {
  let request = ExtensionRequest::from_json(event)?;
  let invocation = Invocation {
    remaining,
    log_stream: log_stream.to_string(),
  };
  dispatch(handler, request, &invocation, reqwest::Client::new()).await
}
