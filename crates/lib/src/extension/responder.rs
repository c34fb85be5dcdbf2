//! The single callback of an extension invocation.

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use super::ExtensionError;
use super::types::{ExtensionRequest, ExtensionResponse, Outcome, ResponseStatus};

/// Delivers the answer to one request.
///
/// Both [`Responder::success`] and [`Responder::failure`] take `self`, so a
/// request is answered at most once.
#[derive(Debug)]
pub struct Responder {
  client: reqwest::Client,
  url: String,
  stack_id: String,
  request_id: String,
  logical_resource_id: String,
  physical_resource_id: String,
  log_stream: String,
}

impl Responder {
  /// `log_stream` names where the handler's logs end up; it is quoted in
  /// the reason and used as physical id when the request carries none.
  pub fn new(client: reqwest::Client, request: &ExtensionRequest, log_stream: &str) -> Self {
    Self {
      client,
      url: request.response_url.clone(),
      stack_id: request.stack_id.clone(),
      request_id: request.request_id.clone(),
      logical_resource_id: request.logical_resource_id.clone(),
      physical_resource_id: request
        .physical_resource_id
        .clone()
        .unwrap_or_else(|| log_stream.to_string()),
      log_stream: log_stream.to_string(),
    }
  }

  pub async fn success(self, outcome: Outcome) -> Result<(), ExtensionError> {
    let reason = format!("See the details in log stream {}", self.log_stream);
    let physical_resource_id = outcome
      .physical_resource_id
      .unwrap_or_else(|| self.physical_resource_id.clone());
    self
      .send(ResponseStatus::Success, reason, physical_resource_id, outcome.data)
      .await
  }

  pub async fn failure(self, reason: impl Into<String>) -> Result<(), ExtensionError> {
    let reason = format!("{} (log stream {})", reason.into(), self.log_stream);
    let physical_resource_id = self.physical_resource_id.clone();
    self
      .send(ResponseStatus::Failed, reason, physical_resource_id, Default::default())
      .await
  }

  async fn send(
    self,
    status: ResponseStatus,
    reason: String,
    physical_resource_id: String,
    data: std::collections::BTreeMap<String, serde_json::Value>,
  ) -> Result<(), ExtensionError> {
    let response = ExtensionResponse {
      status,
      reason,
      physical_resource_id,
      stack_id: self.stack_id,
      request_id: self.request_id,
      logical_resource_id: self.logical_resource_id,
      data,
    };
    let body = serde_json::to_vec(&response).map_err(ExtensionError::Request)?;
    debug!(url = %self.url, bytes = body.len(), "sending callback");

    // The pre-signed URL is signed without a content type.
    let reply = self
      .client
      .put(&self.url)
      .header(CONTENT_TYPE, "")
      .body(body)
      .send()
      .await
      .map_err(|e| ExtensionError::Callback(e.to_string()))?;

    let code = reply.status();
    if !code.is_success() {
      return Err(ExtensionError::CallbackRejected(code.as_u16()));
    }
    info!(status = ?status, code = code.as_u16(), "callback delivered");
    Ok(())
  }
}
