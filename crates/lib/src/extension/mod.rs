//! The extension control protocol.
//!
//! Extensions are custom resources backed by one of the project's functions.
//! The provisioning service sends a typed request; the handler performs an
//! idempotent side effect and answers with exactly one `PUT` to the
//! pre-signed response URL, even when it fails, panics or runs out of time.

pub mod dispatch;
pub mod handlers;
pub mod responder;
pub mod types;

use thiserror::Error;

use crate::error::ErrorKind;

pub use dispatch::{Deadline, Invocation, dispatch, handle_event};
pub use handlers::{ExtensionHandler, FunctionVersions, PublishVersion, Sleep};
pub use responder::Responder;
pub use types::{ExtensionRequest, ExtensionResponse, Outcome, RequestType, ResponseStatus};

#[derive(Debug, Error)]
pub enum ExtensionError {
  #[error("malformed extension request: {0}")]
  Request(#[source] serde_json::Error),

  #[error("resource property '{0}' is required")]
  MissingProperty(&'static str),

  #[error("resource property '{name}' is invalid: {message}")]
  InvalidProperty { name: &'static str, message: String },

  #[error("{operation} failed: {message}")]
  Remote { operation: &'static str, message: String },

  #[error("{0}")]
  Handler(String),

  #[error("failed to deliver callback: {0}")]
  Callback(String),

  #[error("callback rejected with HTTP {0}")]
  CallbackRejected(u16),
}

impl ExtensionError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ExtensionError::MissingProperty(_) | ExtensionError::InvalidProperty { .. } => ErrorKind::Validation,
      _ => ErrorKind::Generic,
    }
  }
}
