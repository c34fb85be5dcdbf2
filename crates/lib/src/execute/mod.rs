//! Applying build artifacts against the remote stack service.
//!
//! This module provides the entry points that walk the artifacts of a build:
//! - `apply` forward, creating or updating one stack per native template and
//!   running action templates locally
//! - `delete` in reverse, dry-run unless confirmed
//!
//! Remote services and time are injected through [`Remote`] so the whole flow
//! runs against in-memory fakes in tests.

pub mod actions;
pub mod apply;
pub mod context;
pub mod delete;
pub mod poll;
pub mod remote;
pub mod status;
pub mod types;

use crate::package::ObjectStore;

pub use apply::apply;
pub use context::ApplyContext;
pub use delete::delete;
pub use poll::{Clock, PollPolicy, SystemClock, WaitFor, wait_for_stack};
pub use remote::{StackApi, StackDescription, StackRequest, UpdateOutcome};
pub use status::{Settlement, StackStatus};
pub use types::{ApplyError, DeployConfig, ExecuteReport, Step, StepOutcome};

/// Remote services used by apply and delete.
#[derive(Clone, Copy)]
pub struct Remote<'a> {
  pub stacks: &'a dyn StackApi,
  pub objects: &'a dyn ObjectStore,
  pub clock: &'a dyn Clock,
}
