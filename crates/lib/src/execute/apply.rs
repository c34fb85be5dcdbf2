//! Apply orchestration.
//!
//! Artifacts are applied strictly in sequence order, each one to completion
//! before the next:
//!
//! 1. List the artifacts of the last build
//! 2. Seed the apply context with `Stage`, `Region` and parameters
//! 3. For an action template, run its actions and merge their outputs
//! 4. For a native template, create or update its stack, wait for it to
//!    settle and merge the stack outputs
//!
//! Nothing is rolled back on failure; the remote service does that per stack.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::consts::VERSION_TAG;
use crate::template::artifact::{self, Artifact, Document};
use crate::template::NativeTemplate;

use super::actions::{ActionEnv, run_actions};
use super::context::ApplyContext;
use super::poll::{PollPolicy, WaitFor, wait_for_stack};
use super::remote::{StackRequest, UpdateOutcome};
use super::types::{ApplyError, DeployConfig, ExecuteReport, Step, StepOutcome};
use super::Remote;

/// Apply every artifact in `build_dir`.
pub async fn apply(
  build_dir: &Path,
  project: &str,
  config: &DeployConfig,
  parameters: BTreeMap<String, String>,
  remote: &Remote<'_>,
) -> Result<ExecuteReport, ApplyError> {
  let artifacts = artifact::list(build_dir)?;
  info!(
    project,
    stage = %config.stage,
    region = %config.region,
    artifacts = artifacts.len(),
    "starting apply"
  );

  let mut context = ApplyContext::seed(&config.stage, &config.region, parameters);
  let env = ActionEnv {
    build_dir,
    region: &config.region,
    store: remote.objects,
  };

  let mut steps = Vec::with_capacity(artifacts.len());
  for artifact in &artifacts {
    let name = artifact.file_name();
    let (outcome, outputs) = match artifact.load()? {
      Document::Actions(template) => {
        let outputs = run_actions(&name, &template, &context, &env).await?;
        (
          StepOutcome::ActionsRun {
            count: template.actions.len(),
          },
          outputs,
        )
      }
      Document::Native { template, body } => {
        apply_stack(artifact, &template, body, &context, project, config, remote).await?
      }
    };

    info!(artifact = %name, outputs = outputs.len(), "{outcome}");
    context.merge(outputs);
    steps.push(Step { artifact: name, outcome });
  }

  Ok(ExecuteReport {
    steps,
    context: context.into_values(),
  })
}

/// Create or update the stack of one native artifact and wait for it.
async fn apply_stack(
  artifact: &Artifact,
  template: &NativeTemplate,
  body: String,
  context: &ApplyContext,
  project: &str,
  config: &DeployConfig,
  remote: &Remote<'_>,
) -> Result<(StepOutcome, BTreeMap<String, String>), ApplyError> {
  let stack = config.stack_name(project, artifact.suffix());
  let parameters = context.parameters_for(&artifact.file_name(), template)?;

  let request = StackRequest {
    name: stack.clone(),
    body,
    parameters,
    tags: BTreeMap::from([(VERSION_TAG.to_string(), env!("CARGO_PKG_VERSION").to_string())]),
    timeout_minutes: timeout_minutes(config.timeout),
  };
  let policy = PollPolicy {
    interval: config.poll_interval,
    timeout: config.timeout,
  };

  let Some(existing) = remote.stacks.describe(&stack).await? else {
    info!(stack = %stack, "creating stack");
    remote.stacks.create(&request).await?;
    let created = wait_for_stack(remote.stacks, remote.clock, &stack, policy, WaitFor::Deployed)
      .await?
      .ok_or_else(|| ApplyError::StackVanished(stack.clone()))?;
    return Ok((StepOutcome::Created { stack }, created.outputs));
  };

  if existing.status.is_in_progress() {
    return Err(ApplyError::StackInProgress {
      stack,
      status: existing.status,
    });
  }
  if existing.status.is_unrecoverable() {
    warn!(stack = %stack, status = %existing.status, "stack needs manual cleanup");
    return Err(ApplyError::StackTerminalFailure {
      stack,
      status: existing.status,
      reason: existing.status_reason,
    });
  }

  info!(stack = %stack, status = %existing.status, "updating stack");
  match remote.stacks.update(&request).await? {
    UpdateOutcome::NoChanges => {
      info!(stack = %stack, "stack is up to date");
      Ok((StepOutcome::Unchanged { stack }, existing.outputs))
    }
    UpdateOutcome::Updated => {
      let updated = wait_for_stack(remote.stacks, remote.clock, &stack, policy, WaitFor::Deployed)
        .await?
        .ok_or_else(|| ApplyError::StackVanished(stack.clone()))?;
      Ok((StepOutcome::Updated { stack }, updated.outputs))
    }
  }
}

/// Whole minutes, rounded up, never zero.
fn timeout_minutes(timeout: Duration) -> u32 {
  let minutes = timeout.as_secs().div_ceil(60).max(1);
  u32::try_from(minutes).unwrap_or(u32::MAX)
}
