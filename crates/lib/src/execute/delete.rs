//! Delete orchestration: the artifacts of the last build, in reverse.
//!
//! Without confirmation nothing is mutated; the report only says which
//! stacks would be removed. Action artifacts have nothing to undo.

use std::path::Path;

use tracing::info;

use crate::template::StageKind;
use crate::template::artifact;

use super::poll::{PollPolicy, WaitFor, wait_for_stack};
use super::types::{ApplyError, DeployConfig, ExecuteReport, Step, StepOutcome};
use super::Remote;

/// Delete the stacks of every native artifact in `build_dir`, last first.
pub async fn delete(
  build_dir: &Path,
  project: &str,
  config: &DeployConfig,
  confirm: bool,
  remote: &Remote<'_>,
) -> Result<ExecuteReport, ApplyError> {
  let artifacts = artifact::list(build_dir)?;
  info!(project, stage = %config.stage, confirm, "starting delete");

  let policy = PollPolicy {
    interval: config.poll_interval,
    timeout: config.timeout,
  };

  let mut steps = Vec::with_capacity(artifacts.len());
  for artifact in artifacts.iter().rev() {
    let name = artifact.file_name();
    if artifact.stage.kind() == StageKind::Actions {
      steps.push(Step {
        artifact: name,
        outcome: StepOutcome::Skipped,
      });
      continue;
    }

    let stack = config.stack_name(project, artifact.suffix());
    let outcome = match remote.stacks.describe(&stack).await? {
      None => StepOutcome::Absent { stack },
      Some(existing) if existing.status.is_in_progress() => {
        return Err(ApplyError::StackInProgress {
          stack,
          status: existing.status,
        });
      }
      Some(_) if !confirm => StepOutcome::WouldDelete { stack },
      Some(_) => {
        info!(stack = %stack, "deleting stack");
        remote.stacks.delete(&stack).await?;
        wait_for_stack(remote.stacks, remote.clock, &stack, policy, WaitFor::Deleted).await?;
        StepOutcome::Deleted { stack }
      }
    };

    info!(artifact = %name, "{outcome}");
    steps.push(Step { artifact: name, outcome });
  }

  Ok(ExecuteReport {
    steps,
    ..Default::default()
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::build::build;
  use crate::error::ErrorKind;
  use crate::execute::StackStatus;
  use std::time::Duration;
  use crate::project::Project;
  use crate::execute::poll::Clock;
  use crate::util::testutil::{FakeClock, FakeStackApi, MemoryStore, hello_project};
  use tempfile::TempDir;

  fn built_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    hello_project(temp.path());
    build(&Project::load(temp.path()).unwrap()).unwrap();
    temp
  }

  fn deployed() -> FakeStackApi {
    let stacks = FakeStackApi::new();
    stacks.script("dev-demo-p", &[StackStatus::CreateComplete]);
    stacks.script("dev-demo-r", &[StackStatus::UpdateComplete]);
    stacks
  }

  async fn confirmed(
    temp: &TempDir,
    stacks: &FakeStackApi,
    clock: &FakeClock,
    config: &DeployConfig,
  ) -> Result<ExecuteReport, ApplyError> {
    let objects = MemoryStore::new();
    let remote = Remote {
      stacks,
      objects: &objects,
      clock,
    };
    delete(&temp.path().join("_build"), "demo", config, true, &remote).await
  }

  fn position(calls: &[String], call: &str) -> usize {
    calls.iter().position(|c| c == call).unwrap()
  }

  fn outcomes(report: &ExecuteReport) -> Vec<(&str, StepOutcome)> {
    report
      .steps
      .iter()
      .map(|s| (s.artifact.as_str(), s.outcome.clone()))
      .collect()
  }

  #[tokio::test]
  async fn dry_run_lists_stacks_in_reverse_without_mutating() {
    let temp = built_project();
    let stacks = deployed();
    let objects = MemoryStore::new();
    let clock = FakeClock::new();
    let remote = Remote {
      stacks: &stacks,
      objects: &objects,
      clock: &clock,
    };

    let report = delete(&temp.path().join("_build"), "demo", &DeployConfig::new("dev", "eu-west-1"), false, &remote)
      .await
      .unwrap();

    assert_eq!(
      outcomes(&report),
      vec![
        (
          "0003_r.json",
          StepOutcome::WouldDelete {
            stack: "dev-demo-r".to_string()
          }
        ),
        ("0002_pr_r.json", StepOutcome::Skipped),
        (
          "0001_p.json",
          StepOutcome::WouldDelete {
            stack: "dev-demo-p".to_string()
          }
        ),
      ]
    );
    assert!(stacks.mutations().is_empty());
  }

  #[tokio::test]
  async fn confirmed_delete_removes_stacks_last_first() {
    let temp = built_project();
    let stacks = deployed();
    let objects = MemoryStore::new();
    let clock = FakeClock::new();
    let remote = Remote {
      stacks: &stacks,
      objects: &objects,
      clock: &clock,
    };

    let report = delete(&temp.path().join("_build"), "demo", &DeployConfig::new("dev", "eu-west-1"), true, &remote)
      .await
      .unwrap();

    assert_eq!(stacks.mutations(), vec!["delete dev-demo-r", "delete dev-demo-p"]);
    assert!(matches!(report.steps[0].outcome, StepOutcome::Deleted { .. }));
    assert!(report.context.is_empty());
  }

  #[tokio::test]
  async fn missing_stacks_are_reported_absent() {
    let temp = built_project();
    let stacks = FakeStackApi::new();
    let objects = MemoryStore::new();
    let clock = FakeClock::new();
    let remote = Remote {
      stacks: &stacks,
      objects: &objects,
      clock: &clock,
    };

    let report = delete(&temp.path().join("_build"), "demo", &DeployConfig::new("dev", "eu-west-1"), true, &remote)
      .await
      .unwrap();
    assert!(matches!(report.steps[0].outcome, StepOutcome::Absent { .. }));
    assert!(stacks.mutations().is_empty());
  }

  #[tokio::test]
  async fn stale_status_after_delete_keeps_polling() {
    let temp = built_project();
    let stacks = deployed();
    stacks.after_delete(
      "dev-demo-r",
      &[
        StackStatus::UpdateComplete,
        StackStatus::UpdateComplete,
        StackStatus::UpdateComplete,
        StackStatus::DeleteInProgress,
        StackStatus::DeleteComplete,
      ],
    );
    stacks.after_delete("dev-demo-p", &[]);
    let clock = FakeClock::new();

    let report = confirmed(&temp, &stacks, &clock, &DeployConfig::new("dev", "eu-west-1"))
      .await
      .unwrap();

    assert!(matches!(report.steps[0].outcome, StepOutcome::Deleted { .. }));
    assert_eq!(clock.now(), Duration::from_secs(4));

    let calls = stacks.calls();
    let last_r_describe = calls.iter().rposition(|c| c == "describe dev-demo-r").unwrap();
    assert_eq!(calls.iter().filter(|c| *c == "describe dev-demo-r").count(), 6);
    assert!(position(&calls, "delete dev-demo-p") > last_r_describe);
  }

  #[tokio::test]
  async fn rolled_back_stacks_can_be_deleted() {
    let temp = built_project();
    let stacks = FakeStackApi::new();
    stacks.script("dev-demo-p", &[StackStatus::UpdateRollbackComplete]);
    stacks.script("dev-demo-r", &[StackStatus::RollbackComplete]);
    stacks.after_delete(
      "dev-demo-r",
      &[
        StackStatus::RollbackComplete,
        StackStatus::DeleteInProgress,
        StackStatus::DeleteComplete,
      ],
    );
    stacks.after_delete("dev-demo-p", &[]);
    let clock = FakeClock::new();

    let report = confirmed(&temp, &stacks, &clock, &DeployConfig::new("dev", "eu-west-1"))
      .await
      .unwrap();

    assert_eq!(stacks.mutations(), vec!["delete dev-demo-r", "delete dev-demo-p"]);
    assert!(matches!(report.steps[0].outcome, StepOutcome::Deleted { .. }));
    assert!(matches!(report.steps[2].outcome, StepOutcome::Deleted { .. }));
  }

  #[tokio::test]
  async fn failed_delete_stops_before_earlier_stacks() {
    let temp = built_project();
    let stacks = deployed();
    stacks.after_delete("dev-demo-r", &[StackStatus::DeleteInProgress, StackStatus::DeleteFailed]);
    let clock = FakeClock::new();

    let err = confirmed(&temp, &stacks, &clock, &DeployConfig::new("dev", "eu-west-1"))
      .await
      .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StackTerminalFailure);
    assert_eq!(stacks.mutations(), vec!["delete dev-demo-r"]);
  }

  #[tokio::test]
  async fn delete_that_never_finishes_times_out() {
    let temp = built_project();
    let stacks = deployed();
    stacks.after_delete("dev-demo-r", &[StackStatus::DeleteInProgress]);
    let clock = FakeClock::new();
    let config = DeployConfig::new("dev", "eu-west-1").with_timeout_minutes(1);

    let err = confirmed(&temp, &stacks, &clock, &config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PollTimeout);
    assert_eq!(clock.now(), Duration::from_secs(60));
    assert_eq!(stacks.mutations(), vec!["delete dev-demo-r"]);
  }
}
