//! Remote stack statuses.

use std::fmt;

/// How a status should be treated while waiting on a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
  Succeeded,
  Failed,
  InProgress,
}

/// Status of a remote stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackStatus {
  CreateInProgress,
  CreateFailed,
  CreateComplete,
  RollbackInProgress,
  RollbackFailed,
  RollbackComplete,
  DeleteInProgress,
  DeleteFailed,
  DeleteComplete,
  UpdateInProgress,
  UpdateCompleteCleanupInProgress,
  UpdateComplete,
  UpdateFailed,
  UpdateRollbackInProgress,
  UpdateRollbackFailed,
  UpdateRollbackCompleteCleanupInProgress,
  UpdateRollbackComplete,
  ReviewInProgress,
  ImportInProgress,
  ImportComplete,
  ImportRollbackInProgress,
  ImportRollbackFailed,
  ImportRollbackComplete,
  /// A status this version does not know about.
  Other(String),
}

impl StackStatus {
  const KNOWN: [StackStatus; 23] = [
    StackStatus::CreateInProgress,
    StackStatus::CreateFailed,
    StackStatus::CreateComplete,
    StackStatus::RollbackInProgress,
    StackStatus::RollbackFailed,
    StackStatus::RollbackComplete,
    StackStatus::DeleteInProgress,
    StackStatus::DeleteFailed,
    StackStatus::DeleteComplete,
    StackStatus::UpdateInProgress,
    StackStatus::UpdateCompleteCleanupInProgress,
    StackStatus::UpdateComplete,
    StackStatus::UpdateFailed,
    StackStatus::UpdateRollbackInProgress,
    StackStatus::UpdateRollbackFailed,
    StackStatus::UpdateRollbackCompleteCleanupInProgress,
    StackStatus::UpdateRollbackComplete,
    StackStatus::ReviewInProgress,
    StackStatus::ImportInProgress,
    StackStatus::ImportComplete,
    StackStatus::ImportRollbackInProgress,
    StackStatus::ImportRollbackFailed,
    StackStatus::ImportRollbackComplete,
  ];

  pub fn parse(s: &str) -> Self {
    Self::KNOWN
      .into_iter()
      .find(|status| status.as_str() == s)
      .unwrap_or_else(|| StackStatus::Other(s.to_string()))
  }

  pub fn as_str(&self) -> &str {
    match self {
      StackStatus::CreateInProgress => "CREATE_IN_PROGRESS",
      StackStatus::CreateFailed => "CREATE_FAILED",
      StackStatus::CreateComplete => "CREATE_COMPLETE",
      StackStatus::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
      StackStatus::RollbackFailed => "ROLLBACK_FAILED",
      StackStatus::RollbackComplete => "ROLLBACK_COMPLETE",
      StackStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
      StackStatus::DeleteFailed => "DELETE_FAILED",
      StackStatus::DeleteComplete => "DELETE_COMPLETE",
      StackStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
      StackStatus::UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
      StackStatus::UpdateComplete => "UPDATE_COMPLETE",
      StackStatus::UpdateFailed => "UPDATE_FAILED",
      StackStatus::UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
      StackStatus::UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
      StackStatus::UpdateRollbackCompleteCleanupInProgress => "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
      StackStatus::UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
      StackStatus::ReviewInProgress => "REVIEW_IN_PROGRESS",
      StackStatus::ImportInProgress => "IMPORT_IN_PROGRESS",
      StackStatus::ImportComplete => "IMPORT_COMPLETE",
      StackStatus::ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
      StackStatus::ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
      StackStatus::ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
      StackStatus::Other(s) => s,
    }
  }

  /// States an existing stack cannot be updated from.
  pub fn is_unrecoverable(&self) -> bool {
    matches!(
      self,
      StackStatus::CreateFailed
        | StackStatus::RollbackFailed
        | StackStatus::RollbackComplete
        | StackStatus::DeleteFailed
        | StackStatus::UpdateRollbackFailed
        | StackStatus::UpdateRollbackComplete
    )
  }

  pub fn is_in_progress(&self) -> bool {
    self.as_str().ends_with("_IN_PROGRESS")
  }

  /// Classify a status observed while waiting for an operation we started.
  ///
  /// Rollbacks count as failures even once they complete, since they mean
  /// the requested change was not applied.
  pub fn settlement(&self) -> Settlement {
    match self {
      StackStatus::CreateComplete
      | StackStatus::UpdateComplete
      | StackStatus::DeleteComplete
      | StackStatus::ImportComplete
      | StackStatus::UpdateCompleteCleanupInProgress => Settlement::Succeeded,
      StackStatus::RollbackComplete
      | StackStatus::UpdateRollbackComplete
      | StackStatus::UpdateRollbackCompleteCleanupInProgress
      | StackStatus::ImportRollbackComplete => Settlement::Failed,
      status if status.as_str().ends_with("_FAILED") => Settlement::Failed,
      status if status.is_in_progress() => Settlement::InProgress,
      _ => Settlement::Failed,
    }
  }

  /// Classify a status observed after a delete was accepted.
  ///
  /// The service may keep reporting the status from before the delete for a
  /// while, so anything but `DELETE_COMPLETE` or `DELETE_FAILED` is still
  /// in progress.
  pub fn delete_settlement(&self) -> Settlement {
    match self {
      StackStatus::DeleteComplete => Settlement::Succeeded,
      StackStatus::DeleteFailed => Settlement::Failed,
      _ => Settlement::InProgress,
    }
  }
}

impl fmt::Display for StackStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_and_unknown_statuses() {
    assert_eq!(StackStatus::parse("UPDATE_ROLLBACK_COMPLETE"), StackStatus::UpdateRollbackComplete);
    assert_eq!(
      StackStatus::parse("SOMETHING_NEW"),
      StackStatus::Other("SOMETHING_NEW".to_string())
    );
    for status in StackStatus::KNOWN {
      assert_eq!(StackStatus::parse(status.as_str()), status);
    }
  }

  #[test]
  fn unrecoverable_set() {
    let unrecoverable: Vec<&str> = StackStatus::KNOWN
      .iter()
      .filter(|s| s.is_unrecoverable())
      .map(|s| s.as_str())
      .collect();
    assert_eq!(
      unrecoverable,
      vec![
        "CREATE_FAILED",
        "ROLLBACK_FAILED",
        "ROLLBACK_COMPLETE",
        "DELETE_FAILED",
        "UPDATE_ROLLBACK_FAILED",
        "UPDATE_ROLLBACK_COMPLETE",
      ]
    );
  }

  #[test]
  fn settlement_classification() {
    assert_eq!(StackStatus::CreateComplete.settlement(), Settlement::Succeeded);
    assert_eq!(StackStatus::UpdateCompleteCleanupInProgress.settlement(), Settlement::Succeeded);
    assert_eq!(StackStatus::CreateInProgress.settlement(), Settlement::InProgress);
    assert_eq!(StackStatus::RollbackInProgress.settlement(), Settlement::InProgress);
    assert_eq!(StackStatus::UpdateRollbackCompleteCleanupInProgress.settlement(), Settlement::Failed);
    assert_eq!(StackStatus::RollbackComplete.settlement(), Settlement::Failed);
    assert_eq!(StackStatus::UpdateFailed.settlement(), Settlement::Failed);
    assert_eq!(StackStatus::Other("WEIRD".to_string()).settlement(), Settlement::Failed);
  }

  #[test]
  fn delete_settlement_only_trusts_delete_statuses() {
    assert_eq!(StackStatus::DeleteComplete.delete_settlement(), Settlement::Succeeded);
    assert_eq!(StackStatus::DeleteFailed.delete_settlement(), Settlement::Failed);
    for status in [
      StackStatus::CreateComplete,
      StackStatus::UpdateComplete,
      StackStatus::UpdateCompleteCleanupInProgress,
      StackStatus::RollbackComplete,
      StackStatus::UpdateRollbackComplete,
      StackStatus::DeleteInProgress,
    ] {
      assert_eq!(status.delete_settlement(), Settlement::InProgress, "{status}");
    }
  }
}
