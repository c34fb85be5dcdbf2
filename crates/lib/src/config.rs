//! Deployment configuration: stage names and region resolution.

use tracing::debug;

use crate::consts::{FALLBACK_REGION, REGION_ENV_VARS};
use crate::execute::DeployConfig;
use crate::settings::SettingsError;

const STAGE_LENGTH: (usize, usize) = (2, 32);

/// Stage names are 2 to 32 characters of `[a-z0-9-]`.
pub fn validate_stage(stage: &str) -> Result<(), SettingsError> {
  let invalid = |message: String| SettingsError::InvalidValue {
    owner: "command line".to_string(),
    key: "stage".to_string(),
    message,
  };

  if !(STAGE_LENGTH.0..=STAGE_LENGTH.1).contains(&stage.len()) {
    return Err(invalid(format!(
      "'{stage}' must be {} to {} characters long",
      STAGE_LENGTH.0, STAGE_LENGTH.1
    )));
  }
  if let Some(c) = stage
    .chars()
    .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
  {
    return Err(invalid(format!("'{stage}' contains '{c}'; use lowercase letters, digits and '-'")));
  }
  Ok(())
}

/// Resolve the deployment region from the process environment.
///
/// Order: `flag`, `STRATUS_REGION`, `AWS_DEFAULT_REGION`, the project's
/// `default-region`, then `us-east-1`.
pub fn resolve_region(flag: Option<&str>, project_default: Option<&str>) -> String {
  resolve_region_with(flag, project_default, |name| std::env::var(name).ok())
}

/// [`resolve_region`] with an explicit environment lookup.
pub fn resolve_region_with(
  flag: Option<&str>,
  project_default: Option<&str>,
  env: impl Fn(&str) -> Option<String>,
) -> String {
  let non_empty = |s: &str| !s.trim().is_empty();

  if let Some(region) = flag.filter(|r| non_empty(r)) {
    debug!(region, source = "flag", "resolved region");
    return region.to_string();
  }
  for &name in REGION_ENV_VARS {
    if let Some(region) = env(name).filter(|r| non_empty(r)) {
      debug!(region = %region, source = name, "resolved region");
      return region;
    }
  }
  if let Some(region) = project_default.filter(|r| non_empty(r)) {
    debug!(region, source = "project", "resolved region");
    return region.to_string();
  }
  FALLBACK_REGION.to_string()
}

/// Build the deploy configuration for one command invocation.
pub fn deploy_config(
  stage: &str,
  region_flag: Option<&str>,
  project_default: Option<&str>,
  timeout_minutes: Option<u64>,
) -> Result<DeployConfig, SettingsError> {
  validate_stage(stage)?;
  let config = DeployConfig::new(stage, resolve_region(region_flag, project_default));
  Ok(match timeout_minutes {
    Some(minutes) => config.with_timeout_minutes(minutes.max(1)),
    None => config,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;
  use serial_test::serial;
  use std::time::Duration;

  #[test]
  fn stage_names() {
    assert!(validate_stage("dev").is_ok());
    assert!(validate_stage("pr-1234").is_ok());
    assert!(validate_stage(&"a".repeat(32)).is_ok());

    let long = "a".repeat(33);
    for bad in ["d", "Dev", "dev_1", "dev.x", long.as_str()] {
      let err = validate_stage(bad).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
    }
  }

  #[test]
  fn region_precedence() {
    let env = |name: &str| match name {
      "STRATUS_REGION" => Some("eu-central-1".to_string()),
      "AWS_DEFAULT_REGION" => Some("us-west-2".to_string()),
      _ => None,
    };
    assert_eq!(resolve_region_with(Some("ap-south-1"), Some("eu-west-1"), env), "ap-south-1");
    assert_eq!(resolve_region_with(None, Some("eu-west-1"), env), "eu-central-1");

    let aws_only = |name: &str| (name == "AWS_DEFAULT_REGION").then(|| "us-west-2".to_string());
    assert_eq!(resolve_region_with(None, Some("eu-west-1"), aws_only), "us-west-2");

    let empty = |_: &str| None;
    assert_eq!(resolve_region_with(None, Some("eu-west-1"), empty), "eu-west-1");
    assert_eq!(resolve_region_with(Some(""), None, empty), "us-east-1");
  }

  #[test]
  #[serial]
  fn region_is_read_from_process_environment() {
    temp_env::with_vars(
      [("STRATUS_REGION", Some("sa-east-1")), ("AWS_DEFAULT_REGION", None::<&str>)],
      || {
        assert_eq!(resolve_region(None, Some("eu-west-1")), "sa-east-1");
      },
    );
    temp_env::with_vars(
      [("STRATUS_REGION", None::<&str>), ("AWS_DEFAULT_REGION", None::<&str>)],
      || {
        assert_eq!(resolve_region(None, None), "us-east-1");
      },
    );
  }

  #[test]
  #[serial]
  fn deploy_config_applies_timeout() {
    temp_env::with_vars(
      [("STRATUS_REGION", None::<&str>), ("AWS_DEFAULT_REGION", None::<&str>)],
      || {
        let config = deploy_config("dev", None, Some("eu-west-1"), Some(3)).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.timeout, Duration::from_secs(180));
        assert!(deploy_config("DEV", None, None, None).is_err());
      },
    );
  }
}
