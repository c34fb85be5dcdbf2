//! Implementation of the `stratus apply` command.
//!
//! Applies the artifacts of the last build, in order, to one stage.

use std::path::Path;

use anyhow::Result;

use stratus_lib::Error;
use stratus_lib::aws::AwsServices;
use stratus_lib::execute::{Remote, SystemClock, apply};

use super::{prepare, print_steps, runtime};
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

/// Apply the last build of `root` to `stage`.
///
/// Prints one line per artifact and then the final outputs, either as text
/// or as a JSON object.
pub fn cmd_apply(
  root: &Path,
  stage: &str,
  region: Option<&str>,
  timeout_minutes: Option<u64>,
  format: OutputFormat,
) -> Result<()> {
  let deployment = prepare(root, stage, region, timeout_minutes)?;
  let config = &deployment.config;

  if !format.is_json() {
    print_info(&format!(
      "Applying {} to {} in {}",
      deployment.project.name, config.stage, config.region
    ));
  }

  let rt = runtime()?;
  let report = rt.block_on(async {
    let aws = AwsServices::connect(&config.region).await;
    let clock = SystemClock::new();
    let remote = Remote {
      stacks: &aws.stacks,
      objects: &aws.objects,
      clock: &clock,
    };
    apply(
      &deployment.project.build_dir(),
      &deployment.project.name,
      config,
      deployment.parameters.clone(),
      &remote,
    )
    .await
    .map_err(Error::from)
  })?;

  if format.is_json() {
    return print_json(&report.context);
  }

  print_steps(&report);
  println!();
  for (key, value) in &report.context {
    print_stat(key, value);
  }
  print_success(&format!("Applied {} artifact(s)", report.steps.len()));
  Ok(())
}
