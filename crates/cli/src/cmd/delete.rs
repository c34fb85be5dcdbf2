//! Implementation of the `stratus delete` command.

use std::path::Path;

use anyhow::Result;

use stratus_lib::Error;
use stratus_lib::aws::AwsServices;
use stratus_lib::execute::{Remote, SystemClock, delete};

use super::{prepare, print_steps, runtime};
use crate::output::{print_info, print_success, print_warning};

/// Delete the stacks of the last build of `root` from `stage`.
///
/// Without `confirm` nothing is deleted; the stacks that would go are listed.
pub fn cmd_delete(root: &Path, stage: &str, region: Option<&str>, confirm: bool) -> Result<()> {
  let deployment = prepare(root, stage, region, None)?;
  let config = &deployment.config;

  print_info(&format!(
    "Deleting {} from {} in {}",
    deployment.project.name, config.stage, config.region
  ));

  let rt = runtime()?;
  let report = rt.block_on(async {
    let aws = AwsServices::connect(&config.region).await;
    let clock = SystemClock::new();
    let remote = Remote {
      stacks: &aws.stacks,
      objects: &aws.objects,
      clock: &clock,
    };
    delete(
      &deployment.project.build_dir(),
      &deployment.project.name,
      config,
      confirm,
      &remote,
    )
    .await
    .map_err(Error::from)
  })?;

  print_steps(&report);
  println!();
  if confirm {
    print_success("Delete complete");
  } else {
    print_warning("Dry run; pass --confirm to delete these stacks");
  }
  Ok(())
}
