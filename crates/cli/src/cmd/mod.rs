mod apply;
mod build;
mod delete;
mod run;

pub use apply::cmd_apply;
pub use build::cmd_build;
pub use delete::cmd_delete;
pub use run::cmd_run;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use stratus_lib::config;
use stratus_lib::execute::{DeployConfig, ExecuteReport};
use stratus_lib::project::Project;
use stratus_lib::settings::{ParameterContext, load_parameters};
use stratus_lib::Error;

use crate::output::step_line;

/// A loaded project with its deploy configuration and parameters.
struct Deployment {
  project: Project,
  config: DeployConfig,
  parameters: BTreeMap<String, String>,
}

fn prepare(root: &Path, stage: &str, region: Option<&str>, timeout_minutes: Option<u64>) -> Result<Deployment> {
  let project = Project::load(root)?;
  let config =
    config::deploy_config(stage, region, project.default_region(), timeout_minutes).map_err(Error::from)?;
  let parameters = load_parameters(
    &project.root,
    &ParameterContext {
      stage: config.stage.clone(),
      region: config.region.clone(),
    },
  )
  .map_err(Error::from)?;
  debug!(
    stage = %config.stage,
    region = %config.region,
    parameters = parameters.len(),
    "prepared deployment"
  );

  Ok(Deployment {
    project,
    config,
    parameters,
  })
}

fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

fn print_steps(report: &ExecuteReport) {
  for step in &report.steps {
    println!("  {}", step_line(&step.artifact, &step.outcome.to_string()));
  }
}
