//! Implementation of the `stratus run` command.

use std::path::Path;

use anyhow::Result;

use stratus_lib::Error;
use stratus_lib::invoke::{load_event, run_local};
use stratus_lib::lrn::Lrn;
use stratus_lib::project::Project;

use super::runtime;

/// Run the function `lrn` locally and print what it wrote to stdout.
pub fn cmd_run(root: &Path, lrn: &str, event: Option<&Path>) -> Result<()> {
  let project = Project::load(root)?;
  let lrn: Lrn = lrn.parse().map_err(Error::from)?;
  let event = load_event(event).map_err(Error::from)?;

  let rt = runtime()?;
  let output = rt
    .block_on(run_local(&project, &lrn, &event))
    .map_err(Error::from)?;

  println!("{output}");
  Ok(())
}
