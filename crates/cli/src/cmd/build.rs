//! Implementation of the `stratus build` command.

use std::path::Path;

use anyhow::Result;

use stratus_lib::Error;
use stratus_lib::build::build;
use stratus_lib::project::Project;

use crate::output::{print_info, print_success};

/// Build the project at `root` into `<root>/_build`.
pub fn cmd_build(root: &Path) -> Result<()> {
  let project = Project::load(root)?;
  print_info(&format!(
    "Building {} ({} resource(s))",
    project.name,
    project.resources.len()
  ));

  let report = build(&project).map_err(Error::from)?;
  for path in &report.artifacts {
    if let Some(name) = path.file_name() {
      println!("  {}", name.to_string_lossy());
    }
  }

  print_success(&format!(
    "Wrote {} artifact(s) to {}",
    report.artifacts.len(),
    project.build_dir().display()
  ));
  Ok(())
}
