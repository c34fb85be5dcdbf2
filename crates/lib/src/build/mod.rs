//! The build pipeline.
//!
//! Builds turn a loaded [`Project`] into an ordered list of artifacts in
//! `<project>/_build`. Every build starts from an empty directory, and two
//! builds of unchanged sources write byte-identical files.
//!
//! # Stages
//!
//! For each [`TemplateStage`] in order, every resource kind with at least one
//! instance runs its kind hook, then the instance hook of each of its
//! resources sorted by LRN. A stage that produced nothing writes nothing and
//! does not consume a sequence number.
//!
//! # Submodules
//!
//! - [`adapters`] - per-kind hooks

pub mod adapters;
mod types;

use std::fs;

use tracing::{debug, info};

use crate::consts::CODE_DIR;
use crate::project::{Project, ResourceKind};
use crate::template::{StageKind, TemplateStage, artifact};

pub use types::*;

/// Build `project` into its build directory.
pub fn build(project: &Project) -> Result<BuildReport, BuildError> {
  let build_dir = project.build_dir();
  reset_dir(&build_dir)?;
  let code_dir = build_dir.join(CODE_DIR);
  fs::create_dir_all(&code_dir).map_err(|source| BuildError::Io { path: code_dir, source })?;

  let ctx = BuildContext {
    project,
    build_dir: &build_dir,
  };

  let mut report = BuildReport::default();
  let mut sequence = 0;

  for stage in TemplateStage::ALL {
    let mut output = StageOutput::default();

    for kind in ResourceKind::ALL {
      let instances: Vec<_> = project.resources_of(kind).collect();
      if instances.is_empty() {
        continue;
      }
      let adapter = adapters::adapter(kind);
      adapter.kind_hook(stage, &mut output, &ctx)?;
      for resource in instances {
        adapter.instance_hook(stage, resource, &mut output, &ctx)?;
      }
    }

    let StageOutput { mut native, actions } = output;
    let path = match stage.kind() {
      StageKind::Native => {
        if !actions.is_empty() {
          return Err(BuildError::StageKindMismatch { stage });
        }
        if native.is_empty() {
          debug!(%stage, "stage is empty");
          continue;
        }
        native.promote_forward_refs();
        sequence += 1;
        artifact::write(&build_dir, sequence, stage, &native)?
      }
      StageKind::Actions => {
        if !native.is_empty() {
          return Err(BuildError::StageKindMismatch { stage });
        }
        if actions.is_empty() {
          debug!(%stage, "stage is empty");
          continue;
        }
        sequence += 1;
        artifact::write(&build_dir, sequence, stage, &actions)?
      }
    };

    info!(%stage, artifact = %path.display(), "wrote artifact");
    report.artifacts.push(path);
  }

  Ok(report)
}

fn reset_dir(dir: &std::path::Path) -> Result<(), BuildError> {
  if dir.exists() {
    fs::remove_dir_all(dir).map_err(|source| BuildError::Io {
      path: dir.to_path_buf(),
      source,
    })?;
  }
  fs::create_dir_all(dir).map_err(|source| BuildError::Io {
    path: dir.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::template::{ActionTemplate, NativeTemplate};
  use crate::util::testutil::{hello_project, write_file};
  use tempfile::TempDir;

  fn file_names(report: &BuildReport) -> Vec<String> {
    report
      .artifacts
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
      .collect()
  }

  #[test]
  fn empty_project_writes_no_artifacts() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "settings.yml", "project: demo\n");

    let project = Project::load(temp.path()).unwrap();
    let report = build(&project).unwrap();
    assert!(report.artifacts.is_empty());
    assert!(temp.path().join("_build").is_dir());
  }

  #[test]
  fn lambda_project_skips_empty_stages() {
    let temp = TempDir::new().unwrap();
    hello_project(temp.path());

    let project = Project::load(temp.path()).unwrap();
    let report = build(&project).unwrap();
    assert_eq!(file_names(&report), vec!["0001_p.json", "0002_pr_r.json", "0003_r.json"]);
    assert!(temp.path().join("_build/code/LambdaHello.zip").is_file());
  }

  #[test]
  fn stage_files_hold_the_right_document_kind() {
    let temp = TempDir::new().unwrap();
    hello_project(temp.path());
    let project = Project::load(temp.path()).unwrap();
    build(&project).unwrap();

    let p = fs::read_to_string(temp.path().join("_build/0001_p.json")).unwrap();
    let pr_r = fs::read_to_string(temp.path().join("_build/0002_pr_r.json")).unwrap();
    let r = fs::read_to_string(temp.path().join("_build/0003_r.json")).unwrap();

    serde_json::from_str::<NativeTemplate>(&p).unwrap();
    serde_json::from_str::<ActionTemplate>(&pr_r).unwrap();
    let resources: NativeTemplate = serde_json::from_str(&r).unwrap();

    assert!(!p.contains("_type"));
    assert!(resources.parameters.contains_key("CodeBucket"));
    assert!(resources.parameters.contains_key("LambdaHelloS3Version"));
  }

  #[test]
  fn builds_are_byte_identical() {
    let temp = TempDir::new().unwrap();
    hello_project(temp.path());
    let project = Project::load(temp.path()).unwrap();

    build(&project).unwrap();
    let first: Vec<Vec<u8>> = ["0001_p.json", "0002_pr_r.json", "0003_r.json", "code/LambdaHello.zip"]
      .iter()
      .map(|f| fs::read(temp.path().join("_build").join(f)).unwrap())
      .collect();

    build(&project).unwrap();
    let second: Vec<Vec<u8>> = ["0001_p.json", "0002_pr_r.json", "0003_r.json", "code/LambdaHello.zip"]
      .iter()
      .map(|f| fs::read(temp.path().join("_build").join(f)).unwrap())
      .collect();

    assert_eq!(first, second);
  }

  #[test]
  fn build_directory_is_wiped() {
    let temp = TempDir::new().unwrap();
    hello_project(temp.path());
    write_file(temp.path(), "_build/0009_r.json", "{}");

    let project = Project::load(temp.path()).unwrap();
    build(&project).unwrap();
    assert!(!temp.path().join("_build/0009_r.json").exists());
  }
}
