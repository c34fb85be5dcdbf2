//! Build artifacts on disk.
//!
//! Each non-empty stage is written to `NNNN_<suffix>.json` in the build
//! directory. The sequence prefix orders artifacts for apply; the suffix says
//! which stage produced the file and therefore what kind of document it holds.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};

use super::actions::ActionTemplate;
use super::native::NativeTemplate;
use super::{StageKind, TemplateError, TemplateStage};
use crate::consts::{ACTIONS_TEMPLATE_MARKER, ARTIFACT_SEQUENCE_WIDTH};

/// A build artifact found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  pub sequence: u32,
  pub stage: TemplateStage,
  pub path: PathBuf,
}

impl Artifact {
  /// File name without directory, e.g. `0002_pr_r.json`.
  pub fn file_name(&self) -> String {
    file_name(self.sequence, self.stage)
  }

  /// Suffix of the artifact, used to name its remote stack.
  pub fn suffix(&self) -> &'static str {
    self.stage.suffix()
  }

  /// Read and classify the document, cross-checking the `_type` marker
  /// against the stage the file name claims.
  pub fn load(&self) -> Result<Document, TemplateError> {
    let body = fs::read_to_string(&self.path).map_err(|source| TemplateError::Read {
      path: self.path.clone(),
      source,
    })?;
    let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| TemplateError::Parse {
      path: self.path.clone(),
      message: e.to_string(),
    })?;

    let marked_as_actions = value.get("_type").and_then(|v| v.as_str()) == Some(ACTIONS_TEMPLATE_MARKER);
    let parse_err = |e: serde_json::Error| TemplateError::Parse {
      path: self.path.clone(),
      message: e.to_string(),
    };

    match (self.stage.kind(), marked_as_actions) {
      (StageKind::Native, false) => {
        let template: NativeTemplate = serde_json::from_value(value).map_err(parse_err)?;
        Ok(Document::Native { template, body })
      }
      (StageKind::Actions, true) => {
        let template: ActionTemplate = serde_json::from_value(value).map_err(parse_err)?;
        template.check_names()?;
        Ok(Document::Actions(template))
      }
      (expected, _) => Err(TemplateError::KindMismatch {
        path: self.path.clone(),
        expected,
      }),
    }
  }
}

/// The content of an artifact.
#[derive(Debug, Clone)]
pub enum Document {
  /// A native template, with the exact text sent to the remote service.
  Native { template: NativeTemplate, body: String },
  Actions(ActionTemplate),
}

pub fn file_name(sequence: u32, stage: TemplateStage) -> String {
  format!(
    "{:0width$}_{}.json",
    sequence,
    stage.suffix(),
    width = ARTIFACT_SEQUENCE_WIDTH
  )
}

/// Split `NNNN_<suffix>.json` into its parts. Returns `None` for any other
/// file name.
pub fn parse_file_name(name: &str) -> Option<(u32, &str)> {
  let stem = name.strip_suffix(".json")?;
  let (prefix, suffix) = stem.split_once('_')?;
  if prefix.len() != ARTIFACT_SEQUENCE_WIDTH || !prefix.bytes().all(|b| b.is_ascii_digit()) || suffix.is_empty() {
    return None;
  }
  Some((prefix.parse().ok()?, suffix))
}

/// Serialize `document` to `dir/NNNN_<suffix>.json`.
pub fn write<T: Serialize>(dir: &Path, sequence: u32, stage: TemplateStage, document: &T) -> Result<PathBuf, TemplateError> {
  let path = dir.join(file_name(sequence, stage));
  let mut body = serde_json::to_string_pretty(document).map_err(|e| TemplateError::Parse {
    path: path.clone(),
    message: e.to_string(),
  })?;
  body.push('\n');

  fs::write(&path, body).map_err(|source| TemplateError::Write {
    path: path.clone(),
    source,
  })?;
  trace!(path = %path.display(), "wrote artifact");
  Ok(path)
}

/// List the artifacts of a build directory, ordered by sequence number.
///
/// Files that do not look like artifacts are ignored. A missing directory
/// means no build was performed.
pub fn list(dir: &Path) -> Result<Vec<Artifact>, TemplateError> {
  if !dir.is_dir() {
    return Err(TemplateError::BuildNotPerformed(dir.to_path_buf()));
  }

  let entries = fs::read_dir(dir).map_err(|source| TemplateError::Read {
    path: dir.to_path_buf(),
    source,
  })?;

  let mut artifacts = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|source| TemplateError::Read {
      path: dir.to_path_buf(),
      source,
    })?;
    let name = entry.file_name().to_string_lossy().to_string();
    let Some((sequence, suffix)) = parse_file_name(&name) else {
      trace!(file = %name, "ignoring non-artifact file");
      continue;
    };
    let stage = TemplateStage::from_suffix(suffix).ok_or_else(|| TemplateError::UnknownStage {
      path: entry.path(),
      suffix: suffix.to_string(),
    })?;
    artifacts.push(Artifact {
      sequence,
      stage,
      path: entry.path(),
    });
  }

  artifacts.sort_by_key(|a| a.sequence);
  debug!(count = artifacts.len(), dir = %dir.display(), "found artifacts");
  Ok(artifacts)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::template::actions::ActionTemplate;
  use crate::template::native::Resource;
  use tempfile::TempDir;

  #[test]
  fn file_names_are_zero_padded() {
    assert_eq!(file_name(0, TemplateStage::Project), "0000_p.json");
    assert_eq!(file_name(12, TemplateStage::PostResources), "0012_ps_r.json");
  }

  #[test]
  fn parses_only_artifact_names() {
    assert_eq!(parse_file_name("0003_pr_r.json"), Some((3, "pr_r")));
    assert_eq!(parse_file_name("003_r.json"), None);
    assert_eq!(parse_file_name("0003_.json"), None);
    assert_eq!(parse_file_name("0003_r.yml"), None);
    assert_eq!(parse_file_name("abcd_r.json"), None);
  }

  #[test]
  fn missing_directory_means_no_build() {
    let temp = TempDir::new().unwrap();
    let err = list(&temp.path().join("_build")).unwrap_err();
    assert!(matches!(err, TemplateError::BuildNotPerformed(_)));
  }

  #[test]
  fn lists_in_numeric_order_and_skips_other_files() {
    let temp = TempDir::new().unwrap();
    let native = NativeTemplate::new();
    write(temp.path(), 10, TemplateStage::Resources, &native).unwrap();
    write(temp.path(), 2, TemplateStage::Project, &native).unwrap();
    fs::write(temp.path().join("notes.txt"), "x").unwrap();
    fs::create_dir(temp.path().join("code")).unwrap();

    let artifacts = list(temp.path()).unwrap();
    let names: Vec<String> = artifacts.iter().map(Artifact::file_name).collect();
    assert_eq!(names, vec!["0002_p.json", "0010_r.json"]);
  }

  #[test]
  fn unknown_suffix_is_an_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("0001_zz.json"), "{}").unwrap();
    assert!(matches!(list(temp.path()), Err(TemplateError::UnknownStage { .. })));
  }

  #[test]
  fn load_cross_checks_marker_against_stage() {
    let temp = TempDir::new().unwrap();
    let path = write(temp.path(), 0, TemplateStage::Resources, &ActionTemplate::new()).unwrap();
    let artifact = Artifact {
      sequence: 0,
      stage: TemplateStage::Resources,
      path,
    };
    assert!(matches!(
      artifact.load(),
      Err(TemplateError::KindMismatch {
        expected: StageKind::Native,
        ..
      })
    ));
  }

  #[test]
  fn load_returns_native_body_verbatim() {
    let temp = TempDir::new().unwrap();
    let mut native = NativeTemplate::new();
    native.add_resource("Bucket", Resource::new("AWS::S3::Bucket")).unwrap();
    let path = write(temp.path(), 1, TemplateStage::Project, &native).unwrap();

    let artifact = Artifact {
      sequence: 1,
      stage: TemplateStage::Project,
      path: path.clone(),
    };
    match artifact.load().unwrap() {
      Document::Native { template, body } => {
        assert_eq!(template, native);
        assert_eq!(body, fs::read_to_string(path).unwrap());
      }
      Document::Actions(_) => panic!("expected a native template"),
    }
  }

  #[test]
  fn load_rejects_repeated_action_names() {
    let temp = TempDir::new().unwrap();
    let upload = serde_json::json!({
      "_type": "UploadPackage",
      "name": "lambda::hello",
      "bucket": {"_type": "Ref", "name": "CodeBucket"},
      "key": {"_type": "Literal", "value": "LambdaHello.zip"},
      "filename": {"_type": "Literal", "value": "code/LambdaHello.zip"},
    });
    let path = temp.path().join("0002_pr_r.json");
    let body = serde_json::json!({"_type": "ActionsTemplate", "Actions": [upload.clone(), upload]});
    fs::write(&path, body.to_string()).unwrap();

    let artifact = Artifact {
      sequence: 2,
      stage: TemplateStage::PreResources,
      path,
    };
    assert!(matches!(artifact.load(), Err(TemplateError::DuplicateActionName(ref name)) if name == "lambda::hello"));
  }
}
