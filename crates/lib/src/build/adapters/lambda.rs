//! `lambda` resources: packaged functions.
//!
//! | stage | contribution |
//! |---|---|
//! | project (once) | versioned `CodeBucket` and its output |
//! | pre_resources | zip of the code plus an upload action |
//!
//! A function with a `context` map gets its package uploaded through
//! `InjectContextAndUpload`, which adds those values as a JSON entry
//! (`context-destination`, default `.context`) to the archive at apply time.
//! | resources | role, function, content-addressed version, `current` alias |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::debug;

use super::{ResourceAdapter, to_expr, to_expr_map};
use crate::build::{BuildContext, BuildError, StageOutput};
use crate::consts::CURRENT_ALIAS;
use crate::lrn::Lrn;
use crate::package;
use crate::project::{Resource, ResourceKind};
use crate::settings::{Schema, SettingValue, Settings};
use crate::template::actions::{Action, ActionValue, InjectContextAndUpload, OutputValue, UploadPackage};
use crate::template::native::Resource as NativeResource;
use crate::template::{Expr, TemplateStage};

/// Logical id (and output name) of the shared code bucket.
pub const CODE_BUCKET: &str = "CodeBucket";

const MEMORY_STEP: i64 = 64;
const MEMORY_RANGE: (i64, i64) = (128, 10240);
const DEFAULT_MEMORY: i64 = 128;
const TIMEOUT_RANGE: (i64, i64) = (1, 900);
const DEFAULT_TIMEOUT: i64 = 3;

const DEFAULT_CONTEXT_DESTINATION: &str = ".context";

const BASIC_EXECUTION_POLICY: &str = "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
  Python,
  Node,
}

impl Runtime {
  pub fn identifier(self) -> &'static str {
    match self {
      Runtime::Python => "python3.12",
      Runtime::Node => "nodejs20.x",
    }
  }

  fn from_extension(ext: &str) -> Option<Self> {
    match ext {
      "py" => Some(Runtime::Python),
      "js" => Some(Runtime::Node),
      _ => None,
    }
  }

  fn default_handler_module(self) -> &'static str {
    match self {
      Runtime::Python => "main",
      Runtime::Node => "index",
    }
  }
}

pub struct LambdaAdapter;

impl LambdaAdapter {
  /// Where the code of `resource` lives on disk.
  pub fn code_path(resource: &Resource) -> Result<PathBuf, BuildError> {
    let code = resource.settings.require_str("code")?;
    let path = resource.root.join(code);
    if !path.exists() {
      return Err(
        resource
          .settings
          .invalid_value("code", format!("{} does not exist", path.display()))
          .into(),
      );
    }
    Ok(path)
  }

  /// Object key (and build file name) of the package of `resource`.
  pub fn package_key(resource: &Resource) -> String {
    format!("{}.zip", resource.lrn.provisioning_id())
  }

  fn runtime(settings: &Settings, code: &Path) -> Result<(String, Option<Runtime>), BuildError> {
    if let Some(runtime) = settings.get_str("runtime")? {
      let known = if runtime.starts_with("python") {
        Some(Runtime::Python)
      } else if runtime.starts_with("nodejs") {
        Some(Runtime::Node)
      } else {
        None
      };
      return Ok((runtime.to_string(), known));
    }

    let inferred = infer_runtime(code)
      .ok_or_else(|| settings.invalid_value("runtime", "cannot infer a runtime from the code; set it explicitly"))?;
    Ok((inferred.identifier().to_string(), Some(inferred)))
  }

  fn handler(settings: &Settings, code: &Path, runtime: Option<Runtime>) -> Result<String, BuildError> {
    if let Some(handler) = settings.get_str("handler")? {
      return Ok(handler.to_string());
    }
    let module = if code.is_file() {
      code.file_stem().map(|s| s.to_string_lossy().to_string())
    } else {
      runtime.map(|r| r.default_handler_module().to_string())
    };
    module
      .map(|m| format!("{m}.handler"))
      .ok_or_else(|| settings.invalid_value("handler", "cannot infer a handler; set it explicitly").into())
  }

  /// The `context` map as action values; `ref://` entries are read from the
  /// apply context.
  fn context_to_inject(settings: &Settings) -> Result<Option<BTreeMap<String, ActionValue>>, BuildError> {
    let Some(entries) = settings.get_map("context")? else {
      return Ok(None);
    };
    let mut values = BTreeMap::new();
    for (name, value) in entries {
      let value = match value {
        SettingValue::Ref(reference) => ActionValue::reference(reference.clone()),
        SettingValue::String(s) => ActionValue::literal(s.clone()),
        SettingValue::Int(i) => ActionValue::literal(i.to_string()),
        SettingValue::Bool(b) => ActionValue::literal(b.to_string()),
        _ => {
          return Err(
            settings
              .invalid_value("context", format!("'{name}' must be a scalar or a ref:// reference"))
              .into(),
          );
        }
      };
      values.insert(name.clone(), value);
    }
    Ok(Some(values))
  }

  fn pre_resources(&self, resource: &Resource, out: &mut StageOutput, ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    let id = resource.lrn.provisioning_id();
    let key = Self::package_key(resource);
    let rel_path = ctx.package_rel_path(&key);

    let source = Self::code_path(resource)?;
    let digest = package::package(&source, &ctx.build_dir.join(&rel_path))?;
    debug!(lrn = %resource.lrn, digest = %digest.prefix(8), "packaged function code");

    let action_name = resource.lrn.to_string();
    let bucket = ActionValue::reference(CODE_BUCKET);
    let action = match Self::context_to_inject(&resource.settings)? {
      Some(context_to_inject) => Action::InjectContextAndUpload(InjectContextAndUpload {
        name: action_name.clone(),
        bucket,
        key: ActionValue::literal(key),
        filename: ActionValue::literal(rel_path),
        context_to_inject,
        context_destination: resource
          .settings
          .get_str("context-destination")?
          .unwrap_or(DEFAULT_CONTEXT_DESTINATION)
          .to_string(),
      }),
      None => Action::UploadPackage(UploadPackage {
        name: action_name.clone(),
        bucket,
        key: ActionValue::literal(key),
        filename: ActionValue::literal(rel_path),
      }),
    };
    out.actions.add(action)?;
    out.actions.add_output(
      format!("{id}S3Url"),
      OutputValue::GetAttr {
        action: action_name.clone(),
        attr: "url".to_string(),
      },
    );
    out.actions.add_output(
      format!("{id}S3Version"),
      OutputValue::GetAttr {
        action: action_name,
        attr: "version".to_string(),
      },
    );
    Ok(())
  }

  fn resources(&self, resource: &Resource, out: &mut StageOutput, ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    let settings = &resource.settings;
    let registry = &ctx.project.registry;
    let id = resource.lrn.provisioning_id();
    let code = Self::code_path(resource)?;

    let (runtime_id, runtime) = Self::runtime(settings, &code)?;
    let handler = Self::handler(settings, &code, runtime)?;
    let memory = clamp_memory(settings.get_int("memory")?.unwrap_or(DEFAULT_MEMORY));
    let timeout = settings
      .get_int("timeout")?
      .unwrap_or(DEFAULT_TIMEOUT)
      .clamp(TIMEOUT_RANGE.0, TIMEOUT_RANGE.1);

    let role = match settings.get("role") {
      Some(SettingValue::String(arn)) => Expr::Str(arn.clone()),
      Some(SettingValue::Ref(name)) => Expr::Ref(name.clone()),
      Some(SettingValue::Lrn(lrn)) => Expr::get_att(registry.resolve(lrn)?, "Arn"),
      Some(_) => return Err(settings.invalid_value("role", "must be a role ARN").into()),
      None => {
        let role_id = format!("{id}Role");
        out.native.add_resource(&role_id, self.role(resource, &id, ctx)?)?;
        Expr::get_att(role_id, "Arn")
      }
    };

    let mut function = NativeResource::new("AWS::Lambda::Function")
      .property(
        "Code",
        Expr::map([
          ("S3Bucket", Expr::reference(CODE_BUCKET)),
          ("S3Key", Expr::from(Self::package_key(resource))),
          ("S3ObjectVersion", Expr::reference(format!("{id}S3Version"))),
        ]),
      )
      .property("Handler", handler)
      .property("Runtime", runtime_id)
      .property("MemorySize", memory)
      .property("Timeout", timeout)
      .property("Role", role);

    if let Some(description) = settings.get_str("description")? {
      function = function.property("Description", description);
    }
    if let Some(environment) = settings.get_map("environment")? {
      function = function.property(
        "Environment",
        Expr::map([("Variables", Expr::Map(to_expr_map(environment, registry)?))]),
      );
    }
    out.native.add_resource(&id, function)?;

    // A new digest yields a new logical id, so changed code publishes a new
    // version while unchanged code keeps the existing one.
    let digest = package::source_digest(&code)?;
    let version_id = format!("{id}Version{}", digest.prefix(8));
    out.native.add_resource(
      &version_id,
      NativeResource::new("AWS::Lambda::Version").property("FunctionName", Expr::reference(&id)),
    )?;

    let alias_lrn = resource.lrn.with_alias(CURRENT_ALIAS);
    out.native.add_resource(
      registry.resolve(&alias_lrn)?,
      NativeResource::new("AWS::Lambda::Alias")
        .property("FunctionName", Expr::reference(&id))
        .property("FunctionVersion", Expr::get_att(version_id, "Version"))
        .property("Name", CURRENT_ALIAS),
    )?;

    Ok(())
  }

  fn role(&self, resource: &Resource, id: &str, ctx: &BuildContext<'_>) -> Result<NativeResource, BuildError> {
    let assume = json!({
      "Version": "2012-10-17",
      "Statement": [{
        "Effect": "Allow",
        "Principal": {"Service": ["lambda.amazonaws.com"]},
        "Action": ["sts:AssumeRole"],
      }],
    });
    let assume = Expr::try_from(assume).map_err(|message| resource.settings.invalid_value("role", message))?;

    let mut role = NativeResource::new("AWS::IAM::Role")
      .property("AssumeRolePolicyDocument", assume)
      .property("ManagedPolicyArns", vec![Expr::from(BASIC_EXECUTION_POLICY)]);

    if let Some(policies) = resource.settings.get_map("policies")? {
      let mut docs = Vec::new();
      for (name, document) in policies {
        docs.push(Expr::map([
          ("PolicyName", Expr::from(crate::lrn::template_name(&[id, name, "policy"]))),
          ("PolicyDocument", to_expr(document, &ctx.project.registry)?),
        ]));
      }
      role = role.property("Policies", docs);
    }
    Ok(role)
  }
}

impl ResourceAdapter for LambdaAdapter {
  fn kind(&self) -> ResourceKind {
    ResourceKind::Lambda
  }

  fn schema(&self) -> Schema {
    Schema {
      required: &["code"],
      optional: &[
        "runtime",
        "handler",
        "memory",
        "timeout",
        "description",
        "role",
        "policies",
        "environment",
        "local-command",
        "context",
        "context-destination",
      ],
    }
  }

  fn names(&self, resource: &Resource) -> Vec<Lrn> {
    vec![resource.lrn.clone(), resource.lrn.with_alias(CURRENT_ALIAS)]
  }

  fn kind_hook(&self, stage: TemplateStage, out: &mut StageOutput, ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    if stage != TemplateStage::Project {
      return Ok(());
    }

    let mut bucket = NativeResource::new("AWS::S3::Bucket").property(
      "VersioningConfiguration",
      Expr::map([("Status", Expr::from("Enabled"))]),
    );
    if let Some(name) = &ctx.project.settings.code_bucket {
      bucket = bucket.property("BucketName", name.as_str());
    }
    out.native.add_resource(CODE_BUCKET, bucket)?;
    out.native.add_output(CODE_BUCKET, Expr::reference(CODE_BUCKET))?;
    Ok(())
  }

  fn instance_hook(
    &self,
    stage: TemplateStage,
    resource: &Resource,
    out: &mut StageOutput,
    ctx: &BuildContext<'_>,
  ) -> Result<(), BuildError> {
    match stage {
      TemplateStage::PreResources => self.pre_resources(resource, out, ctx),
      TemplateStage::Resources => self.resources(resource, out, ctx),
      _ => Ok(()),
    }
  }
}

/// Round down to a multiple of 64 and clamp to the supported range.
fn clamp_memory(memory: i64) -> i64 {
  (memory - memory.rem_euclid(MEMORY_STEP)).clamp(MEMORY_RANGE.0, MEMORY_RANGE.1)
}

/// Runtime implied by the code: the extension of a single file, or of the
/// first recognizable file of a directory.
fn infer_runtime(code: &Path) -> Option<Runtime> {
  if code.is_file() {
    return code.extension().and_then(|e| e.to_str()).and_then(Runtime::from_extension);
  }
  walkdir::WalkDir::new(code)
    .sort_by_file_name()
    .into_iter()
    .filter_map(Result::ok)
    .filter(|e| e.file_type().is_file())
    .find_map(|e| e.path().extension().and_then(|x| x.to_str()).and_then(Runtime::from_extension))
}
