//! `extension` resources: custom resources served by one of the project's
//! functions.

use super::{ResourceAdapter, to_expr_map};
use crate::build::{BuildContext, BuildError, StageOutput};
use crate::lrn::template_name;
use crate::project::{Resource, ResourceKind};
use crate::settings::Schema;
use crate::template::native::Resource as NativeResource;
use crate::template::{Expr, TemplateStage};

pub struct ExtensionAdapter;

impl ResourceAdapter for ExtensionAdapter {
  fn kind(&self) -> ResourceKind {
    ResourceKind::Extension
  }

  fn schema(&self) -> Schema {
    Schema {
      required: &["handler"],
      optional: &["properties", "resource-type"],
    }
  }

  fn instance_hook(
    &self,
    stage: TemplateStage,
    resource: &Resource,
    out: &mut StageOutput,
    ctx: &BuildContext<'_>,
  ) -> Result<(), BuildError> {
    if stage != TemplateStage::Resources {
      return Ok(());
    }

    let settings = &resource.settings;
    let registry = &ctx.project.registry;

    let handler = settings
      .get_lrn("handler", |name| resource.sibling(ResourceKind::Lambda, name))?
      .ok_or_else(|| settings.invalid_value("handler", "is required"))?;
    let function_id = registry.resolve(&handler.base())?;

    let resource_type = match settings.get_str("resource-type")? {
      Some(t) => t.to_string(),
      None => template_name(&[resource.name()]),
    };

    let mut custom = NativeResource::new(format!("Custom::{resource_type}"))
      .property("ServiceToken", Expr::get_att(function_id, "Arn"))
      .depends_on(function_id);
    if let Some(properties) = settings.get_map("properties")? {
      for (key, value) in to_expr_map(properties, registry)? {
        if key == "ServiceToken" {
          return Err(settings.invalid_value("properties", "ServiceToken is reserved").into());
        }
        custom = custom.property(key, value);
      }
    }

    out.native.add_resource(resource.lrn.provisioning_id(), custom)?;
    Ok(())
  }
}
