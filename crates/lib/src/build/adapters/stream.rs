//! `stream` resources: event source mappings feeding a function.

use super::{ResourceAdapter, to_expr};
use crate::build::{BuildContext, BuildError, StageOutput};
use crate::consts::CURRENT_ALIAS;
use crate::project::{Resource, ResourceKind};
use crate::settings::Schema;
use crate::template::native::Resource as NativeResource;
use crate::template::{Expr, TemplateStage};

const STARTING_POSITIONS: &[&str] = &["TRIM_HORIZON", "LATEST"];
const BATCH_RANGE: (i64, i64) = (1, 10000);
const DEFAULT_BATCH_SIZE: i64 = 100;

pub struct StreamAdapter;

impl ResourceAdapter for StreamAdapter {
  fn kind(&self) -> ResourceKind {
    ResourceKind::Stream
  }

  fn schema(&self) -> Schema {
    Schema {
      required: &["stream", "lambda", "starting_position"],
      optional: &["batch_size", "enabled"],
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

    let starting_position = settings.require_str("starting_position")?;
    if !STARTING_POSITIONS.contains(&starting_position) {
      return Err(
        settings
          .invalid_value(
            "starting_position",
            format!("'{starting_position}' is not one of {}", STARTING_POSITIONS.join(", ")),
          )
          .into(),
      );
    }

    // The mapping always targets the function's `current` alias.
    let lambda = settings
      .get_lrn("lambda", |name| resource.sibling(ResourceKind::Lambda, name))?
      .ok_or_else(|| settings.invalid_value("lambda", "is required"))?;
    let lambda = if lambda.alias().is_some() {
      lambda
    } else {
      lambda.with_alias(CURRENT_ALIAS)
    };
    let target = registry.resolve(&lambda)?;

    let batch_size = settings
      .get_int("batch_size")?
      .unwrap_or(DEFAULT_BATCH_SIZE)
      .clamp(BATCH_RANGE.0, BATCH_RANGE.1);
    let enabled = settings.get_bool("enabled")?.unwrap_or(true);

    out.native.add_resource(
      resource.lrn.provisioning_id(),
      NativeResource::new("AWS::Lambda::EventSourceMapping")
        .property("EventSourceArn", to_expr(settings.require("stream")?, registry)?)
        .property("FunctionName", Expr::reference(target))
        .property("StartingPosition", starting_position)
        .property("BatchSize", batch_size)
        .property("Enabled", enabled),
    )?;
    Ok(())
  }
}
