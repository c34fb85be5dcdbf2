//! Resource adapters.
//!
//! Each resource kind has one adapter. Adapters declare the settings schema
//! of their kind, the names their resources register, and what they
//! contribute to each build stage.

mod extension;
mod lambda;
mod stream;

use std::collections::BTreeMap;

use crate::lrn::Lrn;
use crate::project::{Resource, ResourceKind};
use crate::registry::Registry;
use crate::settings::{Schema, SettingValue};
use crate::template::{Expr, TemplateStage};

use super::{BuildContext, BuildError, StageOutput};

pub use extension::ExtensionAdapter;
pub use lambda::LambdaAdapter;
pub use stream::StreamAdapter;

pub trait ResourceAdapter: Send + Sync {
  fn kind(&self) -> ResourceKind;

  /// Keys accepted in the settings of this kind.
  fn schema(&self) -> Schema;

  /// Names a resource registers. Defaults to its own LRN.
  fn names(&self, resource: &Resource) -> Vec<Lrn> {
    vec![resource.lrn.clone()]
  }

  /// Runs once per stage when the project has at least one resource of this
  /// kind.
  fn kind_hook(&self, _stage: TemplateStage, _out: &mut StageOutput, _ctx: &BuildContext<'_>) -> Result<(), BuildError> {
    Ok(())
  }

  /// Runs once per stage for every resource of this kind.
  fn instance_hook(
    &self,
    _stage: TemplateStage,
    _resource: &Resource,
    _out: &mut StageOutput,
    _ctx: &BuildContext<'_>,
  ) -> Result<(), BuildError> {
    Ok(())
  }
}

static ADAPTERS: [&dyn ResourceAdapter; 3] = [&LambdaAdapter, &StreamAdapter, &ExtensionAdapter];

/// The adapter of `kind`.
pub fn adapter(kind: ResourceKind) -> &'static dyn ResourceAdapter {
  match kind {
    ResourceKind::Lambda => ADAPTERS[0],
    ResourceKind::Stream => ADAPTERS[1],
    ResourceKind::Extension => ADAPTERS[2],
  }
}

/// Convert a setting into a template expression.
///
/// `ref://` values become raw references; `lrn://` values are resolved to
/// the provisioning id of the named resource.
pub fn to_expr<R>(value: &SettingValue, registry: &Registry<R>) -> Result<Expr, BuildError> {
  Ok(match value {
    SettingValue::String(s) => Expr::Str(s.clone()),
    SettingValue::Int(i) => Expr::Int(*i),
    SettingValue::Bool(b) => Expr::Bool(*b),
    SettingValue::List(items) => Expr::List(
      items
        .iter()
        .map(|item| to_expr(item, registry))
        .collect::<Result<_, _>>()?,
    ),
    SettingValue::Map(map) => Expr::Map(to_expr_map(map, registry)?),
    SettingValue::Ref(name) => Expr::Ref(name.clone()),
    SettingValue::Lrn(lrn) => Expr::Ref(registry.resolve(lrn)?.to_string()),
  })
}

pub fn to_expr_map<R>(
  map: &BTreeMap<String, SettingValue>,
  registry: &Registry<R>,
) -> Result<BTreeMap<String, Expr>, BuildError> {
  map
    .iter()
    .map(|(k, v)| to_expr(v, registry).map(|e| (k.clone(), e)))
    .collect()
}
