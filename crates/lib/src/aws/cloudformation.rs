use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types::{Capability, Parameter, Tag};
use tracing::debug;

use crate::execute::{ApplyError, StackApi, StackDescription, StackRequest, StackStatus, UpdateOutcome};

const NO_UPDATES: &str = "No updates are to be performed";

/// [`StackApi`] backed by CloudFormation.
pub struct CloudFormationStacks {
  client: Client,
}

impl CloudFormationStacks {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

fn remote_error(operation: &'static str, stack: &str, err: impl std::error::Error) -> ApplyError {
  ApplyError::Remote {
    operation,
    stack: stack.to_string(),
    message: DisplayErrorContext(err).to_string(),
  }
}

fn parameters(request: &StackRequest) -> Vec<Parameter> {
  request
    .parameters
    .iter()
    .map(|(key, value)| Parameter::builder().parameter_key(key).parameter_value(value).build())
    .collect()
}

fn tags(request: &StackRequest) -> Result<Vec<Tag>, ApplyError> {
  request
    .tags
    .iter()
    .map(|(key, value)| {
      Ok(Tag::builder().key(key).value(value).build())
    })
    .collect()
}

#[async_trait]
impl StackApi for CloudFormationStacks {
  async fn describe(&self, name: &str) -> Result<Option<StackDescription>, ApplyError> {
    let described = match self.client.describe_stacks().stack_name(name).send().await {
      Ok(described) => described,
      Err(e) => {
        let service_error = e.into_service_error();
        // A missing stack is reported as a validation error.
        if service_error.code() == Some("ValidationError")
          && service_error.message().is_some_and(|m| m.contains("does not exist"))
        {
          return Ok(None);
        }
        return Err(remote_error("describe", name, service_error));
      }
    };

    let Some(stack) = described.stacks().first() else {
      return Ok(None);
    };
    let status = stack
      .stack_status()
      .map(|s| StackStatus::parse(s.as_str()))
      .unwrap_or_else(|| StackStatus::Other("UNKNOWN".to_string()));
    let outputs: BTreeMap<String, String> = stack
      .outputs()
      .iter()
      .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
      .collect();

    Ok(Some(StackDescription {
      name: stack.stack_name().unwrap_or(name).to_string(),
      status,
      status_reason: stack.stack_status_reason().map(str::to_string),
      outputs,
    }))
  }

  async fn create(&self, request: &StackRequest) -> Result<(), ApplyError> {
    self
      .client
      .create_stack()
      .stack_name(&request.name)
      .template_body(&request.body)
      .set_parameters(Some(parameters(request)))
      .set_tags(Some(tags(request)?))
      .timeout_in_minutes(i32::try_from(request.timeout_minutes).unwrap_or(i32::MAX))
      .capabilities(Capability::CapabilityIam)
      .capabilities(Capability::CapabilityNamedIam)
      .send()
      .await
      .map_err(|e| remote_error("create", &request.name, e))?;
    debug!(stack = %request.name, "create requested");
    Ok(())
  }

  async fn update(&self, request: &StackRequest) -> Result<UpdateOutcome, ApplyError> {
    let sent = self
      .client
      .update_stack()
      .stack_name(&request.name)
      .template_body(&request.body)
      .set_parameters(Some(parameters(request)))
      .set_tags(Some(tags(request)?))
      .capabilities(Capability::CapabilityIam)
      .capabilities(Capability::CapabilityNamedIam)
      .send()
      .await;

    match sent {
      Ok(_) => {
        debug!(stack = %request.name, "update requested");
        Ok(UpdateOutcome::Updated)
      }
      Err(e) => {
        let service_error = e.into_service_error();
        if service_error.message().is_some_and(|m| m.contains(NO_UPDATES)) {
          return Ok(UpdateOutcome::NoChanges);
        }
        Err(remote_error("update", &request.name, service_error))
      }
    }
  }

  async fn delete(&self, name: &str) -> Result<(), ApplyError> {
    self
      .client
      .delete_stack()
      .stack_name(name)
      .send()
      .await
      .map_err(|e| remote_error("delete", name, e))?;
    Ok(())
  }
}
