//! AWS bindings of the remote service traits.

mod cloudformation;
mod lambda;
mod s3;

use aws_config::{BehaviorVersion, Region};
use tracing::debug;

pub use cloudformation::CloudFormationStacks;
pub use lambda::LambdaVersions;
pub use s3::S3Objects;

use crate::extension::PublishVersion;

/// Clients for one region.
pub struct AwsServices {
  pub stacks: CloudFormationStacks,
  pub objects: S3Objects,
  pub functions: LambdaVersions,
}

impl AwsServices {
  /// Load credentials the usual way and target `region`.
  ///
  /// The region is passed explicitly; the process environment is never
  /// changed.
  pub async fn connect(region: &str) -> Self {
    debug!(region, "loading AWS configuration");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
      .region(Region::new(region.to_string()))
      .load()
      .await;

    Self {
      stacks: CloudFormationStacks::new(aws_sdk_cloudformation::Client::new(&sdk_config)),
      objects: S3Objects::new(aws_sdk_s3::Client::new(&sdk_config)),
      functions: LambdaVersions::new(aws_sdk_lambda::Client::new(&sdk_config)),
    }
  }

  /// The `PublishVersion` extension handler on this region's functions.
  pub fn publish_version(&self) -> PublishVersion<LambdaVersions> {
    PublishVersion::new(self.functions.clone())
  }
}
