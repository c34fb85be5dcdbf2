//! Constants shared across the crate.

use std::time::Duration;

/// Settings file expected at the project root and in every app directory.
pub const SETTINGS_FILENAME: &str = "settings.yml";

/// Directory (relative to the project root) holding build artifacts.
pub const BUILD_DIR: &str = "_build";

/// Directory (relative to the build directory) holding packaged code.
pub const CODE_DIR: &str = "code";

/// Directory (relative to the project root) holding parameter files.
pub const PARAMETERS_DIR: &str = "parameters";

/// Parameter file applied to every stage.
pub const COMMON_PARAMETERS: &str = "common";

/// Metadata key under which package digests are stored on remote objects.
pub const DIGEST_METADATA_KEY: &str = "sha256";

/// Marker value carried by the `_type` field of action templates.
pub const ACTIONS_TEMPLATE_MARKER: &str = "ActionsTemplate";

/// Width of the zero-padded sequence prefix of artifact file names.
pub const ARTIFACT_SEQUENCE_WIDTH: usize = 4;

/// Region used when nothing else specifies one.
pub const FALLBACK_REGION: &str = "us-east-1";

/// Environment variables consulted for the deployment region, in order.
pub const REGION_ENV_VARS: &[&str] = &["STRATUS_REGION", "AWS_DEFAULT_REGION"];

/// Interval between two stack status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Overall time budget for one stack operation, in minutes.
pub const DEFAULT_STACK_TIMEOUT_MINUTES: u64 = 15;

/// Tag attached to every created stack.
pub const VERSION_TAG: &str = "StratusVersion";

/// Alias every function gets pointed at its latest published version.
pub const CURRENT_ALIAS: &str = "current";

/// Time kept aside from an extension handler's budget to deliver its callback.
pub const CALLBACK_SAFETY_MARGIN: Duration = Duration::from_secs(5);
