//! System-wide constants and defaults.

/// Reserved node id of the virtual environment producer.
///
/// Any node may reference `environment.name`, `environment.account` or
/// `environment.region` without declaring a producer.
pub const ENVIRONMENT_NODE: &str = "environment";

/// Output slots exposed by the virtual environment producer.
pub const ENVIRONMENT_OUTPUTS: [&str; 3] = ["name", "account", "region"];

/// Maximum length of a derived resource name.
///
/// Matches the tightest limit among the supported resource categories
/// (object-store bucket names).
pub const MAX_RESOURCE_NAME_LEN: usize = 63;

/// Number of hex digits of the SHA-256 suffix appended to truncated names.
pub const NAME_HASH_LEN: usize = 8;

/// Default environment name when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Default account when none is configured.
pub const DEFAULT_ACCOUNT: &str = "000000000000";

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default stack manifest file name.
pub const DEFAULT_MANIFEST: &str = "cairn.yaml";

/// Application name used in CLI output and generated identifiers.
pub const APP_NAME: &str = "cairn";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "cairn";
