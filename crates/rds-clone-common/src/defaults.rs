//! Default configuration values
//!
//! These constants keep the CLI, the config loader and the orchestrator
//! agreeing on the same defaults.

/// Status string the provider reports once a resource is usable
pub const STATUS_AVAILABLE: &str = "available";

/// DB parameter group apply status once changes have been applied
pub const PARAMETER_APPLY_IN_SYNC: &str = "in-sync";

/// VPC security group membership status once attached
pub const SECURITY_GROUP_ACTIVE: &str = "active";

/// Interval between status polls (30 seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Overall bound on a single status wait (30 minutes)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30 * 60;

/// Instance class used for clones unless configured otherwise
pub const DEFAULT_INSTANCE_CLASS: &str = "db.t3.micro";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Directory under the user's home where CSV artifacts land by default
pub const DEFAULT_EXPORT_DIR_NAME: &str = "rds-clone";

// Serde default functions for struct field defaults

/// Returns the default poll interval
pub fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Returns the default wait timeout
pub fn default_wait_timeout_secs() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

/// Returns the default instance class
pub fn default_instance_class() -> String {
    DEFAULT_INSTANCE_CLASS.to_string()
}

/// Returns the default region
pub fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Returns `true`, for flags that are on unless disabled
pub fn default_true() -> bool {
    true
}
