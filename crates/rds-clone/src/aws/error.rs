//! RDS error classification
//!
//! Provides typed errors for RDS SDK operations using the `.code()` method
//! instead of string matching on the Debug format. Nothing here retries;
//! classification only decides how a failure is reported.

use thiserror::Error;

/// RDS error categories
#[derive(Debug, Error)]
pub enum RdsError {
    /// Instance, snapshot or other named resource does not exist
    #[error("Resource not found: {message}")]
    NotFound { code: String, message: String },

    /// Resource exists but is in a state that rejects the call
    #[error("Resource is in an invalid state: {message}")]
    InvalidState { code: String, message: String },

    /// Identifier already taken
    #[error("Resource already exists: {message}")]
    AlreadyExists { code: String, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    Throttled,

    /// Account or capacity quota hit
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { code: String, message: String },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl RdsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, RdsError::NotFound { .. })
    }

    /// Check if this is an "invalid state" error
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, RdsError::InvalidState { .. })
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            RdsError::NotFound { code, .. }
            | RdsError::InvalidState { code, .. }
            | RdsError::AlreadyExists { code, .. }
            | RdsError::QuotaExceeded { code, .. } => suggestion_for_code(code),
            RdsError::Sdk { code: Some(c), .. } => suggestion_for_code(c),
            RdsError::Throttled => suggestion_for_code("Throttling"),
            RdsError::Sdk { code: None, .. } => None,
        }
    }
}

/// Known RDS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBSnapshotNotFound",
    "DBSnapshotNotFoundFault",
    "DBSubnetGroupNotFoundFault",
    "DBParameterGroupNotFound",
    "InvalidVPCNetworkStateFault",
];

/// Known RDS error codes for state conflicts
const INVALID_STATE_CODES: &[&str] = &[
    "InvalidDBInstanceState",
    "InvalidDBInstanceStateFault",
    "InvalidDBSnapshotState",
    "InvalidDBSnapshotStateFault",
];

/// Known RDS error codes for "already exists" conditions
const ALREADY_EXISTS_CODES: &[&str] = &[
    "DBInstanceAlreadyExists",
    "DBInstanceAlreadyExistsFault",
    "DBSnapshotAlreadyExists",
    "DBSnapshotAlreadyExistsFault",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Known RDS error codes for quota and capacity limits
const QUOTA_CODES: &[&str] = &[
    "InstanceQuotaExceeded",
    "StorageQuotaExceeded",
    "SnapshotQuotaExceeded",
    "InsufficientDBInstanceCapacity",
];

/// Classify an RDS SDK error using the error code.
pub fn classify_rds_error(code: Option<&str>, message: Option<&str>) -> RdsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => RdsError::NotFound {
            code: c.to_string(),
            message,
        },
        Some(c) if INVALID_STATE_CODES.contains(&c) => RdsError::InvalidState {
            code: c.to_string(),
            message,
        },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => RdsError::AlreadyExists {
            code: c.to_string(),
            message,
        },
        Some(c) if THROTTLING_CODES.contains(&c) => RdsError::Throttled,
        Some(c) if QUOTA_CODES.contains(&c) => RdsError::QuotaExceeded {
            code: c.to_string(),
            message,
        },
        _ => RdsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify an error from an anyhow::Error by extracting the RDS error code.
///
/// Walks the error chain looking for RDS SDK operation errors and reads
/// `.code()`/`.message()` through `ProvideErrorMetadata`. Falls back to
/// scanning the Debug representation for a known code.
pub fn classify_anyhow_error(error: &anyhow::Error) -> RdsError {
    use aws_sdk_rds::error::{ProvideErrorMetadata, SdkError};
    use aws_sdk_rds::operation::{
        create_db_snapshot::CreateDBSnapshotError, delete_db_instance::DeleteDBInstanceError,
        delete_db_snapshot::DeleteDBSnapshotError, describe_db_instances::DescribeDBInstancesError,
        describe_db_snapshots::DescribeDBSnapshotsError,
        list_tags_for_resource::ListTagsForResourceError, modify_db_instance::ModifyDBInstanceError,
        reboot_db_instance::RebootDBInstanceError,
        restore_db_instance_from_db_snapshot::RestoreDBInstanceFromDBSnapshotError,
    };

    macro_rules! try_classify {
        ($cause:expr, $($op:ty),+ $(,)?) => {
            $(
                if let Some(e) = $cause.downcast_ref::<SdkError<$op>>() {
                    return classify_rds_error(e.code(), e.message());
                }
            )+
        };
    }

    for cause in error.chain() {
        try_classify!(
            cause,
            DescribeDBInstancesError,
            DescribeDBSnapshotsError,
            RestoreDBInstanceFromDBSnapshotError,
            ModifyDBInstanceError,
            RebootDBInstanceError,
            DeleteDBInstanceError,
            CreateDBSnapshotError,
            DeleteDBSnapshotError,
            ListTagsForResourceError,
        );
    }

    // Fallback: extract error code from debug string representation
    let debug_str = format!("{:?}", error);
    if let Some(code) = extract_error_code(&debug_str) {
        return classify_rds_error(Some(&code), Some(&error.to_string()));
    }

    RdsError::Sdk {
        code: None,
        message: error.to_string(),
    }
}

/// Extract an RDS error code from a debug string representation
fn extract_error_code(debug_str: &str) -> Option<String> {
    let known = NOT_FOUND_CODES
        .iter()
        .chain(INVALID_STATE_CODES)
        .chain(ALREADY_EXISTS_CODES)
        .chain(THROTTLING_CODES)
        .chain(QUOTA_CODES);

    // Longest match first so "DBInstanceNotFoundFault" beats "DBInstanceNotFound"
    let mut found: Vec<&str> = known.copied().filter(|c| debug_str.contains(c)).collect();
    found.sort_by_key(|c| std::cmp::Reverse(c.len()));
    if let Some(code) = found.first() {
        return Some((*code).to_string());
    }

    // Try to extract any code from `code: Some("...")` pattern
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "DBInstanceNotFound",
        "Check the source instance identifier and the configured region.",
    ),
    (
        "DBSnapshotNotFound",
        "The source instance has no usable snapshot yet; retry with --fresh-snapshot.",
    ),
    (
        "InvalidDBInstanceState",
        "The instance is busy (modifying, backing up or deleting). Try again once it is available.",
    ),
    (
        "DBInstanceAlreadyExists",
        "A clone with this identifier exists; run `rds-clone cleanup` to remove stale clones.",
    ),
    (
        "InstanceQuotaExceeded",
        "Request a service limit increase or run `rds-clone cleanup --execute`.",
    ),
    (
        "SnapshotQuotaExceeded",
        "Delete stale snapshots with `rds-clone cleanup --execute --snapshots-only`.",
    ),
    (
        "InsufficientDBInstanceCapacity",
        "Try a different instance class via `rds.instance_class`.",
    ),
    ("Throttling", "AWS API rate limit hit. Wait and run the command again."),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<&'static str> {
    let code = code.trim_end_matches("Fault");
    SUGGESTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, s)| *s)
}
