//! Lifecycle error types

use crate::aws::rds::ResourceRef;
use crate::wait::WaitOutcome;
use thiserror::Error;

/// Terminal failures of a clone lifecycle
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("DB instance not found: {identifier}")]
    DbInstanceNotFound { identifier: String },

    #[error(
        "DB snapshot not found: {}",
        snapshot_target(.instance.as_deref(), .identifier.as_deref())
    )]
    SnapshotNotFound {
        /// Instance whose snapshots were searched
        instance: Option<String>,
        /// Snapshot looked up by identifier
        identifier: Option<String>,
    },

    #[error("No SQL driver matches engine '{engine}'")]
    DriverNotFound { engine: String },

    #[error("Connecting with the {driver} driver is not supported")]
    ConnectionUnsupported { driver: String },

    #[error("Waiting for {resource} to become available {outcome}")]
    WaitFailed {
        resource: ResourceRef,
        outcome: WaitOutcome,
    },

    #[error("{resource} has no {field}")]
    MissingAttribute {
        resource: ResourceRef,
        field: &'static str,
    },
}

fn snapshot_target(instance: Option<&str>, identifier: Option<&str>) -> String {
    match (instance, identifier) {
        (_, Some(id)) => id.to_string(),
        (Some(instance), None) => format!("no available snapshot of {instance}"),
        (None, None) => "unknown".to_string(),
    }
}
