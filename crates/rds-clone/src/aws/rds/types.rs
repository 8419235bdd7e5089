//! RDS resource types as seen by the orchestrator
//!
//! SDK shapes are converted into these owned types at the client boundary
//! so the rest of the crate never touches `Option`-heavy SDK structs.

use chrono::{DateTime, Utc};
use rds_clone_common::ResourceKind;
use rds_clone_common::defaults::{PARAMETER_APPLY_IN_SYNC, SECURITY_GROUP_ACTIVE};
use serde::Serialize;

/// Network endpoint of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

/// DB parameter group attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterGroupStatus {
    pub name: String,
    /// e.g. "in-sync", "applying", "pending-reboot"
    pub apply_status: String,
}

/// VPC security group attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupMembership {
    pub id: String,
    /// e.g. "active", "adding", "removing"
    pub status: String,
}

/// A DB instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbInstance {
    pub identifier: String,
    /// Opaque provider status ("creating", "modifying", "available", ...)
    pub status: String,
    pub engine: String,
    pub instance_class: String,
    pub multi_az: bool,
    /// Not assigned until the instance is first available
    pub endpoint: Option<Endpoint>,
    pub subnet_group: Option<String>,
    pub storage_type: Option<String>,
    pub parameter_groups: Vec<ParameterGroupStatus>,
    pub security_groups: Vec<SecurityGroupMembership>,
}

impl DbInstance {
    /// Whether parameter group or security group changes are still pending.
    ///
    /// A parameter group that is not `in-sync` typically needs a reboot
    /// before it takes effect.
    pub fn has_pending_changes(&self) -> bool {
        self.parameter_groups
            .iter()
            .any(|pg| pg.apply_status != PARAMETER_APPLY_IN_SYNC)
            || self
                .security_groups
                .iter()
                .any(|sg| sg.status != SECURITY_GROUP_ACTIVE)
    }

    /// Parameter group to carry over to a clone (the first attached one)
    pub fn primary_parameter_group(&self) -> Option<&str> {
        self.parameter_groups.first().map(|pg| pg.name.as_str())
    }

    /// IDs of all attached VPC security groups
    pub fn security_group_ids(&self) -> Vec<String> {
        self.security_groups.iter().map(|sg| sg.id.clone()).collect()
    }
}

/// A DB snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbSnapshot {
    pub identifier: String,
    pub instance_identifier: String,
    /// Opaque provider status; only "available" snapshots can be restored
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Typed reference to exactly one instance or one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub identifier: String,
}

impl ResourceRef {
    pub fn instance(identifier: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::DbInstance,
            identifier: identifier.into(),
        }
    }

    pub fn snapshot(identifier: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::DbSnapshot,
            identifier: identifier.into(),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind, self.identifier)
    }
}

impl From<&DbInstance> for ResourceRef {
    fn from(instance: &DbInstance) -> Self {
        ResourceRef::instance(&instance.identifier)
    }
}

impl From<&DbSnapshot> for ResourceRef {
    fn from(snapshot: &DbSnapshot) -> Self {
        ResourceRef::snapshot(&snapshot.identifier)
    }
}

/// A homogeneous list of resources, deleted as one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceBatch {
    Instances(Vec<DbInstance>),
    Snapshots(Vec<DbSnapshot>),
}

impl ResourceBatch {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceBatch::Instances(_) => ResourceKind::DbInstance,
            ResourceBatch::Snapshots(_) => ResourceKind::DbSnapshot,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResourceBatch::Instances(v) => v.len(),
            ResourceBatch::Snapshots(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            ResourceBatch::Instances(v) => v.iter().map(|i| i.identifier.as_str()).collect(),
            ResourceBatch::Snapshots(v) => v.iter().map(|s| s.identifier.as_str()).collect(),
        }
    }
}

/// Anything that names exactly one instance or snapshot.
pub trait RdsEntity {
    fn resource_ref(&self) -> ResourceRef;
}

impl RdsEntity for DbInstance {
    fn resource_ref(&self) -> ResourceRef {
        self.into()
    }
}

impl RdsEntity for DbSnapshot {
    fn resource_ref(&self) -> ResourceRef {
        self.into()
    }
}

/// Filter for describe-snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub instance_identifier: Option<String>,
    pub snapshot_identifier: Option<String>,
}

impl SnapshotFilter {
    pub fn for_instance(identifier: &str) -> Self {
        Self {
            instance_identifier: Some(identifier.to_string()),
            snapshot_identifier: None,
        }
    }

    pub fn by_id(identifier: &str) -> Self {
        Self {
            instance_identifier: None,
            snapshot_identifier: Some(identifier.to_string()),
        }
    }
}

/// Parameters for restoring a clone from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreParams {
    pub identifier: String,
    pub snapshot_identifier: String,
    pub instance_class: String,
    pub multi_az: bool,
    pub subnet_group: Option<String>,
    pub storage_type: Option<String>,
    /// Attached in the restore call itself
    pub tags: Vec<Tag>,
}

/// Parameters for modifying an instance
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyParams {
    pub identifier: String,
    pub parameter_group: Option<String>,
    pub security_group_ids: Vec<String>,
    pub apply_immediately: bool,
}
