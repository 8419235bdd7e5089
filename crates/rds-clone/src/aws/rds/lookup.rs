//! Single-resource lookups built on the describe calls

use super::operations::RdsOperations;
use super::types::{DbInstance, DbSnapshot, ResourceRef, SnapshotFilter};
use crate::orchestrator::LifecycleError;
use anyhow::Result;
use rds_clone_common::ResourceKind;
use rds_clone_common::defaults::STATUS_AVAILABLE;
use tracing::debug;

/// Describe one instance by identifier.
///
/// Returns the last element of the provider response, or
/// [`LifecycleError::DbInstanceNotFound`] if there is none.
pub async fn describe_instance<G>(rds: &G, identifier: &str) -> Result<DbInstance>
where
    G: RdsOperations,
{
    let mut instances = rds.describe_instances(Some(identifier)).await?;
    instances.pop().ok_or_else(|| {
        LifecycleError::DbInstanceNotFound {
            identifier: identifier.to_string(),
        }
        .into()
    })
}

/// Describe one snapshot by identifier.
pub async fn describe_snapshot<G>(rds: &G, identifier: &str) -> Result<DbSnapshot>
where
    G: RdsOperations,
{
    let mut snapshots = rds
        .describe_snapshots(SnapshotFilter::by_id(identifier))
        .await?;
    snapshots.pop().ok_or_else(|| {
        LifecycleError::SnapshotNotFound {
            instance: None,
            identifier: Some(identifier.to_string()),
        }
        .into()
    })
}

/// Select the most recent usable snapshot of an instance.
///
/// Keeps only snapshots whose status is "available" and picks the last
/// one in provider order. The provider does not promise any ordering, so
/// "most recent" here means "last returned", not a creation-time compare.
pub async fn describe_latest_snapshot<G>(rds: &G, instance_identifier: &str) -> Result<DbSnapshot>
where
    G: RdsOperations,
{
    let snapshots = rds
        .describe_snapshots(SnapshotFilter::for_instance(instance_identifier))
        .await?;

    let mut available: Vec<DbSnapshot> = snapshots
        .into_iter()
        .filter(|s| {
            if s.status != STATUS_AVAILABLE {
                debug!(snapshot = %s.identifier, status = %s.status, "Skipping unusable snapshot");
                return false;
            }
            true
        })
        .collect();

    available.pop().ok_or_else(|| {
        LifecycleError::SnapshotNotFound {
            instance: Some(instance_identifier.to_string()),
            identifier: None,
        }
        .into()
    })
}

/// Current provider status string of an instance or snapshot
pub async fn current_status<G>(rds: &G, target: &ResourceRef) -> Result<String>
where
    G: RdsOperations,
{
    match target.kind {
        ResourceKind::DbInstance => Ok(describe_instance(rds, &target.identifier).await?.status),
        ResourceKind::DbSnapshot => Ok(describe_snapshot(rds, &target.identifier).await?.status),
    }
}
