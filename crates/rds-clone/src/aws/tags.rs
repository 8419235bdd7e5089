//! Ownership tags and tag-based discovery
//!
//! Tagging happens at creation time only: [`ownership_tags`] is passed into
//! the restore/create-snapshot call. Discovery lists every instance or
//! snapshot in the region and keeps those whose tags match the ownership
//! schema from [`rds_clone_common::tags`].

use super::account::resource_arn;
use super::rds::{
    DbInstance, DbSnapshot, RdsEntity, RdsOperations, ResourceRef, SnapshotFilter, Tag,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rds_clone_common::tags as tag_schema;
use tracing::{debug, info};

/// The two ownership tags, stamped with `now`
pub fn ownership_tags(now: DateTime<Utc>) -> Vec<Tag> {
    tag_schema::ownership_tag_pairs(now)
        .into_iter()
        .map(|(key, value)| Tag::new(key, value))
        .collect()
}

/// Whether a tag list marks its resource as owned by this tool
pub fn tags_mark_owned(tags: &[Tag]) -> bool {
    tag_schema::is_owned_tag_set(tags.iter().map(|t| (t.key.as_str(), t.value.as_str())))
}

/// Fetch a resource's tags and check them against the ownership schema.
pub async fn is_owned<G>(rds: &G, resource: &ResourceRef) -> Result<bool>
where
    G: RdsOperations,
{
    let arn = resource_arn(rds.arn_prefix(), resource.kind, &resource.identifier);
    debug!(arn = %arn, "Checking ownership tags");

    let tags = rds.list_tags(&arn).await?;
    Ok(tags_mark_owned(&tags))
}

/// Keep only the resources owned by this tool, preserving order.
///
/// The first tag lookup error aborts the whole filter; no partial result
/// is returned.
pub async fn filter_owned<G, T>(rds: &G, resources: Vec<T>) -> Result<Vec<T>>
where
    G: RdsOperations,
    T: RdsEntity,
{
    let mut owned = Vec::with_capacity(resources.len());
    for resource in resources {
        if is_owned(rds, &resource.resource_ref()).await? {
            owned.push(resource);
        }
    }
    Ok(owned)
}

/// Discover every instance in the region created by this tool
pub async fn discover_owned_instances<G>(rds: &G) -> Result<Vec<DbInstance>>
where
    G: RdsOperations,
{
    let all = rds.describe_instances(None).await?;
    let total = all.len();
    let owned = filter_owned(rds, all).await?;
    info!(total, owned = owned.len(), "Discovered owned DB instances");
    Ok(owned)
}

/// Discover every snapshot in the region created by this tool
pub async fn discover_owned_snapshots<G>(rds: &G) -> Result<Vec<DbSnapshot>>
where
    G: RdsOperations,
{
    let all = rds.describe_snapshots(SnapshotFilter::default()).await?;
    let total = all.len();
    let owned = filter_owned(rds, all).await?;
    info!(total, owned = owned.len(), "Discovered owned DB snapshots");
    Ok(owned)
}
