//! Bulk deletion of owned resources
//!
//! Used both by lifecycle teardown and by the `cleanup` command, which
//! discovers abandoned clones and snapshots through their ownership tags.

use super::rds::{RdsOperations, ResourceBatch, ResourceRef};
use super::tags::{discover_owned_instances, discover_owned_snapshots};
use anyhow::{Context, Result};
use rds_clone_common::ResourceKind;
use tracing::info;

/// Delete a single instance or snapshot.
///
/// Instances are deleted without a final snapshot.
pub async fn delete_resource<G>(rds: &G, resource: &ResourceRef) -> Result<()>
where
    G: RdsOperations,
{
    match resource.kind {
        ResourceKind::DbInstance => {
            rds.delete_instance(&resource.identifier, true).await?;
        }
        ResourceKind::DbSnapshot => {
            rds.delete_snapshot(&resource.identifier).await?;
        }
    }
    Ok(())
}

/// Delete every resource in a batch, one at a time.
///
/// The first deletion error aborts the rest of the batch; resources deleted
/// before it stay deleted. Returns the number of resources deleted.
pub async fn delete_all<G>(rds: &G, batch: &ResourceBatch) -> Result<usize>
where
    G: RdsOperations,
{
    let kind = batch.kind();
    let total = batch.len();

    for (n, identifier) in batch.identifiers().into_iter().enumerate() {
        let resource = ResourceRef {
            kind,
            identifier: identifier.to_string(),
        };
        delete_resource(rds, &resource)
            .await
            .with_context(|| format!("Failed to delete {resource} ({} of {total})", n + 1))?;
        info!("[{}/{}] deleted {}: {}", n + 1, total, kind, identifier);
    }

    Ok(total)
}

/// Cleanup configuration
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Actually delete resources (false = dry run)
    pub dry_run: bool,
    pub include_instances: bool,
    pub include_snapshots: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            include_instances: true,
            include_snapshots: true,
        }
    }
}

/// Report of cleanup operations
#[derive(Default, Debug)]
pub struct CleanupReport {
    pub instances: Vec<String>,
    pub snapshots: Vec<String>,
    pub deleted: usize,
    pub skipped: usize,
}

impl CleanupReport {
    pub fn total_found(&self) -> usize {
        self.instances.len() + self.snapshots.len()
    }
}

/// Discover owned resources and delete them, instances before snapshots.
pub async fn cleanup_owned<G>(rds: &G, config: &CleanupConfig) -> Result<CleanupReport>
where
    G: RdsOperations,
{
    info!(dry_run = config.dry_run, "Scanning for owned resources");

    let mut batches = Vec::new();
    if config.include_instances {
        batches.push(ResourceBatch::Instances(discover_owned_instances(rds).await?));
    }
    if config.include_snapshots {
        batches.push(ResourceBatch::Snapshots(discover_owned_snapshots(rds).await?));
    }
    batches.sort_by_key(|b| b.kind().cleanup_priority());

    let mut report = CleanupReport::default();
    for batch in batches {
        let ids: Vec<String> = batch.identifiers().into_iter().map(String::from).collect();
        match batch.kind() {
            ResourceKind::DbInstance => report.instances.extend(ids.iter().cloned()),
            ResourceKind::DbSnapshot => report.snapshots.extend(ids.iter().cloned()),
        }

        if batch.is_empty() {
            continue;
        }

        if config.dry_run {
            for id in &ids {
                info!("[DRY RUN] Would delete {}: {}", batch.kind(), id);
            }
            report.skipped += ids.len();
        } else {
            report.deleted += delete_all(rds, &batch).await?;
        }
    }

    if report.total_found() == 0 {
        info!("No owned resources found");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::tags::ownership_tags;
    use crate::testing::{FakeRds, instance, snapshot};
    use chrono::Utc;

    fn fixture() -> FakeRds {
        let rds = FakeRds::with_source("prod-db", "mysql");
        rds.add_instance(instance("clone-a", "available", "mysql"));
        rds.add_snapshot(snapshot("snap-a", "prod-db", "available"));
        rds.add_snapshot(snapshot("manual", "prod-db", "available"));
        rds.set_tags(ResourceKind::DbInstance, "clone-a", ownership_tags(Utc::now()));
        rds.set_tags(ResourceKind::DbSnapshot, "snap-a", ownership_tags(Utc::now()));
        rds
    }

    #[tokio::test]
    async fn test_delete_all_sequential() {
        let rds = FakeRds::new();
        let batch = ResourceBatch::Snapshots(vec![
            snapshot("s1", "db", "available"),
            snapshot("s2", "db", "available"),
        ]);
        rds.add_snapshot(snapshot("s1", "db", "available"));
        rds.add_snapshot(snapshot("s2", "db", "available"));

        assert_eq!(delete_all(&rds, &batch).await.unwrap(), 2);
        assert_eq!(
            rds.calls(),
            vec!["delete_snapshot:s1".to_string(), "delete_snapshot:s2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_all_aborts_on_first_error() {
        let rds = FakeRds::new();
        rds.add_instance(instance("i1", "available", "mysql"));
        rds.add_instance(instance("i3", "available", "mysql"));
        let batch = ResourceBatch::Instances(vec![
            instance("i1", "available", "mysql"),
            instance("i2", "available", "mysql"),
            instance("i3", "available", "mysql"),
        ]);

        let err = delete_all(&rds, &batch).await.unwrap_err();
        assert!(err.to_string().contains("i2"));
        assert!(!rds.calls().iter().any(|c| c.ends_with("i3")));
        assert!(rds.instance_exists("i3"));
        assert!(!rds.instance_exists("i1"));
    }

    #[tokio::test]
    async fn test_cleanup_dry_run_deletes_nothing() {
        let rds = fixture();
        let report = cleanup_owned(&rds, &CleanupConfig::default()).await.unwrap();

        assert_eq!(report.instances, vec!["clone-a"]);
        assert_eq!(report.snapshots, vec!["snap-a"]);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.deleted, 0);
        assert!(rds.instance_exists("clone-a"));
    }

    #[tokio::test]
    async fn test_cleanup_execute_only_owned() {
        let rds = fixture();
        let config = CleanupConfig {
            dry_run: false,
            ..Default::default()
        };
        let report = cleanup_owned(&rds, &config).await.unwrap();

        assert_eq!(report.deleted, 2);
        assert!(!rds.instance_exists("clone-a"));
        assert!(rds.instance_exists("prod-db"));
        assert!(rds.snapshot_exists("manual"));
        assert!(!rds.snapshot_exists("snap-a"));
    }

    #[tokio::test]
    async fn test_cleanup_snapshots_only() {
        let rds = fixture();
        let config = CleanupConfig {
            dry_run: false,
            include_instances: false,
            include_snapshots: true,
        };
        let report = cleanup_owned(&rds, &config).await.unwrap();

        assert!(report.instances.is_empty());
        assert_eq!(report.deleted, 1);
        assert!(rds.instance_exists("clone-a"));
    }
}
