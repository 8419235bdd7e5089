//! DB snapshot operations

use super::types::{DbSnapshot, SnapshotFilter, Tag};
use super::{RdsClient, is_not_found, sdk_tags};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

impl RdsClient {
    /// Describe snapshots in provider order, following pagination markers.
    pub async fn describe_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<DbSnapshot>> {
        let mut snapshots = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_db_snapshots()
                .set_db_instance_identifier(filter.instance_identifier.clone())
                .set_db_snapshot_identifier(filter.snapshot_identifier.clone())
                .set_marker(marker.take())
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if filter.snapshot_identifier.is_some() && is_not_found(&e) => {
                    debug!(filter = ?filter, "DB snapshot not found");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e).context("Failed to describe DB snapshots"),
            };

            snapshots.extend(response.db_snapshots().iter().map(DbSnapshot::from));

            match response.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(snapshots)
    }

    /// Create a manual snapshot, tags attached in the same call
    pub async fn create_snapshot(
        &self,
        instance_identifier: &str,
        snapshot_identifier: &str,
        tags: Vec<Tag>,
    ) -> Result<DbSnapshot> {
        info!(
            instance = %instance_identifier,
            snapshot = %snapshot_identifier,
            "Creating DB snapshot"
        );

        let response = self
            .client
            .create_db_snapshot()
            .db_instance_identifier(instance_identifier)
            .db_snapshot_identifier(snapshot_identifier)
            .set_tags(Some(sdk_tags(&tags)))
            .send()
            .await
            .context("Failed to create DB snapshot")?;

        let snapshot = response
            .db_snapshot()
            .context("No DB snapshot in create response")?;

        Ok(snapshot.into())
    }

    /// Delete a snapshot
    pub async fn delete_snapshot(&self, identifier: &str) -> Result<DbSnapshot> {
        info!(snapshot = %identifier, "Deleting DB snapshot");

        let response = self
            .client
            .delete_db_snapshot()
            .db_snapshot_identifier(identifier)
            .send()
            .await
            .context("Failed to delete DB snapshot")?;

        let snapshot = response
            .db_snapshot()
            .context("No DB snapshot in delete response")?;

        Ok(snapshot.into())
    }
}

impl From<&aws_sdk_rds::types::DbSnapshot> for DbSnapshot {
    fn from(s: &aws_sdk_rds::types::DbSnapshot) -> Self {
        DbSnapshot {
            identifier: s.db_snapshot_identifier().unwrap_or_default().to_string(),
            instance_identifier: s.db_instance_identifier().unwrap_or_default().to_string(),
            status: s.status().unwrap_or_default().to_string(),
            created_at: s
                .snapshot_create_time()
                .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
        }
    }
}
