//! RDS operations trait for testing

use super::RdsClient;
use super::types::{DbInstance, DbSnapshot, ModifyParams, RestoreParams, SnapshotFilter, Tag};
use anyhow::Result;
use std::future::Future;

/// Trait for the RDS calls the orchestrator makes.
///
/// Abstracts the SDK client so the lifecycle, the status waiter and
/// tag-based discovery can be unit tested against an in-memory gateway.
/// Every call is a single request with no retry.
pub trait RdsOperations: Send + Sync {
    /// Prefix for ARNs of this account/region (`arn:aws:rds:<region>:<account>:`)
    fn arn_prefix(&self) -> &str;

    /// Describe instances; `None` lists every instance in the region.
    ///
    /// An identifier that does not exist yields an empty list.
    fn describe_instances(
        &self,
        identifier: Option<&str>,
    ) -> impl Future<Output = Result<Vec<DbInstance>>> + Send;

    /// Describe snapshots matching the filter, in provider order.
    ///
    /// A snapshot identifier that does not exist yields an empty list.
    fn describe_snapshots(
        &self,
        filter: SnapshotFilter,
    ) -> impl Future<Output = Result<Vec<DbSnapshot>>> + Send;

    /// Restore a new instance from a snapshot
    fn restore_from_snapshot(
        &self,
        params: RestoreParams,
    ) -> impl Future<Output = Result<DbInstance>> + Send;

    /// Modify an instance
    fn modify_instance(&self, params: ModifyParams)
    -> impl Future<Output = Result<DbInstance>> + Send;

    /// Reboot an instance
    fn reboot_instance(&self, identifier: &str) -> impl Future<Output = Result<DbInstance>> + Send;

    /// Delete an instance
    fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> impl Future<Output = Result<DbInstance>> + Send;

    /// Create a snapshot of an instance with tags attached at creation
    fn create_snapshot(
        &self,
        instance_identifier: &str,
        snapshot_identifier: &str,
        tags: Vec<Tag>,
    ) -> impl Future<Output = Result<DbSnapshot>> + Send;

    /// Delete a snapshot
    fn delete_snapshot(&self, identifier: &str) -> impl Future<Output = Result<DbSnapshot>> + Send;

    /// List the tags attached to a resource ARN
    fn list_tags(&self, arn: &str) -> impl Future<Output = Result<Vec<Tag>>> + Send;
}

impl RdsOperations for RdsClient {
    fn arn_prefix(&self) -> &str {
        &self.arn_prefix
    }

    async fn describe_instances(&self, identifier: Option<&str>) -> Result<Vec<DbInstance>> {
        RdsClient::describe_instances(self, identifier).await
    }

    async fn describe_snapshots(&self, filter: SnapshotFilter) -> Result<Vec<DbSnapshot>> {
        RdsClient::describe_snapshots(self, &filter).await
    }

    async fn restore_from_snapshot(&self, params: RestoreParams) -> Result<DbInstance> {
        RdsClient::restore_from_snapshot(self, params).await
    }

    async fn modify_instance(&self, params: ModifyParams) -> Result<DbInstance> {
        RdsClient::modify_instance(self, params).await
    }

    async fn reboot_instance(&self, identifier: &str) -> Result<DbInstance> {
        RdsClient::reboot_instance(self, identifier).await
    }

    async fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<DbInstance> {
        RdsClient::delete_instance(self, identifier, skip_final_snapshot).await
    }

    async fn create_snapshot(
        &self,
        instance_identifier: &str,
        snapshot_identifier: &str,
        tags: Vec<Tag>,
    ) -> Result<DbSnapshot> {
        RdsClient::create_snapshot(self, instance_identifier, snapshot_identifier, tags).await
    }

    async fn delete_snapshot(&self, identifier: &str) -> Result<DbSnapshot> {
        RdsClient::delete_snapshot(self, identifier).await
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
        RdsClient::list_tags(self, arn).await
    }
}
