//! Clone lifecycle orchestration
//!
//! Sequences one throwaway clone from start to finish: find the source
//! instance and a snapshot of it, restore a tagged clone, copy the
//! source's parameter group and security groups onto it, run the query
//! batch, then delete the clone (and the snapshot, when this tool owns it).
//!
//! Each step starts only after the previous one succeeded. A failure
//! between restore and query execution leaves the clone running; it
//! carries the ownership tags, so `rds-clone cleanup` finds it later.

pub mod error;
pub mod types;

pub use error::LifecycleError;
pub use types::{LifecycleConfig, LifecycleReport, LifecycleStage, SnapshotSource, SnapshotUsed};

use crate::aws::cleanup::delete_resource;
use crate::aws::rds::{
    DbInstance, ModifyParams, RdsOperations, ResourceRef, RestoreParams, describe_instance,
    describe_latest_snapshot,
};
use crate::aws::tags::{is_owned, ownership_tags};
use crate::query::{BatchError, Connector, Query, QueryExecutor, QueryTiming};
use crate::wait::wait_until_available;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rds_clone_common::naming::derive_identifier;
use std::sync::Arc;
use tracing::{Span, debug, info, instrument, warn};

/// Runs clone lifecycles against one RDS gateway and SQL connector
pub struct CloneLifecycle<G, C> {
    rds: Arc<G>,
    executor: QueryExecutor<C>,
    config: LifecycleConfig,
}

impl<G, C> CloneLifecycle<G, C>
where
    G: RdsOperations + 'static,
    C: Connector,
{
    pub fn new(rds: Arc<G>, executor: QueryExecutor<C>, config: LifecycleConfig) -> Self {
        Self {
            rds,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Clone the source, run `queries` against the clone and tear it down.
    pub async fn run(&self, queries: &[Query]) -> Result<LifecycleReport> {
        self.run_at(queries, Utc::now()).await
    }

    /// [`run`](Self::run) with an explicit creation time for identifiers and tags
    #[instrument(
        name = "clone_lifecycle",
        skip_all,
        fields(source = %self.config.source, clone = tracing::field::Empty)
    )]
    pub async fn run_at(&self, queries: &[Query], now: DateTime<Utc>) -> Result<LifecycleReport> {
        let rds = self.rds.as_ref();

        stage(LifecycleStage::DiscoverSource);
        let source = describe_instance(rds, &self.config.source).await?;
        debug!(engine = %source.engine, status = %source.status, "Found source instance");

        stage(LifecycleStage::PrepareSnapshot);
        let snapshot = self.prepare_snapshot(&source, now).await?;

        stage(LifecycleStage::Restore);
        let clone_id = derive_identifier(&source.identifier, now);
        Span::current().record("clone", clone_id.as_str());
        rds.restore_from_snapshot(RestoreParams {
            identifier: clone_id.clone(),
            snapshot_identifier: snapshot.identifier.clone(),
            instance_class: self.config.instance_class.clone(),
            multi_az: self.config.multi_az,
            subnet_group: source.subnet_group.clone(),
            storage_type: source.storage_type.clone(),
            tags: ownership_tags(now),
        })
        .await?;
        let clone_ref = ResourceRef::instance(&clone_id);

        stage(LifecycleStage::WaitRestored);
        self.wait_for(&clone_ref).await?;

        stage(LifecycleStage::Modify);
        rds.modify_instance(ModifyParams {
            identifier: clone_id.clone(),
            parameter_group: source.primary_parameter_group().map(String::from),
            security_group_ids: source.security_group_ids(),
            apply_immediately: true,
        })
        .await?;

        stage(LifecycleStage::WaitModified);
        self.wait_for(&clone_ref).await?;
        let mut clone = describe_instance(rds, &clone_id).await?;

        let rebooted = clone.has_pending_changes();
        if rebooted {
            stage(LifecycleStage::Reboot);
            info!(clone = %clone_id, "Modifications pending, rebooting clone");
            rds.reboot_instance(&clone_id).await?;
            self.wait_for(&clone_ref).await?;
            clone = describe_instance(rds, &clone_id).await?;
        }

        stage(LifecycleStage::Execute);
        let batch = self.execute(&clone, queries).await;

        stage(LifecycleStage::Teardown);
        let teardown = self.teardown(&clone_ref, &snapshot).await;

        let timings = match (batch, teardown) {
            (Ok(timings), Ok(())) => timings,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(teardown_err)) => {
                warn!(error = ?teardown_err, "Teardown also failed");
                return Err(e);
            }
        };

        info!(clone = %clone_id, queries = timings.len(), "Clone lifecycle complete");
        Ok(LifecycleReport {
            clone_identifier: clone_id,
            snapshot,
            rebooted,
            timings,
        })
    }

    async fn prepare_snapshot(
        &self,
        source: &DbInstance,
        now: DateTime<Utc>,
    ) -> Result<SnapshotUsed> {
        let rds = self.rds.as_ref();
        match self.config.snapshot {
            SnapshotSource::Latest => {
                let snapshot = describe_latest_snapshot(rds, &source.identifier).await?;
                let owned = is_owned(rds, &ResourceRef::from(&snapshot)).await?;
                info!(snapshot = %snapshot.identifier, owned, "Using latest available snapshot");
                Ok(SnapshotUsed {
                    identifier: snapshot.identifier,
                    created: false,
                    owned,
                })
            }
            SnapshotSource::Fresh => {
                let snapshot_id = derive_identifier(&source.identifier, now);
                rds.create_snapshot(&source.identifier, &snapshot_id, ownership_tags(now))
                    .await?;
                info!(snapshot = %snapshot_id, "Created snapshot of source instance");
                self.wait_for(&ResourceRef::snapshot(&snapshot_id)).await?;
                Ok(SnapshotUsed {
                    identifier: snapshot_id,
                    created: true,
                    owned: true,
                })
            }
        }
    }

    async fn execute(&self, clone: &DbInstance, queries: &[Query]) -> Result<Vec<QueryTiming>> {
        let endpoint = clone
            .endpoint
            .as_ref()
            .ok_or_else(|| LifecycleError::MissingAttribute {
                resource: ResourceRef::from(clone),
                field: "endpoint",
            })?;

        let result = self.executor.execute(&clone.engine, endpoint, queries).await;
        if let Err(e) = &result {
            match e.downcast_ref::<BatchError>() {
                Some(batch) => warn!(
                    completed = batch.completed.len(),
                    total = batch.total,
                    "Query batch failed"
                ),
                None => warn!(error = %e, "Query batch did not start"),
            }
        }
        result
    }

    /// Wait for a resource; anything but "available" aborts the lifecycle.
    async fn wait_for(&self, target: &ResourceRef) -> Result<()> {
        let outcome =
            wait_until_available(self.rds.clone(), target.clone(), self.config.wait).await;
        if outcome.is_ready() {
            return Ok(());
        }

        warn!(resource = %target, outcome = %outcome, "Aborting; resource left for cleanup");
        Err(LifecycleError::WaitFailed {
            resource: target.clone(),
            outcome,
        }
        .into())
    }

    /// Delete the clone, then the snapshot if this tool owns it.
    ///
    /// Both deletions are attempted; the first error is returned.
    async fn teardown(&self, clone: &ResourceRef, snapshot: &SnapshotUsed) -> Result<()> {
        let rds = self.rds.as_ref();
        let mut first_error = None;

        match delete_resource(rds, clone).await {
            Ok(()) => info!(resource = %clone, "Deleted clone"),
            Err(e) => {
                warn!(resource = %clone, error = ?e, "Failed to delete clone");
                first_error = Some(e);
            }
        }

        if snapshot.owned {
            let target = ResourceRef::snapshot(&snapshot.identifier);
            match delete_resource(rds, &target).await {
                Ok(()) => info!(resource = %target, "Deleted snapshot"),
                Err(e) => {
                    warn!(resource = %target, error = ?e, "Failed to delete snapshot");
                    first_error.get_or_insert(e);
                }
            }
        } else {
            debug!(snapshot = %snapshot.identifier, "Keeping snapshot not created by rds-clone");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn stage(stage: LifecycleStage) {
    info!(stage = %stage, "Lifecycle stage");
}
