//! Core types for the clone lifecycle

use crate::query::QueryTiming;
use crate::wait::WaitConfig;
use rds_clone_common::defaults::DEFAULT_INSTANCE_CLASS;
use std::fmt;
use std::time::Duration;

/// Where the clone's snapshot comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    /// Last available snapshot of the source, in provider order
    #[default]
    Latest,
    /// A new snapshot taken now, deleted again at teardown
    Fresh,
}

/// Parameters of one lifecycle run
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Identifier of the production instance to clone
    pub source: String,
    pub instance_class: String,
    pub multi_az: bool,
    pub snapshot: SnapshotSource,
    pub wait: WaitConfig,
}

impl LifecycleConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            instance_class: DEFAULT_INSTANCE_CLASS.to_string(),
            multi_az: false,
            snapshot: SnapshotSource::Latest,
            wait: WaitConfig::default(),
        }
    }
}

/// Steps of the lifecycle, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    DiscoverSource,
    PrepareSnapshot,
    Restore,
    WaitRestored,
    Modify,
    WaitModified,
    Reboot,
    Execute,
    Teardown,
}

impl LifecycleStage {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStage::DiscoverSource => "discover-source",
            LifecycleStage::PrepareSnapshot => "prepare-snapshot",
            LifecycleStage::Restore => "restore",
            LifecycleStage::WaitRestored => "wait-restored",
            LifecycleStage::Modify => "modify",
            LifecycleStage::WaitModified => "wait-modified",
            LifecycleStage::Reboot => "reboot",
            LifecycleStage::Execute => "execute",
            LifecycleStage::Teardown => "teardown",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot the clone was restored from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUsed {
    pub identifier: String,
    /// Created by this run
    pub created: bool,
    /// Carries the ownership tags, so teardown may delete it
    pub owned: bool,
}

/// Outcome of a completed lifecycle run
#[derive(Debug, Clone)]
pub struct LifecycleReport {
    pub clone_identifier: String,
    pub snapshot: SnapshotUsed,
    /// Clone needed a reboot to apply its parameter group
    pub rebooted: bool,
    pub timings: Vec<QueryTiming>,
}

impl LifecycleReport {
    pub fn total_query_time(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}
