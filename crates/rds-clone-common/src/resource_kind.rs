//! RDS resource kinds and cleanup ordering

use std::fmt;

/// Kinds of RDS resources managed by rds-clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// DB instance (a clone restored from a snapshot)
    DbInstance,
    /// DB snapshot
    DbSnapshot,
}

impl ResourceKind {
    /// Resource-type segment of an RDS ARN (`arn:aws:rds:<region>:<account>:<segment>:<id>`)
    pub fn arn_segment(self) -> &'static str {
        match self {
            ResourceKind::DbInstance => "db",
            ResourceKind::DbSnapshot => "snapshot",
        }
    }

    /// Human-readable name used in log lines and reports
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::DbInstance => "DB Instance",
            ResourceKind::DbSnapshot => "DB Snapshot",
        }
    }

    /// Get cleanup priority (lower number = cleanup first)
    ///
    /// Clones go before snapshots so a snapshot is never removed while a
    /// restore from it might still be in flight.
    pub fn cleanup_priority(self) -> u8 {
        match self {
            ResourceKind::DbInstance => 0,
            ResourceKind::DbSnapshot => 1,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
