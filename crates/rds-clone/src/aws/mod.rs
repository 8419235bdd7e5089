//! AWS client modules
//!
//! This module provides wrappers around the AWS SDK for:
//! - RDS: instance/snapshot lifecycle calls behind [`RdsOperations`]
//! - STS: account ID lookup for ARN construction
//! - tags: ownership tagging and tag-based discovery
//! - cleanup: bulk deletion of discovered resources

pub mod account;
pub mod cleanup;
pub mod context;
pub mod error;
pub mod rds;
pub mod tags;

pub use account::{AccountId, get_current_account_id};
pub use context::AwsContext;
pub use error::{RdsError, classify_anyhow_error, classify_rds_error};
pub use rds::{
    DbInstance, DbSnapshot, Endpoint, RdsClient, RdsOperations, ResourceBatch,
    ResourceRef, Tag,
};
