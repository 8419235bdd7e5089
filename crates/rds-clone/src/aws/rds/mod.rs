//! RDS instance and snapshot management

mod instance;
mod lookup;
mod operations;
mod snapshot;
mod types;

pub use lookup::{current_status, describe_instance, describe_latest_snapshot, describe_snapshot};
pub use operations::RdsOperations;
pub use types::{
    DbInstance, DbSnapshot, Endpoint, ModifyParams, ParameterGroupStatus, RdsEntity,
    ResourceBatch, ResourceRef, RestoreParams, SecurityGroupMembership, SnapshotFilter, Tag,
};

use crate::aws::account::AccountId;
use crate::aws::context::AwsContext;
use crate::aws::error::classify_rds_error;
use anyhow::{Context, Result};
use aws_sdk_rds::Client;
use aws_sdk_rds::error::{ProvideErrorMetadata, SdkError};
use tracing::debug;

/// RDS client for managing clones and their snapshots
pub struct RdsClient {
    pub(crate) client: Client,
    pub(crate) arn_prefix: String,
}

impl RdsClient {
    /// Create an RDS client from a pre-loaded AWS context
    pub fn new(ctx: &AwsContext, account: &AccountId) -> Self {
        Self {
            client: ctx.rds_client(),
            arn_prefix: account.rds_arn_prefix(ctx.region()),
        }
    }

    /// List the tags attached to a resource ARN
    pub async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
        debug!(arn = %arn, "Listing tags");

        let response = self
            .client
            .list_tags_for_resource()
            .resource_name(arn)
            .send()
            .await
            .with_context(|| format!("Failed to list tags for {arn}"))?;

        Ok(response.tag_list().iter().map(Tag::from).collect())
    }
}

/// Whether an SDK error means the requested identifier does not exist.
pub(crate) fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    classify_rds_error(err.code(), err.message()).is_not_found()
}

impl From<&aws_sdk_rds::types::Tag> for Tag {
    fn from(tag: &aws_sdk_rds::types::Tag) -> Self {
        Tag::new(
            tag.key().unwrap_or_default(),
            tag.value().unwrap_or_default(),
        )
    }
}

impl From<&Tag> for aws_sdk_rds::types::Tag {
    fn from(tag: &Tag) -> Self {
        aws_sdk_rds::types::Tag::builder()
            .key(&tag.key)
            .value(&tag.value)
            .build()
    }
}

pub(crate) fn sdk_tags(tags: &[Tag]) -> Vec<aws_sdk_rds::types::Tag> {
    tags.iter().map(Into::into).collect()
}
