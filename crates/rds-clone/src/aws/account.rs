//! AWS account identity and ARN construction

use anyhow::{Context, Result};
use rds_clone_common::ResourceKind;
use tracing::info;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl AccountId {
    /// Use an account ID supplied by configuration instead of STS
    pub fn from_config(s: &str) -> Self {
        AccountId(s.trim().to_string())
    }

    /// Prefix shared by every RDS ARN in this account and region
    pub fn rds_arn_prefix(&self, region: &str) -> String {
        format!("arn:aws:rds:{}:{}:", region, self.0)
    }
}

/// Build the ARN of an RDS resource from an ARN prefix.
pub fn resource_arn(prefix: &str, kind: ResourceKind, identifier: &str) -> String {
    format!("{}{}:{}", prefix, kind.arn_segment(), identifier)
}

/// Fetch the current AWS account ID from credentials via STS GetCallerIdentity
///
/// This operation requires no special permissions, so it doubles as a
/// credential check before any RDS call is made.
pub async fn get_current_account_id(config: &aws_config::SdkConfig) -> Result<AccountId> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = sts
        .get_caller_identity()
        .send()
        .await
        .context("Failed to get AWS caller identity - check credentials")?;

    let account = identity
        .account()
        .context("No account ID returned from STS GetCallerIdentity")?;

    info!(account_id = %account, "AWS account validated");

    Ok(AccountId(account.to_string()))
}
