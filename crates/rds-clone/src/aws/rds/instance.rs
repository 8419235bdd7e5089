//! DB instance lifecycle operations

use super::types::{
    DbInstance, Endpoint, ModifyParams, ParameterGroupStatus, RestoreParams,
    SecurityGroupMembership,
};
use super::{RdsClient, is_not_found, sdk_tags};
use anyhow::{Context, Result};
use tracing::{debug, info};

impl RdsClient {
    /// Describe instances, following pagination markers.
    ///
    /// A lookup by an identifier that does not exist returns an empty list
    /// instead of an error.
    pub async fn describe_instances(&self, identifier: Option<&str>) -> Result<Vec<DbInstance>> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let response = self
                .client
                .describe_db_instances()
                .set_db_instance_identifier(identifier.map(str::to_string))
                .set_marker(marker.take())
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) if identifier.is_some() && is_not_found(&e) => {
                    debug!(identifier = ?identifier, "DB instance not found");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e).context("Failed to describe DB instances"),
            };

            instances.extend(response.db_instances().iter().map(DbInstance::from));

            match response.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(instances)
    }

    /// Restore a new instance from a snapshot, tags attached in the same call
    pub async fn restore_from_snapshot(&self, params: RestoreParams) -> Result<DbInstance> {
        info!(
            identifier = %params.identifier,
            snapshot = %params.snapshot_identifier,
            instance_class = %params.instance_class,
            multi_az = params.multi_az,
            "Restoring DB instance from snapshot"
        );

        let response = self
            .client
            .restore_db_instance_from_db_snapshot()
            .db_instance_identifier(&params.identifier)
            .db_snapshot_identifier(&params.snapshot_identifier)
            .db_instance_class(&params.instance_class)
            .multi_az(params.multi_az)
            .set_db_subnet_group_name(params.subnet_group.clone())
            .set_storage_type(params.storage_type.clone())
            .set_tags(Some(sdk_tags(&params.tags)))
            .send()
            .await
            .context("Failed to restore DB instance from snapshot")?;

        let instance = response
            .db_instance()
            .context("No DB instance in restore response")?;

        Ok(instance.into())
    }

    /// Modify an instance
    pub async fn modify_instance(&self, params: ModifyParams) -> Result<DbInstance> {
        info!(
            identifier = %params.identifier,
            parameter_group = ?params.parameter_group,
            security_groups = ?params.security_group_ids,
            apply_immediately = params.apply_immediately,
            "Modifying DB instance"
        );

        let response = self
            .client
            .modify_db_instance()
            .db_instance_identifier(&params.identifier)
            .set_db_parameter_group_name(params.parameter_group.clone())
            .set_vpc_security_group_ids(Some(params.security_group_ids.clone()))
            .apply_immediately(params.apply_immediately)
            .send()
            .await
            .context("Failed to modify DB instance")?;

        let instance = response
            .db_instance()
            .context("No DB instance in modify response")?;

        Ok(instance.into())
    }

    /// Reboot an instance
    pub async fn reboot_instance(&self, identifier: &str) -> Result<DbInstance> {
        info!(identifier = %identifier, "Rebooting DB instance");

        let response = self
            .client
            .reboot_db_instance()
            .db_instance_identifier(identifier)
            .send()
            .await
            .context("Failed to reboot DB instance")?;

        let instance = response
            .db_instance()
            .context("No DB instance in reboot response")?;

        Ok(instance.into())
    }

    /// Delete an instance
    pub async fn delete_instance(
        &self,
        identifier: &str,
        skip_final_snapshot: bool,
    ) -> Result<DbInstance> {
        info!(identifier = %identifier, skip_final_snapshot, "Deleting DB instance");

        let response = self
            .client
            .delete_db_instance()
            .db_instance_identifier(identifier)
            .skip_final_snapshot(skip_final_snapshot)
            .send()
            .await
            .context("Failed to delete DB instance")?;

        let instance = response
            .db_instance()
            .context("No DB instance in delete response")?;

        Ok(instance.into())
    }
}

impl From<&aws_sdk_rds::types::DbInstance> for DbInstance {
    fn from(i: &aws_sdk_rds::types::DbInstance) -> Self {
        let endpoint = i.endpoint().and_then(|ep| {
            let address = ep.address()?;
            let port = u16::try_from(ep.port()?).ok()?;
            Some(Endpoint {
                address: address.to_string(),
                port,
            })
        });

        DbInstance {
            identifier: i.db_instance_identifier().unwrap_or_default().to_string(),
            status: i.db_instance_status().unwrap_or_default().to_string(),
            engine: i.engine().unwrap_or_default().to_string(),
            instance_class: i.db_instance_class().unwrap_or_default().to_string(),
            multi_az: i.multi_az().unwrap_or(false),
            endpoint,
            subnet_group: i
                .db_subnet_group()
                .and_then(|g| g.db_subnet_group_name())
                .map(str::to_string),
            storage_type: i.storage_type().map(str::to_string),
            parameter_groups: i
                .db_parameter_groups()
                .iter()
                .map(|pg| ParameterGroupStatus {
                    name: pg.db_parameter_group_name().unwrap_or_default().to_string(),
                    apply_status: pg.parameter_apply_status().unwrap_or_default().to_string(),
                })
                .collect(),
            security_groups: i
                .vpc_security_groups()
                .iter()
                .map(|sg| SecurityGroupMembership {
                    id: sg.vpc_security_group_id().unwrap_or_default().to_string(),
                    status: sg.status().unwrap_or_default().to_string(),
                })
                .collect(),
        }
    }
}
