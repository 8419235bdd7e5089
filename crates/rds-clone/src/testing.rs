//! In-memory test doubles for the RDS gateway and the SQL boundary.

use crate::aws::account::resource_arn;
use crate::aws::error::RdsError;
use crate::aws::rds::{
    DbInstance, DbSnapshot, Endpoint, ModifyParams, ParameterGroupStatus, RdsOperations,
    RestoreParams, SecurityGroupMembership, SnapshotFilter, Tag,
};
use crate::query::{Connector, DriverParams, RowSink, SqlConnection};
use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use rds_clone_common::ResourceKind;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const TEST_ARN_PREFIX: &str = "arn:aws:rds:us-east-1:123456789012:";

/// Build an instance with a MySQL-style endpoint and in-sync groups
pub fn instance(identifier: &str, status: &str, engine: &str) -> DbInstance {
    DbInstance {
        identifier: identifier.to_string(),
        status: status.to_string(),
        engine: engine.to_string(),
        instance_class: "db.r5.large".to_string(),
        multi_az: false,
        endpoint: Some(Endpoint {
            address: format!("{identifier}.abc123.us-east-1.rds.amazonaws.com"),
            port: 3306,
        }),
        subnet_group: Some("prod-subnets".to_string()),
        storage_type: Some("gp2".to_string()),
        parameter_groups: vec![ParameterGroupStatus {
            name: "prod-params".to_string(),
            apply_status: "in-sync".to_string(),
        }],
        security_groups: vec![SecurityGroupMembership {
            id: "sg-prod".to_string(),
            status: "active".to_string(),
        }],
    }
}

pub fn snapshot(identifier: &str, instance_identifier: &str, status: &str) -> DbSnapshot {
    DbSnapshot {
        identifier: identifier.to_string(),
        instance_identifier: instance_identifier.to_string(),
        status: status.to_string(),
        created_at: None,
    }
}

#[derive(Default)]
struct FakeState {
    instances: Vec<DbInstance>,
    snapshots: Vec<DbSnapshot>,
    tags: HashMap<String, Vec<Tag>>,
    /// Statuses handed out on successive describes by id; the last one sticks
    scripts: HashMap<String, VecDeque<String>>,
    failing: HashSet<String>,
    pending_after_modify: bool,
    calls: Vec<String>,
}

impl FakeState {
    fn record(&mut self, op: &str, id: &str) -> Result<()> {
        self.calls.push(format!("{op}:{id}"));
        if self.failing.contains(&format!("{op}:{id}")) {
            bail!("injected {op} failure for {id}");
        }
        Ok(())
    }

    fn next_status(&mut self, id: &str, current: &str) -> String {
        if let Some(script) = self.scripts.get_mut(id) {
            if script.len() > 1 {
                if let Some(status) = script.pop_front() {
                    return status;
                }
            }
            if let Some(status) = script.front() {
                return status.clone();
            }
        }
        match current {
            "creating" | "modifying" | "rebooting" => "available".to_string(),
            other => other.to_string(),
        }
    }
}

fn not_found(what: &str, id: &str) -> anyhow::Error {
    anyhow!(RdsError::NotFound {
        code: "DBInstanceNotFound".to_string(),
        message: format!("{what} {id} not found"),
    })
}

/// In-memory RDS gateway.
///
/// Resources in a transitional status become "available" on their next
/// describe by id unless a status script says otherwise.
pub struct FakeRds {
    state: Mutex<FakeState>,
}

impl FakeRds {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// A fake with one available source instance
    pub fn with_source(identifier: &str, engine: &str) -> Self {
        let rds = Self::new();
        rds.add_instance(instance(identifier, "available", engine));
        rds
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_instance(&self, instance: DbInstance) {
        self.lock().instances.push(instance);
    }

    pub fn add_snapshot(&self, snapshot: DbSnapshot) {
        self.lock().snapshots.push(snapshot);
    }

    pub fn set_tags(&self, kind: ResourceKind, identifier: &str, tags: Vec<Tag>) {
        let arn = resource_arn(TEST_ARN_PREFIX, kind, identifier);
        self.lock().tags.insert(arn, tags);
    }

    pub fn tags_of(&self, kind: ResourceKind, identifier: &str) -> Vec<Tag> {
        let arn = resource_arn(TEST_ARN_PREFIX, kind, identifier);
        self.lock().tags.get(&arn).cloned().unwrap_or_default()
    }

    /// Make every describe-by-id of `identifier` walk through `statuses`
    pub fn script_status(&self, identifier: &str, statuses: &[&str]) {
        self.lock().scripts.insert(
            identifier.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Fail the call `op` (as it appears in the call log) for `identifier`
    pub fn fail_on(&self, op: &str, identifier: &str) {
        self.lock().failing.insert(format!("{op}:{identifier}"));
    }

    pub fn fail_list_tags_for(&self, identifier: &str) {
        self.fail_on("list_tags", identifier);
    }

    /// Leave parameter groups pending a reboot after the next modify
    pub fn leave_pending_after_modify(&self) {
        self.lock().pending_after_modify = true;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn instance_exists(&self, identifier: &str) -> bool {
        self.lock().instances.iter().any(|i| i.identifier == identifier)
    }

    pub fn snapshot_exists(&self, identifier: &str) -> bool {
        self.lock().snapshots.iter().any(|s| s.identifier == identifier)
    }
}

impl RdsOperations for FakeRds {
    fn arn_prefix(&self) -> &str {
        TEST_ARN_PREFIX
    }

    async fn describe_instances(&self, identifier: Option<&str>) -> Result<Vec<DbInstance>> {
        let mut state = self.lock();
        let Some(id) = identifier else {
            state.record("describe_instances", "*")?;
            return Ok(state.instances.clone());
        };
        state.record("describe_instances", id)?;

        let Some(pos) = state.instances.iter().position(|i| i.identifier == id) else {
            return Ok(Vec::new());
        };
        let current = state.instances[pos].status.clone();
        let status = state.next_status(id, &current);
        state.instances[pos].status = status;
        Ok(vec![state.instances[pos].clone()])
    }

    async fn describe_snapshots(&self, filter: SnapshotFilter) -> Result<Vec<DbSnapshot>> {
        let mut state = self.lock();
        if let Some(id) = filter.snapshot_identifier.as_deref() {
            state.record("describe_snapshots", id)?;
            let Some(pos) = state.snapshots.iter().position(|s| s.identifier == id) else {
                return Ok(Vec::new());
            };
            let current = state.snapshots[pos].status.clone();
            let status = state.next_status(id, &current);
            state.snapshots[pos].status = status;
            return Ok(vec![state.snapshots[pos].clone()]);
        }

        let key = filter.instance_identifier.as_deref().unwrap_or("*");
        state.record("describe_snapshots", key)?;
        Ok(state
            .snapshots
            .iter()
            .filter(|s| {
                filter
                    .instance_identifier
                    .as_deref()
                    .is_none_or(|i| s.instance_identifier == i)
            })
            .cloned()
            .collect())
    }

    async fn restore_from_snapshot(&self, params: RestoreParams) -> Result<DbInstance> {
        let mut state = self.lock();
        state.record("restore", &params.identifier)?;

        if state.instances.iter().any(|i| i.identifier == params.identifier) {
            return Err(anyhow!(RdsError::AlreadyExists {
                code: "DBInstanceAlreadyExists".to_string(),
                message: params.identifier.clone(),
            }));
        }
        let source = state
            .snapshots
            .iter()
            .find(|s| s.identifier == params.snapshot_identifier)
            .map(|s| s.instance_identifier.clone())
            .ok_or_else(|| not_found("snapshot", &params.snapshot_identifier))?;
        let engine = state
            .instances
            .iter()
            .find(|i| i.identifier == source)
            .map(|i| i.engine.clone())
            .unwrap_or_else(|| "mysql".to_string());

        let mut clone = instance(&params.identifier, "creating", &engine);
        clone.instance_class = params.instance_class;
        clone.multi_az = params.multi_az;
        clone.subnet_group = params.subnet_group;
        clone.storage_type = params.storage_type;
        clone.parameter_groups[0].name = "default".to_string();
        clone.security_groups[0].id = "sg-default".to_string();

        let arn = resource_arn(TEST_ARN_PREFIX, ResourceKind::DbInstance, &params.identifier);
        state.tags.insert(arn, params.tags);
        state.instances.push(clone.clone());
        Ok(clone)
    }

    async fn modify_instance(&self, params: ModifyParams) -> Result<DbInstance> {
        let mut state = self.lock();
        state.record("modify", &params.identifier)?;
        let pending = state.pending_after_modify;

        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.identifier == params.identifier)
            .ok_or_else(|| not_found("instance", &params.identifier))?;
        instance.status = "modifying".to_string();
        if let Some(pg) = params.parameter_group {
            instance.parameter_groups = vec![ParameterGroupStatus {
                name: pg,
                apply_status: if pending { "pending-reboot" } else { "in-sync" }.to_string(),
            }];
        }
        instance.security_groups = params
            .security_group_ids
            .into_iter()
            .map(|id| SecurityGroupMembership {
                id,
                status: "active".to_string(),
            })
            .collect();
        Ok(instance.clone())
    }

    async fn reboot_instance(&self, identifier: &str) -> Result<DbInstance> {
        let mut state = self.lock();
        state.record("reboot", identifier)?;
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.identifier == identifier)
            .ok_or_else(|| not_found("instance", identifier))?;
        instance.status = "rebooting".to_string();
        for pg in &mut instance.parameter_groups {
            pg.apply_status = "in-sync".to_string();
        }
        Ok(instance.clone())
    }

    async fn delete_instance(
        &self,
        identifier: &str,
        _skip_final_snapshot: bool,
    ) -> Result<DbInstance> {
        let mut state = self.lock();
        state.record("delete_instance", identifier)?;
        let pos = state
            .instances
            .iter()
            .position(|i| i.identifier == identifier)
            .ok_or_else(|| not_found("instance", identifier))?;
        let mut removed = state.instances.remove(pos);
        removed.status = "deleting".to_string();
        Ok(removed)
    }

    async fn create_snapshot(
        &self,
        instance_identifier: &str,
        snapshot_identifier: &str,
        tags: Vec<Tag>,
    ) -> Result<DbSnapshot> {
        let mut state = self.lock();
        state.record("create_snapshot", snapshot_identifier)?;
        if !state.instances.iter().any(|i| i.identifier == instance_identifier) {
            return Err(not_found("instance", instance_identifier));
        }

        let mut created = snapshot(snapshot_identifier, instance_identifier, "creating");
        created.created_at = Some(Utc::now());
        let arn = resource_arn(TEST_ARN_PREFIX, ResourceKind::DbSnapshot, snapshot_identifier);
        state.tags.insert(arn, tags);
        state.snapshots.push(created.clone());
        Ok(created)
    }

    async fn delete_snapshot(&self, identifier: &str) -> Result<DbSnapshot> {
        let mut state = self.lock();
        state.record("delete_snapshot", identifier)?;
        let pos = state
            .snapshots
            .iter()
            .position(|s| s.identifier == identifier)
            .ok_or_else(|| not_found("snapshot", identifier))?;
        let mut removed = state.snapshots.remove(pos);
        removed.status = "deleted".to_string();
        Ok(removed)
    }

    async fn list_tags(&self, arn: &str) -> Result<Vec<Tag>> {
        let mut state = self.lock();
        state.calls.push(format!("list_tags:{arn}"));
        let id = arn.rsplit(':').next().unwrap_or_default();
        if state.failing.contains(&format!("list_tags:{id}")) {
            bail!("injected list_tags failure for {arn}");
        }
        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }
}

/// What a [`FakeConnector`] and its connections observed
#[derive(Debug, Default)]
pub struct ConnectionLog {
    pub opened: Vec<DriverParams>,
    pub executed: Vec<String>,
    pub closed: usize,
}

/// Canned answer to one SQL string
#[derive(Debug, Clone, Default)]
pub struct CannedRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Driver error raised once this many rows have been streamed
    pub fail_after: Option<usize>,
}

impl CannedRows {
    pub fn new(columns: &[&str], rows: &[&[Option<&str>]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
            fail_after: None,
        }
    }

    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

/// SQL connector whose connections stream canned rows.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub log: Arc<Mutex<ConnectionLog>>,
    results: Arc<Mutex<HashMap<String, CannedRows>>>,
    failing_sql: Arc<Mutex<HashSet<String>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, sql: &str, result: CannedRows) {
        self.results.lock().unwrap().insert(sql.to_string(), result);
    }

    pub fn fail(&self, sql: &str) {
        self.failing_sql.lock().unwrap().insert(sql.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().executed.clone()
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    pub fn opened(&self) -> usize {
        self.log.lock().unwrap().opened.len()
    }
}

pub struct FakeConnection {
    connector: FakeConnector,
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn open(&self, params: &DriverParams) -> Result<FakeConnection> {
        self.log.lock().unwrap().opened.push(params.clone());
        Ok(FakeConnection {
            connector: self.clone(),
        })
    }
}

impl SqlConnection for FakeConnection {
    async fn query<S: RowSink + Send>(&mut self, sql: &str, sink: &mut S) -> Result<u64> {
        self.connector
            .log
            .lock()
            .unwrap()
            .executed
            .push(sql.to_string());
        if self.connector.failing_sql.lock().unwrap().contains(sql) {
            bail!("syntax error near '{sql}'");
        }
        let canned = self
            .connector
            .results
            .lock()
            .unwrap()
            .get(sql)
            .cloned()
            .unwrap_or_default();

        sink.columns(&canned.columns);
        for (streamed, row) in canned.rows.iter().enumerate() {
            if canned.fail_after == Some(streamed) {
                bail!("connection lost after {streamed} rows");
            }
            sink.row(row);
        }
        Ok(canned.rows.len() as u64)
    }

    async fn close(self) -> Result<()> {
        self.connector.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
