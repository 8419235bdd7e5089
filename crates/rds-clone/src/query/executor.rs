//! Ordered execution of a query batch over one connection

use super::Query;
use super::connection::{Connector, SqlConnection};
use super::driver::{DbCredentials, DriverParams};
use super::export::ResultExporter;
use crate::aws::rds::Endpoint;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Timing of one successfully executed query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTiming {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub rows: u64,
    /// CSV written for this query, if any
    pub artifact: Option<PathBuf>,
}

/// A batch that stopped early, with the timings of the queries that ran.
#[derive(Debug, Error)]
#[error("query batch stopped after {} of {total} queries", completed.len())]
pub struct BatchError {
    pub completed: Vec<QueryTiming>,
    pub total: usize,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl BatchError {
    fn new(completed: Vec<QueryTiming>, total: usize, source: anyhow::Error) -> Self {
        Self {
            completed,
            total,
            source: source.into(),
        }
    }
}

/// Runs queries against a clone and streams results to the exporter
pub struct QueryExecutor<C> {
    connector: C,
    credentials: DbCredentials,
    exporter: ResultExporter,
}

impl<C: Connector> QueryExecutor<C> {
    pub fn new(connector: C, credentials: DbCredentials, exporter: ResultExporter) -> Self {
        Self {
            connector,
            credentials,
            exporter,
        }
    }

    /// Execute `queries` in order over a single connection.
    ///
    /// An engine with no driver fails with [`LifecycleError::DriverNotFound`]
    /// before any connection is opened. Once queries run, the first failing
    /// one stops the batch with a [`BatchError`] carrying the timings so
    /// far. The connection is closed exactly once whether or not a query
    /// failed. Export failures are logged and do not stop the batch.
    ///
    /// [`LifecycleError::DriverNotFound`]: crate::orchestrator::LifecycleError::DriverNotFound
    pub async fn execute(
        &self,
        engine: &str,
        endpoint: &Endpoint,
        queries: &[Query],
    ) -> Result<Vec<QueryTiming>> {
        let total = queries.len();
        let params = DriverParams::from_engine(engine, endpoint, &self.credentials)?;
        debug!(driver = %params.driver, dsn = %params.redacted_dsn(), "Derived driver parameters");

        let mut conn = self.connector.open(&params).await?;

        let mut timings = Vec::with_capacity(total);
        let mut failure = None;

        for query in queries {
            let started_at = Utc::now();
            let start = Instant::now();
            info!(query = %query.name, started_at = %started_at, "Query started");

            let mut sink = self.exporter.begin(&query.name);
            let outcome = conn.query(&query.sql, &mut sink).await;
            let artifact = sink.finish().unwrap_or_else(|e| {
                warn!(query = %query.name, error = ?e, "Failed to export query result");
                None
            });

            let rows = match outcome {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(query = %query.name, error = %e, partial = ?artifact, "Query failed");
                    failure = Some(e.context(format!("Query '{}' failed", query.name)));
                    break;
                }
            };

            let elapsed = start.elapsed();
            info!(
                query = %query.name,
                elapsed_ms = elapsed.as_millis() as u64,
                rows,
                "Query finished"
            );

            timings.push(QueryTiming {
                name: query.name.clone(),
                started_at,
                elapsed,
                rows,
                artifact,
            });
        }

        if let Err(e) = conn.close().await {
            warn!(error = ?e, "Failed to close SQL connection");
        }

        match failure {
            Some(e) => Err(BatchError::new(timings, total, e).into()),
            None => Ok(timings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::LifecycleError;
    use crate::query::ExportConfig;
    use crate::testing::{CannedRows, FakeConnector};

    fn queries(sqls: &[&str]) -> Vec<Query> {
        sqls.iter()
            .enumerate()
            .map(|(i, sql)| Query {
                name: format!("q{}", i + 1),
                sql: sql.to_string(),
            })
            .collect()
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            address: "clone.local".to_string(),
            port: 3306,
        }
    }

    fn executor(connector: FakeConnector, export: ExportConfig) -> QueryExecutor<FakeConnector> {
        QueryExecutor::new(
            connector,
            DbCredentials {
                user: "admin".to_string(),
                pass: "pw".to_string(),
            },
            ResultExporter::new(export),
        )
    }

    fn no_files() -> ExportConfig {
        ExportConfig {
            file: false,
            ..Default::default()
        }
    }

    fn files_in(root: &std::path::Path) -> ExportConfig {
        ExportConfig {
            file: true,
            root: Some(root.to_path_buf()),
            bom: false,
        }
    }

    #[tokio::test]
    async fn test_second_query_failure_keeps_first_timing() {
        let connector = FakeConnector::new();
        connector.fail("SELECT broken");
        let exec = executor(connector.clone(), no_files());

        let err = exec
            .execute("mysql", &endpoint(), &queries(&["SELECT 1", "SELECT broken", "SELECT 3"]))
            .await
            .unwrap_err();

        let batch = err.downcast_ref::<BatchError>().unwrap();
        assert_eq!(batch.completed.len(), 1);
        assert_eq!(batch.completed[0].name, "q1");
        assert_eq!(batch.total, 3);
        assert_eq!(connector.executed(), vec!["SELECT 1", "SELECT broken"]);
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn test_all_queries_in_order() {
        let connector = FakeConnector::new();
        let exec = executor(connector.clone(), no_files());

        let timings = exec
            .execute("mysql-8.0", &endpoint(), &queries(&["A", "B", "C"]))
            .await
            .unwrap();

        let names: Vec<_> = timings.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["q1", "q2", "q3"]);
        assert_eq!(connector.executed(), vec!["A", "B", "C"]);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn test_unknown_engine_is_driver_not_found() {
        let connector = FakeConnector::new();
        let exec = executor(connector.clone(), no_files());

        let err = exec
            .execute("mariadb", &endpoint(), &queries(&["SELECT 1"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LifecycleError>(),
            Some(LifecycleError::DriverNotFound { engine }) if engine == "mariadb"
        ));
        assert!(err.downcast_ref::<BatchError>().is_none());
        assert_eq!(connector.opened(), 0);
    }

    #[tokio::test]
    async fn test_exports_only_results_with_columns() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new();
        connector.respond("SELECT id FROM t", CannedRows::new(&["id"], &[&[Some("7")]]));
        let exec = executor(connector, files_in(dir.path()));

        let timings = exec
            .execute("mysql", &endpoint(), &queries(&["SELECT id FROM t", "UPDATE t SET x = 1"]))
            .await
            .unwrap();

        let artifact = timings[0].artifact.as_ref().unwrap();
        assert_eq!(std::fs::read_to_string(artifact).unwrap(), "id\n7\n");
        assert_eq!(timings[0].rows, 1);
        assert!(timings[1].artifact.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_rows_streamed_before_driver_error_stay_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new();
        connector.respond(
            "SELECT n FROM big",
            CannedRows::new(&["n"], &[&[Some("1")], &[Some("2")], &[Some("3")]]).failing_after(2),
        );
        let exec = executor(connector.clone(), files_in(dir.path()));

        let err = exec
            .execute("postgres", &endpoint(), &queries(&["SELECT n FROM big", "SELECT 2"]))
            .await
            .unwrap_err();

        let batch = err.downcast_ref::<BatchError>().unwrap();
        assert!(batch.completed.is_empty());
        assert!(batch.source.to_string().contains("q1"));
        assert_eq!(connector.executed(), vec!["SELECT n FROM big"]);
        assert_eq!(connector.closed(), 1);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "n\n1\n2\n");
    }

    #[tokio::test]
    async fn test_export_failure_does_not_stop_batch() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let connector = FakeConnector::new();
        connector.respond("SELECT a", CannedRows::new(&["a"], &[&[Some("1")]]));
        connector.respond("SELECT b", CannedRows::new(&["b"], &[&[None], &[Some("2")]]));
        let exec = executor(connector.clone(), files_in(blocker.path()));

        let timings = exec
            .execute("mysql", &endpoint(), &queries(&["SELECT a", "SELECT b"]))
            .await
            .unwrap();

        assert_eq!(connector.executed(), vec!["SELECT a", "SELECT b"]);
        assert_eq!(timings.len(), 2);
        assert_eq!(timings[1].rows, 2);
        assert!(timings.iter().all(|t| t.artifact.is_none()));
        assert_eq!(connector.closed(), 1);
    }
}
