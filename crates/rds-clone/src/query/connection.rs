//! SQL connection boundary
//!
//! [`Connector`] opens one [`SqlConnection`] per query batch. The production
//! implementation is [`SqlxConnector`], which speaks the text protocol so
//! every value comes back as the server rendered it. Rows are handed to a
//! [`RowSink`] as they arrive; a result set is never held in memory whole.

use super::driver::{Driver, DriverParams};
use crate::orchestrator::LifecycleError;
use anyhow::{Context, Result};
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, ColumnIndex, ConnectOptions, Connection, Decode, Executor, Row, Statement};
use std::future::Future;
use tracing::debug;

/// Receives one result set, a row at a time.
///
/// `columns` is called exactly once per query, before any row. It gets the
/// column names of the first row, or of the prepared statement when the
/// query returned nothing; statements without a result set pass an empty
/// slice. `None` values are SQL NULL.
pub trait RowSink {
    fn columns(&mut self, columns: &[String]);
    fn row(&mut self, values: &[Option<String>]);
}

/// One open database connection
pub trait SqlConnection: Send {
    /// Run `sql`, streaming its rows into `sink`; returns the row count.
    ///
    /// On a driver error mid-stream the rows already delivered stay with
    /// the sink.
    fn query<S: RowSink + Send>(
        &mut self,
        sql: &str,
        sink: &mut S,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Close the connection; consumes it so it cannot be closed twice
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens connections from derived driver parameters
pub trait Connector: Send + Sync {
    type Connection: SqlConnection;

    fn open(&self, params: &DriverParams)
    -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// Connector backed by sqlx (MySQL and PostgreSQL)
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnector;

pub enum SqlxConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

impl Connector for SqlxConnector {
    type Connection = SqlxConnection;

    async fn open(&self, params: &DriverParams) -> Result<SqlxConnection> {
        debug!(driver = %params.driver, dsn = %params.redacted_dsn(), "Opening SQL connection");

        match params.driver {
            Driver::MySql => {
                let conn = MySqlConnectOptions::new()
                    .host(&params.host)
                    .port(params.port)
                    .username(&params.credentials.user)
                    .password(&params.credentials.pass)
                    .connect()
                    .await
                    .with_context(|| {
                        format!("Failed to connect to {}:{}", params.host, params.port)
                    })?;
                Ok(SqlxConnection::MySql(conn))
            }
            Driver::Postgres => {
                let conn = PgConnectOptions::new()
                    .host(&params.host)
                    .port(params.port)
                    .username(&params.credentials.user)
                    .password(&params.credentials.pass)
                    .connect()
                    .await
                    .with_context(|| {
                        format!("Failed to connect to {}:{}", params.host, params.port)
                    })?;
                Ok(SqlxConnection::Postgres(conn))
            }
            Driver::Oracle | Driver::SqlServer => Err(LifecycleError::ConnectionUnsupported {
                driver: params.driver.to_string(),
            }
            .into()),
        }
    }
}

/// Stream the rows of `$sql` on `$conn` into `$sink`; expanded once per backend.
macro_rules! stream_rows {
    ($conn:expr, $sql:expr, $sink:expr) => {{
        let mut streamed = 0u64;
        {
            let mut rows = sqlx::raw_sql($sql).fetch(&mut *$conn);
            while let Some(row) = rows.try_next().await? {
                if streamed == 0 {
                    $sink.columns(&column_names(&row));
                }
                $sink.row(&row_values(&row)?);
                streamed += 1;
            }
        }
        if streamed == 0 {
            let columns: Vec<String> = match (&mut *$conn).prepare($sql).await {
                Ok(stmt) => stmt.columns().iter().map(|c| c.name().to_string()).collect(),
                Err(_) => Vec::new(),
            };
            $sink.columns(&columns);
        }
        Ok(streamed)
    }};
}

impl SqlConnection for SqlxConnection {
    async fn query<S: RowSink + Send>(&mut self, sql: &str, sink: &mut S) -> Result<u64> {
        match self {
            SqlxConnection::MySql(conn) => stream_rows!(conn, sql, sink),
            SqlxConnection::Postgres(conn) => stream_rows!(conn, sql, sink),
        }
    }

    async fn close(self) -> Result<()> {
        match self {
            SqlxConnection::MySql(conn) => conn.close().await?,
            SqlxConnection::Postgres(conn) => conn.close().await?,
        }
        Ok(())
    }
}

fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Render every value as text, falling back to lossy UTF-8 for binary data.
fn row_values<R>(row: &R) -> Result<Vec<Option<String>>>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Option<String>: Decode<'r, <R as Row>::Database>,
    for<'r> Option<Vec<u8>>: Decode<'r, <R as Row>::Database>,
{
    let mut values = Vec::with_capacity(row.len());
    for i in 0..row.len() {
        let value = match row.try_get_unchecked::<Option<String>, _>(i) {
            Ok(v) => v,
            Err(_) => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(i)
                .with_context(|| format!("Failed to decode column {i}"))?
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        };
        values.push(value);
    }
    Ok(values)
}
