//! Query execution and CSV export

mod connection;
mod driver;
mod executor;
mod export;

pub use connection::{Connector, RowSink, SqlConnection, SqlxConnector};
pub use driver::{DbCredentials, Driver, DriverParams};
pub use executor::{BatchError, QueryExecutor, QueryTiming};
pub use export::{ExportConfig, ExportSink, ResultExporter};

use serde::Deserialize;

/// A named SQL statement; the name is used for the output file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Query {
    pub name: String,
    pub sql: String,
}
