//! Engine name to SQL driver mapping

use crate::aws::rds::Endpoint;
use crate::orchestrator::LifecycleError;
use serde::Deserialize;
use std::fmt;

/// SQL driver family derived from an RDS engine name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    MySql,
    Oracle,
    SqlServer,
    Postgres,
}

impl Driver {
    /// Match an engine name by substring, case-insensitively.
    ///
    /// `mysql-5.7` and `aurora-mysql` map to MySQL, `oracle-se1` to Oracle,
    /// `sqlserver-ex` to SQL Server and `postgres` to PostgreSQL.
    pub fn from_engine(engine: &str) -> Option<Self> {
        let engine = engine.to_lowercase();
        if engine.contains("mysql") {
            Some(Driver::MySql)
        } else if engine.contains("oracle") {
            Some(Driver::Oracle)
        } else if engine.contains("sqlserver") {
            Some(Driver::SqlServer)
        } else if engine.contains("postgres") {
            Some(Driver::Postgres)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Driver::MySql => "mysql",
            Driver::Oracle => "oracle",
            Driver::SqlServer => "sqlserver",
            Driver::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database login used for every clone connection
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbCredentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Everything needed to open a connection to a clone.
#[derive(Clone, PartialEq, Eq)]
pub struct DriverParams {
    pub driver: Driver,
    /// Driver-specific data source name; empty for Oracle and SQL Server
    pub dsn: String,
    pub host: String,
    pub port: u16,
    pub credentials: DbCredentials,
}

impl DriverParams {
    /// Derive the driver and data source name from an engine and endpoint.
    ///
    /// Fails with [`LifecycleError::DriverNotFound`] for unknown engines,
    /// before any connection is attempted.
    pub fn from_engine(
        engine: &str,
        endpoint: &Endpoint,
        credentials: &DbCredentials,
    ) -> Result<Self, LifecycleError> {
        let driver = Driver::from_engine(engine).ok_or_else(|| LifecycleError::DriverNotFound {
            engine: engine.to_string(),
        })?;

        let mut params = Self {
            driver,
            dsn: String::new(),
            host: endpoint.address.clone(),
            port: endpoint.port,
            credentials: credentials.clone(),
        };
        params.dsn = params.dsn_with_password(&credentials.pass);
        Ok(params)
    }

    /// DSN with the password masked, for logging
    pub fn redacted_dsn(&self) -> String {
        if self.credentials.pass.is_empty() {
            return self.dsn.clone();
        }
        self.dsn_with_password("****")
    }

    fn dsn_with_password(&self, password: &str) -> String {
        let (host, port, user) = (&self.host, self.port, &self.credentials.user);
        match self.driver {
            Driver::MySql => format!("{user}:{password}@tcp({host}:{port})/"),
            Driver::Postgres => format!("host={host} port={port} user={user} password={password}"),
            // No connection string format is defined for these yet
            Driver::Oracle | Driver::SqlServer => String::new(),
        }
    }
}

impl fmt::Debug for DriverParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverParams")
            .field("driver", &self.driver)
            .field("dsn", &self.redacted_dsn())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.credentials)
            .finish()
    }
}
