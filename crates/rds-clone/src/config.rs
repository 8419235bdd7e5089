//! Configuration loading
//!
//! Two TOML files drive a run: the tool configuration (`[rds]`, `[out]`,
//! `[wait]`) and a query file holding an ordered list of `[[query]]` tables.

use crate::orchestrator::{LifecycleConfig, SnapshotSource};
use crate::query::{DbCredentials, ExportConfig, Query};
use crate::wait::WaitConfig;
use directories::ProjectDirs;
use rds_clone_common::defaults::{
    default_instance_class, default_poll_interval_secs, default_region, default_wait_timeout_secs,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load {path}: {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to determine config directory")]
    ConfigDirError,

    #[error("Query file {path} contains no queries")]
    NoQueries { path: String },

    #[error("Query #{index} has an empty name")]
    EmptyQueryName { index: usize },

    #[error("Query name '{name}' contains a path separator")]
    InvalidQueryName { name: String },

    #[error("Query '{name}' has no SQL")]
    EmptySql { name: String },

    #[error("Query name '{name}' is used more than once")]
    DuplicateQueryName { name: String },

    #[error("Invalid wait settings: {0}")]
    InvalidWait(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// The `[rds]` section
#[derive(Debug, Clone, Deserialize)]
pub struct RdsSettings {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_instance_class")]
    pub instance_class: String,
    #[serde(default)]
    pub multi_az: bool,
    /// Login for the clone; the clone keeps the source's master credentials
    #[serde(flatten)]
    pub credentials: DbCredentials,
    /// Skips the STS lookup when set
    #[serde(default)]
    pub account_id: Option<String>,
}

impl Default for RdsSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            instance_class: default_instance_class(),
            multi_az: false,
            credentials: DbCredentials::default(),
            account_id: None,
        }
    }
}

/// The `[wait]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WaitSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl From<WaitSettings> for WaitConfig {
    fn from(settings: WaitSettings) -> Self {
        WaitConfig::from_secs(settings.interval_secs, settings.timeout_secs)
    }
}

/// Tool configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rds: RdsSettings,
    #[serde(default)]
    pub out: ExportConfig,
    #[serde(default)]
    pub wait: WaitSettings,
}

impl AppConfig {
    /// Load from the default location, or defaults if no file exists there
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config");
        let content = read(path)?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/rds-clone/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "rds-clone").ok_or(ConfigError::ConfigDirError)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.wait.interval_secs == 0 {
            return Err(ConfigError::InvalidWait("interval_secs must be positive".to_string()));
        }
        if self.wait.timeout_secs < self.wait.interval_secs {
            return Err(ConfigError::InvalidWait(format!(
                "timeout_secs ({}) is shorter than interval_secs ({})",
                self.wait.timeout_secs, self.wait.interval_secs
            )));
        }
        Ok(())
    }

    /// Lifecycle parameters for cloning `source`
    pub fn lifecycle_config(&self, source: &str, fresh_snapshot: bool) -> LifecycleConfig {
        LifecycleConfig {
            source: source.to_string(),
            instance_class: self.rds.instance_class.clone(),
            multi_az: self.rds.multi_az,
            snapshot: if fresh_snapshot {
                SnapshotSource::Fresh
            } else {
                SnapshotSource::Latest
            },
            wait: self.wait.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryFile {
    #[serde(default)]
    query: Vec<Query>,
}

/// Load an ordered query list.
///
/// Names must be non-empty and unique since they name the output files;
/// SQL must be non-empty.
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let content = read(path)?;
    let file: QueryFile = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
        path: path.display().to_string(),
        source,
    })?;

    if file.query.is_empty() {
        return Err(ConfigError::NoQueries {
            path: path.display().to_string(),
        });
    }
    validate_queries(&file.query)?;

    debug!(count = file.query.len(), "Loaded queries");
    Ok(file.query)
}

fn validate_queries(queries: &[Query]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, query) in queries.iter().enumerate() {
        if query.name.trim().is_empty() {
            return Err(ConfigError::EmptyQueryName { index: index + 1 });
        }
        // The name becomes a file name under the export directory
        if query.name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidQueryName {
                name: query.name.clone(),
            });
        }
        if query.sql.trim().is_empty() {
            return Err(ConfigError::EmptySql {
                name: query.name.clone(),
            });
        }
        if !seen.insert(query.name.as_str()) {
            return Err(ConfigError::DuplicateQueryName {
                name: query.name.clone(),
            });
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.display().to_string(),
        source,
    })
}
