//! CSV export of query results
//!
//! Each query gets an [`ExportSink`] that writes rows to disk as the
//! connection streams them. The file is created only once a non-empty
//! column list arrives.

use super::connection::RowSink;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rds_clone_common::defaults::{DEFAULT_EXPORT_DIR_NAME, default_true};
use rds_clone_common::tags::format_time_token;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix added to file names in byte-order-marker mode
pub const BOM_FILE_PREFIX: &str = "utf8-bom_";

/// Comment line written right after the byte-order marker
pub const BOM_COMMENT: &str = "# character encoding : utf-8 with BOM";

/// Rendering of SQL NULL in exported rows
pub const NULL_LITERAL: &str = "null";

const BOM: char = '\u{FEFF}';

type CsvWriter = csv::Writer<BufWriter<File>>;

/// The `[out]` section of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Write CSV files at all
    #[serde(default = "default_true")]
    pub file: bool,
    /// Output directory; defaults to `~/rds-clone`
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Prepend a byte-order marker and encoding comment
    #[serde(default)]
    pub bom: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file: true,
            root: None,
            bom: false,
        }
    }
}

/// Writes one CSV artifact per query
#[derive(Debug, Clone)]
pub struct ResultExporter {
    config: ExportConfig,
}

impl ResultExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.file
    }

    /// Destination directory: the configured root or `~/rds-clone`
    pub fn export_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.config.root {
            return Ok(root.clone());
        }
        let base = directories::BaseDirs::new().context("Could not determine home directory")?;
        Ok(base.home_dir().join(DEFAULT_EXPORT_DIR_NAME))
    }

    /// `<dir>/[utf8-bom_]<query name>-<yyyymmddHHMMSS>.csv`
    pub fn artifact_path(&self, query_name: &str, now: DateTime<Utc>) -> Result<PathBuf> {
        let mut file_name = format!("{}-{}.csv", query_name, format_time_token(now));
        if self.config.bom {
            file_name = format!("{BOM_FILE_PREFIX}{file_name}");
        }
        Ok(self.export_dir()?.join(file_name))
    }

    /// Start exporting the result of `query_name`, timestamped now.
    pub fn begin(&self, query_name: &str) -> ExportSink {
        self.begin_at(query_name, Utc::now())
    }

    pub fn begin_at(&self, query_name: &str, now: DateTime<Utc>) -> ExportSink {
        let state = if !self.enabled() {
            SinkState::Disabled
        } else {
            match self.artifact_path(query_name, now) {
                Ok(path) => SinkState::Pending(path),
                Err(e) => SinkState::Failed(e),
            }
        };
        ExportSink {
            query_name: query_name.to_string(),
            bom: self.config.bom,
            state,
            rows: 0,
        }
    }
}

enum SinkState {
    Disabled,
    Pending(PathBuf),
    Writing { path: PathBuf, writer: CsvWriter },
    Failed(anyhow::Error),
}

/// Streams one result set into a CSV file.
///
/// Write errors are held until [`ExportSink::finish`]; after one, further
/// rows are counted but dropped so the query itself can run to completion.
pub struct ExportSink {
    query_name: String,
    bom: bool,
    state: SinkState,
    rows: u64,
}

impl ExportSink {
    /// Flush the file and return its path, if one was written.
    ///
    /// Rows that reached the sink before a query failed stay in the file.
    pub fn finish(self) -> Result<Option<PathBuf>> {
        match self.state {
            SinkState::Disabled | SinkState::Pending(_) => Ok(None),
            SinkState::Failed(e) => Err(e),
            SinkState::Writing { path, mut writer } => {
                writer
                    .flush()
                    .with_context(|| format!("Failed to flush {}", path.display()))?;
                info!(
                    query = %self.query_name,
                    path = %path.display(),
                    rows = self.rows,
                    "Exported query result"
                );
                Ok(Some(path))
            }
        }
    }
}

impl RowSink for ExportSink {
    fn columns(&mut self, columns: &[String]) {
        let SinkState::Pending(path) = &self.state else {
            return;
        };
        if columns.is_empty() {
            self.state = SinkState::Disabled;
            return;
        }
        self.state = match open_csv(path, columns, self.bom) {
            Ok(writer) => SinkState::Writing {
                path: path.clone(),
                writer,
            },
            Err(e) => SinkState::Failed(e),
        };
    }

    fn row(&mut self, values: &[Option<String>]) {
        self.rows += 1;
        let SinkState::Writing { path, writer } = &mut self.state else {
            return;
        };
        let written = writer
            .write_record(values.iter().map(|v| v.as_deref().unwrap_or(NULL_LITERAL)))
            .with_context(|| format!("Failed to write row to {}", path.display()));
        if let Err(e) = written {
            self.state = SinkState::Failed(e);
        }
    }
}

/// Create (or truncate) `path` and write the optional BOM line and the header.
fn open_csv(path: &Path, columns: &[String], bom: bool) -> Result<CsvWriter> {
    debug!(path = %path.display(), bom, "Writing CSV");

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut out = BufWriter::new(file);
    if bom {
        writeln!(out, "{BOM}{BOM_COMMENT}")
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(columns)
        .with_context(|| format!("Failed to write header to {}", path.display()))?;
    Ok(writer)
}
