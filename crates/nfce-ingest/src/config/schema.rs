use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Root of the working tree (`incoming/`, `processing/`, `failed/`).
    pub base_directory: String,
    /// Externally provisioned tree with one directory per tenant.
    pub destination_root: String,
    #[serde(default = "default_archive_prefix")]
    pub archive_prefix: String,
    #[serde(default = "default_document_prefix")]
    pub document_prefix: String,
    #[serde(default = "default_document_extension")]
    pub document_extension: String,
    #[serde(default = "default_namespace")]
    pub document_namespace: String,
    #[serde(default = "default_error_bucket")]
    pub error_bucket: String,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub roster: Option<RosterConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_archive_prefix() -> String {
    "NFCE_XML".to_string()
}

fn default_document_prefix() -> String {
    "NFCE_".to_string()
}

fn default_document_extension() -> String {
    "xml".to_string()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_error_bucket() -> String {
    "ERRORS".to_string()
}

impl Config {
    /// Minimal config rooted at the given directories, all other fields defaulted.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(base_directory: P, destination_root: Q) -> Self {
        Self {
            version: "1.0".to_string(),
            base_directory: base_directory.as_ref().display().to_string(),
            destination_root: destination_root.as_ref().display().to_string(),
            archive_prefix: default_archive_prefix(),
            document_prefix: default_document_prefix(),
            document_extension: default_document_extension(),
            document_namespace: default_namespace(),
            error_bucket: default_error_bucket(),
            watch: WatchConfig::default(),
            roster: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::new(&self.base_directory)
    }

    pub fn destination_root(&self) -> PathBuf {
        PathBuf::from(&self.destination_root)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Grace period before a newly announced archive is opened.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_debounce() -> u64 {
    500
}

fn default_settle_delay() -> u64 {
    2000
}

fn default_heartbeat() -> u64 {
    3600
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            debounce_ms: default_debounce(),
            settle_delay_ms: default_settle_delay(),
            heartbeat_interval_secs: default_heartbeat(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RosterConfig {
    /// JSON array of `{ "alias": ..., "tax_id": ... }` objects.
    Json { path: String },
    /// SQLite registry; the query must return `(alias, tax_id)` rows.
    Sqlite {
        path: String,
        #[serde(default = "default_roster_query")]
        query: String,
    },
}

fn default_roster_query() -> String {
    "SELECT alias, tax_id FROM tenants WHERE active = 1 AND tax_id IS NOT NULL".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: LogFormat,
    /// Directory for the daily-rolling log file; console only when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            directory: None,
        }
    }
}

/// The three working areas under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub incoming: PathBuf,
    pub processing: PathBuf,
    pub failed: PathBuf,
}

impl WorkspaceLayout {
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        Self {
            incoming: base.join("incoming"),
            processing: base.join("processing"),
            failed: base.join("failed"),
        }
    }
}
