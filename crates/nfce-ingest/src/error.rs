use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("State record error: {0}")]
    State(#[from] StateError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Tenant roster error: {0}")]
    Roster(#[from] crate::roster::RosterError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid archive pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("No config file given (pass a path or set {0})")]
    Missing(&'static str),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move '{from}' to '{to}': {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not an archive file path: '{0}'")]
    InvalidArchivePath(PathBuf),

    #[error("No free name for '{0}'")]
    NameExhausted(PathBuf),
}

/// Failures reading or writing a job's `.state` record.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("No state record in '{0}'")]
    NotFound(PathBuf),

    #[error("Unreadable state record '{path}': {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Unknown state '{state}' in '{path}'")]
    UnknownState { path: PathBuf, state: String },

    #[error("Failed to persist state record '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode state record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Scan error: {0}")]
    ScanError(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, IngestError>;
