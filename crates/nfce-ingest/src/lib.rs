pub mod classifier;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod provision;
pub mod recovery;
pub mod roster;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod validator;
pub mod worker;

pub use classifier::{DocumentClassifier, DocumentFacts};
pub use config::{load_config, Config};
pub use error::{ConfigError, IngestError, Result, StateError, StorageError, WorkerError};
pub use job::{Job, JobState, JobStore, StateData, StateRecord};
pub use pipeline::{Entry, FailureReason, JobOutcome, Pipeline};
pub use recovery::{RecoveryManager, RecoveryReport};
pub use roster::{TenantEntry, TenantRoster};
pub use service::Service;
pub use validator::ArchiveValidator;
