pub mod ingest;
pub mod scanner;
pub mod shutdown;

use std::path::PathBuf;

pub use ingest::Ingestor;
pub use scanner::IntakeWatcher;
pub use shutdown::ShutdownSignal;

// Re-export crossbeam_channel for use in main
pub use crossbeam_channel;

/// Message from the filesystem watcher to the intake loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    NewArchive { path: PathBuf },
}
