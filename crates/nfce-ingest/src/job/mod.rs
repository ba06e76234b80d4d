pub mod state;
pub mod store;

use std::path::{Path, PathBuf};

pub use state::{Classification, JobState, StateData, StateRecord};
pub use store::JobStore;

/// File name of the persisted state record inside a job directory.
pub const STATE_FILE: &str = ".state";

/// Directory inside a job directory holding the extracted documents.
pub const EXTRACTED_DIR: &str = "extracted";

/// In-memory view of a job working directory under `processing/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub dir: PathBuf,
    /// Name of the archive copied into `dir` at creation.
    pub source_archive: Option<String>,
}

impl Job {
    /// Generates a fresh id: a random component plus the creation time, so
    /// ids never collide across restarts.
    pub fn generate_id() -> String {
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!("job_{}_{}", &random[..10], chrono::Utc::now().timestamp())
    }

    /// Rebuilds the view of an existing job directory.
    pub fn from_dir(dir: &Path, source_archive: Option<String>) -> Self {
        let id = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id,
            dir: dir.to_path_buf(),
            source_archive,
        }
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.dir.join(EXTRACTED_DIR)
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }
}
