//! On-disk job representation: working directories and state records.
//!
//! The state record is always replaced as a whole (temp file, fsync, rename),
//! so after a crash it reflects the last fully persisted transition.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::config::WorkspaceLayout;
use crate::error::{IngestError, StateError, StorageError};
use crate::job::state::{JobState, StateData, StateRecord};
use crate::job::{Job, STATE_FILE};
use crate::storage;

pub struct JobStore {
    layout: WorkspaceLayout,
}

impl JobStore {
    pub fn new(layout: WorkspaceLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Creates `incoming/`, `processing/` and `failed/` if missing.
    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        for dir in [
            &self.layout.incoming,
            &self.layout.processing,
            &self.layout.failed,
        ] {
            storage::ensure_directory(dir)?;
            info!("Working directory ready: {}", dir.display());
        }
        Ok(())
    }

    /// Creates a job for `archive`: working directory, `extracted/`, a copy of
    /// the archive, and an `INIT` record.
    pub fn create(&self, archive: &Path) -> Result<Job, IngestError> {
        let archive_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidArchivePath(archive.to_path_buf()))?;

        let id = Job::generate_id();
        let job = Job {
            dir: self.layout.processing.join(&id),
            id,
            source_archive: Some(archive_name.clone()),
        };

        storage::ensure_directory(&job.extracted_dir())?;
        storage::copy_file(archive, &job.dir.join(&archive_name))?;
        self.write_state(&job, StateData::Init)?;

        info!("Created job {} for archive {}", job.id, archive_name);
        Ok(job)
    }

    /// Replaces the job's state record.
    pub fn write_state(&self, job: &Job, data: StateData) -> Result<StateRecord, StateError> {
        let record = StateRecord::new(&job.id, job.source_archive.as_deref(), data);
        let path = job.state_file();

        let write_err = |e: std::io::Error| StateError::Write {
            path: path.clone(),
            source: e,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&job.dir).map_err(write_err)?;
        serde_json::to_writer_pretty(&mut tmp, &record)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        info!("Job {} state -> {}", job.id, record.state());
        Ok(record)
    }

    /// Reads the state record of the job directory `job_dir`.
    pub fn read_state(&self, job_dir: &Path) -> Result<StateRecord, StateError> {
        let path = job_dir.join(STATE_FILE);
        if !path.is_file() {
            return Err(StateError::NotFound(job_dir.to_path_buf()));
        }

        let corrupt = |reason: String| StateError::Corrupt {
            path: path.clone(),
            reason,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| corrupt(e.to_string()))?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        let state = value
            .get("state")
            .and_then(|s| s.as_str())
            .ok_or_else(|| corrupt("missing 'state' field".to_string()))?;
        if JobState::from_name(state).is_none() {
            return Err(StateError::UnknownState {
                path: path.clone(),
                state: state.to_string(),
            });
        }

        serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))
    }

    /// Marks the job `FAILED` and moves its directory under `failed/`.
    ///
    /// Returns the quarantine location. When a directory with the job id
    /// already exists there, the destination gets a `_<unix seconds>` suffix.
    pub fn quarantine(
        &self,
        job: &Job,
        reason: &str,
        failed_during: Option<JobState>,
    ) -> Result<PathBuf, IngestError> {
        let mut destination = self.layout.failed.join(&job.id);
        if destination.exists() {
            destination = self
                .layout
                .failed
                .join(format!("{}_{}", job.id, chrono::Utc::now().timestamp()));
        }

        self.write_state(
            job,
            StateData::Failed {
                reason: reason.to_string(),
                failed_during,
            },
        )?;

        storage::ensure_directory(&self.layout.failed)?;
        storage::move_directory(&job.dir, &destination)?;

        warn!(
            "Job {} quarantined to {} (reason: {})",
            job.id,
            destination.display(),
            reason
        );
        Ok(destination)
    }

    /// Marks the job `COMPLETED` and removes its working directory.
    ///
    /// The state record is removed last, so an interrupted cleanup still
    /// leaves a `COMPLETED` record for recovery to finish. Deletion errors
    /// are logged and not retried.
    pub fn finalize(&self, job: &Job) -> Result<(), StateError> {
        self.write_state(job, StateData::Completed)?;

        match storage::read_dir_sorted(&job.dir) {
            Ok(entries) => {
                for entry in entries.iter().filter(|p| !p.ends_with(STATE_FILE)) {
                    let result = if entry.is_dir() {
                        std::fs::remove_dir_all(entry)
                    } else {
                        std::fs::remove_file(entry)
                    };
                    if let Err(e) = result {
                        error!("Failed to remove {}: {}", entry.display(), e);
                    }
                }
            }
            Err(e) => error!("Failed to list job {} for cleanup: {}", job.id, e),
        }

        match std::fs::remove_dir_all(&job.dir) {
            Ok(()) => info!("Job {} completed and removed", job.id),
            Err(e) => error!("Failed to remove job directory {}: {}", job.dir.display(), e),
        }
        Ok(())
    }

    /// Lists job directories under `processing/`, sorted by name.
    pub fn list_jobs(&self) -> Result<Vec<PathBuf>, StorageError> {
        let jobs: Vec<PathBuf> = storage::read_dir_sorted(&self.layout.processing)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect();
        debug!("Found {} job directories", jobs.len());
        Ok(jobs)
    }

    /// Locates the archive copy inside the job directory: the recorded
    /// name if present, otherwise the first `.zip` file.
    pub fn locate_archive(&self, job: &Job) -> Option<PathBuf> {
        if let Some(name) = &job.source_archive {
            let path = job.dir.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        storage::files_with_extension(&job.dir, "zip")
            .ok()
            .and_then(|files| files.into_iter().next())
    }
}
