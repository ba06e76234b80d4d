//! Placement: canonical name -> destination directory, then copy and finalize.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::job::{Classification, Job, JobStore, StateData};
use crate::sanitize;
use crate::storage;

use super::classify::ERROR_PREFIX;
use super::error::{FailureReason, StageError};

/// Attempts at ` (n)` suffixes for names already present in the error bucket.
pub const MAX_BUCKET_SUFFIX: usize = 99;

pub struct PlacementStage {
    destination_root: PathBuf,
    error_bucket: String,
    document_extension: String,
}

impl PlacementStage {
    pub fn new(destination_root: impl Into<PathBuf>, error_bucket: &str, document_extension: &str) -> Self {
        Self {
            destination_root: destination_root.into(),
            error_bucket: error_bucket.to_string(),
            document_extension: document_extension.to_string(),
        }
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.destination_root.join(&self.error_bucket)
    }

    /// Copies the job's documents to their destination and finalizes the job.
    ///
    /// `recorded` is the destination of a previous `MOVING` record; when set it
    /// is reused as-is so one job never ends up in two places.
    pub fn run(
        &self,
        store: &JobStore,
        job: &Job,
        classification: &Classification,
        recorded: Option<&Path>,
    ) -> Result<PathBuf, StageError> {
        if classification.canonical_name.is_empty() {
            return Err(FailureReason::CanonicalNameMissing.into());
        }
        let extracted = job.extracted_dir();
        if !extracted.is_dir() {
            return Err(FailureReason::ExtractedDirMissing.into());
        }

        let destination = match recorded {
            Some(path) => {
                info!(destination = %path.display(), "Resuming placement at recorded destination");
                path.to_path_buf()
            }
            None => self.resolve(&classification.canonical_name)?,
        };
        if !sanitize::is_within(&self.destination_root, &destination) {
            warn!(destination = %destination.display(), "Destination escapes the destination root");
            return Err(FailureReason::DestinationOutsideRoot.into());
        }

        store.write_state(
            job,
            StateData::Moving {
                classification: classification.clone(),
                destination: destination.clone(),
            },
        )?;

        if destination.exists() {
            if recorded.is_some() {
                debug!(destination = %destination.display(), "Clearing partial copy");
            } else {
                warn!(destination = %destination.display(), "Destination exists, replacing it");
            }
            std::fs::remove_dir_all(&destination).map_err(|e| StorageError::Remove {
                path: destination.clone(),
                source: e,
            })?;
        }
        storage::ensure_directory(&destination)?;

        let documents = storage::files_with_extension(&extracted, &self.document_extension)?;
        for document in &documents {
            let Some(name) = document.file_name() else {
                continue;
            };
            storage::copy_file(document, &destination.join(name))?;
        }
        info!(
            destination = %destination.display(),
            documents = documents.len(),
            "Documents placed"
        );

        store.finalize(job)?;
        Ok(destination)
    }

    /// Chooses the destination for `canonical_name` without touching the
    /// filesystem beyond listing directories.
    pub fn resolve(&self, canonical_name: &str) -> Result<PathBuf, StageError> {
        if !sanitize::is_safe_path_segment(canonical_name) {
            return Err(FailureReason::InvalidCanonicalName(canonical_name.to_string()).into());
        }
        if canonical_name.starts_with(ERROR_PREFIX) {
            return self.bucket_destination(canonical_name);
        }

        let tenant_id = match canonical_name.rsplit_once('_') {
            Some((_, id)) if !id.is_empty() => id,
            _ => {
                return Err(FailureReason::InvalidCanonicalName(canonical_name.to_string()).into())
            }
        };

        match self.find_tenant_dir(tenant_id)? {
            Some(dir) => Ok(dir.join(canonical_name)),
            None => {
                warn!(tenant_id, "No tenant directory, routing to error bucket");
                self.bucket_destination(canonical_name)
            }
        }
    }

    /// First subdirectory (by name) of the destination root ending in
    /// `_<tenant_id>`. The error bucket never matches.
    pub fn find_tenant_dir(&self, tenant_id: &str) -> Result<Option<PathBuf>, StorageError> {
        let suffix = format!("_{}", tenant_id);
        Ok(storage::read_dir_sorted(&self.destination_root)?
            .into_iter()
            .filter(|p| p.is_dir())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n != self.error_bucket && n.ends_with(&suffix))
                    .unwrap_or(false)
            }))
    }

    fn bucket_destination(&self, canonical_name: &str) -> Result<PathBuf, StageError> {
        storage::unique_directory(&self.bucket_dir(), canonical_name, MAX_BUCKET_SUFFIX).map_err(
            |e| match e {
                StorageError::NameExhausted(_) => {
                    StageError::Rejected(FailureReason::ErrorBucketExhausted)
                }
                other => other.into(),
            },
        )
    }
}
