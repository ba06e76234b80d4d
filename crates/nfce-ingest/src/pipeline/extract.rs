//! Extraction: archive copy in the job directory -> `extracted/`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::job::{Job, JobStore, StateData};
use crate::storage;
use crate::validator::ArchiveValidator;

use super::error::{FailureReason, StageError};

pub struct ExtractionStage {
    validator: ArchiveValidator,
    /// `.xml` style suffix matched against entry names.
    suffix: String,
}

impl ExtractionStage {
    pub fn new(validator: ArchiveValidator, document_extension: &str) -> Self {
        Self {
            validator,
            suffix: format!(".{}", document_extension),
        }
    }

    /// Extracts every document of the job's archive into `extracted/` and
    /// persists `EXTRACTED`. Safe to re-run: `extracted/` is emptied first.
    pub fn run(&self, store: &JobStore, job: &Job) -> Result<usize, StageError> {
        store.write_state(job, StateData::Extracting)?;

        let extracted = job.extracted_dir();
        storage::ensure_directory(&extracted)?;
        storage::clear_directory(&extracted)?;

        let archive = store
            .locate_archive(job)
            .ok_or(StageError::Rejected(FailureReason::ArchiveMissing))?;

        if !self.validator.accepts(&archive) {
            warn!(archive = %archive.display(), "Archive name not accepted");
            return Err(FailureReason::InvalidArchiveName.into());
        }

        let count = self.extract_documents(&archive, &extracted)?;
        if count == 0 {
            warn!("Archive contains no documents");
            return Err(FailureReason::NoDocuments.into());
        }

        store.write_state(
            job,
            StateData::Extracted {
                document_count: count,
            },
        )?;
        info!(documents = count, "Extraction finished");
        Ok(count)
    }

    fn extract_documents(&self, archive_path: &Path, target: &Path) -> Result<usize, StageError> {
        let file = File::open(archive_path).map_err(|e| StorageError::ReadFile {
            path: archive_path.to_path_buf(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            warn!(error = %e, "Archive could not be opened");
            FailureReason::CorruptArchive
        })?;

        let mut count = 0;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| {
                warn!(index, error = %e, "Unreadable archive entry");
                FailureReason::CorruptArchive
            })?;
            if entry.is_dir() {
                continue;
            }

            let raw_name = entry.name().to_string();
            let Some(name) = flattened_name(&raw_name) else {
                debug!(entry = %raw_name, "Skipping entry without a file name");
                continue;
            };
            if !name.ends_with(&self.suffix) {
                debug!(entry = %raw_name, "Skipping non-document entry");
                continue;
            }

            let mut content = Vec::new();
            entry.read_to_end(&mut content).map_err(|e| {
                warn!(entry = %raw_name, error = %e, "Archive entry failed to decompress");
                FailureReason::CorruptArchive
            })?;

            let destination = storage::resolve_conflict(target, name)?;
            std::fs::write(&destination, &content).map_err(|e| StorageError::WriteFile {
                path: destination.clone(),
                source: e,
            })?;
            debug!(entry = %raw_name, file = %destination.display(), "Extracted");
            count += 1;
        }

        Ok(count)
    }
}

/// Last path component of an archive entry name, accepting both separators.
fn flattened_name(raw: &str) -> Option<&str> {
    raw.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}
