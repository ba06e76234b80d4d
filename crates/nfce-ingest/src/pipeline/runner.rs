use std::path::PathBuf;

use tracing::{error, info, info_span};

use crate::classifier::DocumentClassifier;
use crate::config::Config;
use crate::error::ConfigError;
use crate::job::{Classification, Job, JobState, JobStore};
use crate::validator::ArchiveValidator;

use super::classify::ClassificationStage;
use super::error::StageError;
use super::extract::ExtractionStage;
use super::place::PlacementStage;
use super::Stage;

/// Where a job (re-)enters the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Extract,
    Classify,
    /// Placement with the classification already computed, and the
    /// destination if one was recorded by an interrupted `MOVING` step.
    Place {
        classification: Classification,
        destination: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed {
        destination: PathBuf,
    },
    /// A job already `COMPLETED` before a restart whose cleanup was finished.
    Finalized,
    Failed {
        reason: String,
        /// `None` when the job directory could not be moved to `failed/`.
        quarantined: Option<PathBuf>,
    },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. } | JobOutcome::Finalized)
    }
}

pub struct Pipeline {
    store: JobStore,
    extraction: ExtractionStage,
    classification: ClassificationStage,
    placement: PlacementStage,
}

impl Pipeline {
    /// Production constructor, builds all stages from config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let validator = ArchiveValidator::new(&config.archive_prefix)?;
        let classifier = DocumentClassifier::new(config.document_namespace.clone());

        Ok(Self {
            store: JobStore::new(config.layout()),
            extraction: ExtractionStage::new(validator, &config.document_extension),
            classification: ClassificationStage::new(
                classifier,
                &config.document_prefix,
                &config.document_extension,
            ),
            placement: PlacementStage::new(
                config.destination_root(),
                &config.error_bucket,
                &config.document_extension,
            ),
        })
    }

    pub fn new(
        store: JobStore,
        extraction: ExtractionStage,
        classification: ClassificationStage,
        placement: PlacementStage,
    ) -> Self {
        Self {
            store,
            extraction,
            classification,
            placement,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn placement(&self) -> &PlacementStage {
        &self.placement
    }

    /// Drives `job` from `entry` to completion or quarantine.
    pub fn run(&self, job: &Job, entry: Entry) -> JobOutcome {
        let _job_span = info_span!("job",
            job_id = %job.id,
            archive = job.source_archive.as_deref().unwrap_or("unknown"),
        )
        .entered();

        match self.drive(job, entry) {
            Ok(destination) => {
                info!(destination = %destination.display(), "Job completed");
                JobOutcome::Completed { destination }
            }
            Err((stage, e)) => {
                let reason = e.reason_code(stage);
                error!(stage = %stage, error = %e, reason = %reason, "Job failed");
                let failed_during = self.store.read_state(&job.dir).ok().map(|r| r.state());
                self.quarantine(job, &reason, failed_during)
            }
        }
    }

    /// Quarantines `job` with `reason`. A failure to quarantine is logged
    /// and leaves the job in `processing/` for the next recovery pass.
    pub fn quarantine(&self, job: &Job, reason: &str, failed_during: Option<JobState>) -> JobOutcome {
        let quarantined = match self.store.quarantine(job, reason, failed_during) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to quarantine job");
                None
            }
        };
        JobOutcome::Failed {
            reason: reason.to_string(),
            quarantined,
        }
    }

    fn drive(&self, job: &Job, entry: Entry) -> Result<PathBuf, (Stage, StageError)> {
        let (classification, recorded) = match entry {
            Entry::Extract => {
                step(Stage::Extract, || self.extraction.run(&self.store, job))?;
                let classification =
                    step(Stage::Classify, || self.classification.run(&self.store, job))?;
                (classification, None)
            }
            Entry::Classify => {
                let classification =
                    step(Stage::Classify, || self.classification.run(&self.store, job))?;
                (classification, None)
            }
            Entry::Place {
                classification,
                destination,
            } => (classification, destination),
        };

        step(Stage::Place, || {
            self.placement
                .run(&self.store, job, &classification, recorded.as_deref())
        })
    }
}

fn step<T>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, StageError>,
) -> Result<T, (Stage, StageError)> {
    let _step = info_span!("stage", stage = %stage).entered();
    f().map_err(|e| (stage, e))
}
