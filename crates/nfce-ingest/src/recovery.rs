//! Startup recovery of jobs left in `processing/` by a previous run.
//!
//! Every job directory ends up either completed or quarantined; nothing is
//! left behind for a later pass unless quarantining itself fails.

use std::path::Path;

use tracing::{info, info_span, warn};

use crate::error::{StateError, StorageError};
use crate::job::{Job, JobState, StateData};
use crate::pipeline::{Entry, FailureReason, JobOutcome, Pipeline};
use crate::pipeline::error::root_cause;
use crate::sanitize;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub completed: Vec<String>,
    /// `(job id, reason code)`
    pub failed: Vec<(String, String)>,
}

impl RecoveryReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

pub struct RecoveryManager<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> RecoveryManager<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Recovers every job directory under `processing/`, one at a time.
    pub fn run(&self) -> Result<RecoveryReport, StorageError> {
        let jobs = self.pipeline.store().list_jobs()?;
        if jobs.is_empty() {
            info!("No interrupted jobs to recover");
            return Ok(RecoveryReport::default());
        }
        info!(jobs = jobs.len(), "Recovering interrupted jobs");

        let mut report = RecoveryReport::default();
        for dir in &jobs {
            let id = sanitize::redact_path(dir);
            match self.recover_job(dir) {
                JobOutcome::Completed { .. } | JobOutcome::Finalized => report.completed.push(id),
                JobOutcome::Failed { reason, .. } => report.failed.push((id, reason)),
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "Recovery finished"
        );
        Ok(report)
    }

    /// Drives one job directory to completion or quarantine, dispatching on
    /// its persisted state.
    pub fn recover_job(&self, dir: &Path) -> JobOutcome {
        let _span = info_span!("recover", job = %sanitize::redact_path(dir)).entered();

        let record = match self.pipeline.store().read_state(dir) {
            Ok(record) => record,
            Err(StateError::UnknownState { state, .. }) => {
                warn!(state = %state, "Unknown state in record");
                let job = Job::from_dir(dir, None);
                return self
                    .pipeline
                    .quarantine(&job, &FailureReason::UnknownState.code(), None);
            }
            Err(e) => {
                warn!(error = %e, "No valid state record");
                let job = Job::from_dir(dir, None);
                return self
                    .pipeline
                    .quarantine(&job, &FailureReason::NoValidState.code(), None);
            }
        };

        let job = Job::from_dir(dir, record.source_archive.clone());
        info!(state = %record.state(), "Resuming job");

        match record.data {
            StateData::Init | StateData::Extracting => self.pipeline.run(&job, Entry::Extract),
            StateData::Extracted { .. } | StateData::Analyzing => {
                self.pipeline.run(&job, Entry::Classify)
            }
            StateData::Renaming { classification } => self.pipeline.run(
                &job,
                Entry::Place {
                    classification,
                    destination: None,
                },
            ),
            StateData::Moving {
                classification,
                destination,
            } => self.pipeline.run(
                &job,
                Entry::Place {
                    classification,
                    destination: Some(destination),
                },
            ),
            StateData::Completed => match self.pipeline.store().finalize(&job) {
                Ok(()) => JobOutcome::Finalized,
                Err(e) => {
                    let reason = FailureReason::Recovery(root_cause(&e)).code();
                    self.pipeline.quarantine(&job, &reason, Some(JobState::Completed))
                }
            },
            StateData::Failed {
                reason,
                failed_during,
            } => self.pipeline.quarantine(&job, &reason, failed_during),
        }
    }
}
