use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::error::WorkerError;
use crate::pipeline::{Entry, JobOutcome, Pipeline};
use crate::validator::ArchiveValidator;

use super::scanner::IntakeWatcher;
use super::shutdown::ShutdownSignal;
use super::IntakeEvent;

/// Turns intake archives into jobs and runs them, one at a time.
pub struct Ingestor<'a> {
    pipeline: &'a Pipeline,
    validator: ArchiveValidator,
    settle_delay: Duration,
    heartbeat_interval: Duration,
}

impl<'a> Ingestor<'a> {
    pub fn new(pipeline: &'a Pipeline, validator: ArchiveValidator, watch: &WatchConfig) -> Self {
        Self {
            pipeline,
            validator,
            settle_delay: Duration::from_millis(watch.settle_delay_ms),
            heartbeat_interval: Duration::from_secs(watch.heartbeat_interval_secs),
        }
    }

    /// Ingests one archive from the intake directory.
    ///
    /// Returns `None` when the file is not a job (wrong name, empty, or gone).
    /// The original is deleted only after the job completes.
    pub fn ingest_archive(&self, path: &Path) -> Option<JobOutcome> {
        if !self.validator.accepts(path) {
            debug!("Ignoring {}", path.display());
            return None;
        }

        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => {
                warn!("Archive {} is empty, skipping", path.display());
                return None;
            }
            Err(e) => {
                warn!("Archive {} is not readable: {}", path.display(), e);
                return None;
            }
        }

        let job = match self.pipeline.store().create(path) {
            Ok(job) => job,
            Err(e) => {
                error!("Failed to create job for {}: {}", path.display(), e);
                return None;
            }
        };

        let outcome = self.pipeline.run(&job, Entry::Extract);
        match &outcome {
            JobOutcome::Failed { reason, .. } => {
                warn!(
                    "Archive {} failed ({}), original kept in intake",
                    path.display(),
                    reason
                );
            }
            _ => match std::fs::remove_file(path) {
                Ok(()) => info!("Removed original {} from intake", path.display()),
                Err(e) => error!("Failed to remove original {}: {}", path.display(), e),
            },
        }
        Some(outcome)
    }

    /// Ingests every archive already present in the intake directory.
    pub fn sweep(&self, watcher: &IntakeWatcher, shutdown: &ShutdownSignal) -> Result<usize, WorkerError> {
        let archives = watcher.scan()?;
        let mut processed = 0;
        for archive in &archives {
            if shutdown.is_triggered() {
                info!("Shutdown requested, stopping intake sweep");
                break;
            }
            if self.ingest_archive(archive).is_some() {
                processed += 1;
            }
        }
        Ok(processed)
    }

    /// Processes intake events until shutdown is requested or the channel
    /// closes. Logs a heartbeat after each idle interval.
    pub fn run_loop(&self, events: &Receiver<IntakeEvent>, shutdown: &ShutdownSignal) -> Result<(), WorkerError> {
        let mut last_activity = Instant::now();

        loop {
            if shutdown.is_triggered() {
                info!("Intake loop shutting down...");
                return Ok(());
            }

            match events.recv_timeout(Duration::from_millis(100)) {
                Ok(IntakeEvent::NewArchive { path }) => {
                    // Give the producer time to finish writing
                    if !self.settle_delay.is_zero() {
                        std::thread::sleep(self.settle_delay);
                    }
                    if path.exists() {
                        self.ingest_archive(&path);
                    } else {
                        debug!("Archive {} vanished before processing", path.display());
                    }
                    last_activity = Instant::now();
                }
                Err(RecvTimeoutError::Timeout) => {
                    if last_activity.elapsed() >= self.heartbeat_interval {
                        info!("Intake watcher alive, no new archives");
                        last_activity = Instant::now();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Intake channel disconnected");
                    return Err(WorkerError::ChannelClosed);
                }
            }
        }
    }
}
