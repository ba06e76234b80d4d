use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{
    new_debouncer_opt, Config as DebouncerConfig, DebounceEventResult, DebouncedEventKind,
    Debouncer,
};
use walkdir::WalkDir;

use crate::config::WatchConfig;
use crate::error::WorkerError;
use crate::validator::ArchiveValidator;

use super::IntakeEvent;

/// Finds acceptable archives in the intake directory, once (`scan`) or
/// continuously (`watch`).
pub struct IntakeWatcher {
    intake_directory: PathBuf,
    validator: ArchiveValidator,
}

impl IntakeWatcher {
    pub fn new<P: AsRef<Path>>(intake_directory: P, validator: ArchiveValidator) -> Self {
        Self {
            intake_directory: intake_directory.as_ref().to_path_buf(),
            validator,
        }
    }

    pub fn intake_directory(&self) -> &Path {
        &self.intake_directory
    }

    /// Archives currently in the intake directory, sorted by name.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let mut archives = Vec::new();

        for entry in WalkDir::new(&self.intake_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| WorkerError::ScanError(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            if self.validator.accepts(path) {
                debug!("Found archive: {}", path.display());
                archives.push(path.to_path_buf());
            } else {
                debug!("Ignoring {}", path.display());
            }
        }

        info!(
            "Scanned {} archives in {}",
            archives.len(),
            self.intake_directory.display()
        );
        Ok(archives)
    }

    /// Starts a polling watch on the intake directory and forwards every
    /// acceptable archive as [`IntakeEvent::NewArchive`].
    ///
    /// Watching stops when the returned debouncer is dropped.
    pub fn watch(
        &self,
        config: &WatchConfig,
        sender: Sender<IntakeEvent>,
    ) -> Result<Debouncer<PollWatcher>, WorkerError> {
        // PollWatcher works on network shares where inotify does not
        let poll_config =
            NotifyConfig::default().with_poll_interval(Duration::from_secs(config.poll_interval_secs));

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(config.debounce_ms))
            .with_notify_config(poll_config);

        let validator = self.validator.clone();
        let handler = move |result: DebounceEventResult| match result {
            Ok(events) => {
                for event in events {
                    if !matches!(event.kind, DebouncedEventKind::Any) {
                        continue;
                    }
                    let path = event.path;
                    if !path.is_file() || !validator.accepts(&path) {
                        continue;
                    }
                    info!("New archive detected: {}", path.display());
                    if sender.send(IntakeEvent::NewArchive { path }).is_err() {
                        error!("Intake channel closed, dropping event");
                    }
                }
            }
            Err(e) => warn!("Watch error: {:?}", e),
        };

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, handler)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&self.intake_directory, RecursiveMode::NonRecursive)
            .map_err(|e| WorkerError::WatchError(e.to_string()))?;

        info!("Watching directory: {}", self.intake_directory.display());
        Ok(debouncer)
    }
}
