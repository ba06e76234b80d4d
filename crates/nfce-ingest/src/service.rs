//! Startup sequence and main loop of the ingestion service.

use crossbeam_channel::unbounded;
use log::{info, warn};

use crate::config::Config;
use crate::error::IngestError;
use crate::pipeline::Pipeline;
use crate::provision::provision_destination;
use crate::recovery::{RecoveryManager, RecoveryReport};
use crate::roster::{roster_from_config, StaticRoster, TenantRoster};
use crate::validator::ArchiveValidator;
use crate::worker::{Ingestor, IntakeWatcher, ShutdownSignal};

pub struct Service {
    config: Config,
    pipeline: Pipeline,
    validator: ArchiveValidator,
    roster: Option<Box<dyn TenantRoster>>,
}

impl Service {
    /// Builds the service with the roster named in the config, if any.
    pub fn from_config(config: Config) -> Result<Self, IngestError> {
        let roster = config.roster.as_ref().map(roster_from_config);
        Self::new(config, roster)
    }

    pub fn new(config: Config, roster: Option<Box<dyn TenantRoster>>) -> Result<Self, IngestError> {
        let pipeline = Pipeline::from_config(&config)?;
        let validator = ArchiveValidator::new(&config.archive_prefix)?;
        Ok(Self {
            config,
            pipeline,
            validator,
            roster,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Creates the working directories, provisions the destination tree and
    /// recovers interrupted jobs. Any error here is fatal.
    pub fn prepare(&self) -> Result<RecoveryReport, IngestError> {
        self.pipeline.store().ensure_layout()?;

        let root = self.config.destination_root();
        let created = match &self.roster {
            Some(roster) => provision_destination(&root, &self.config.error_bucket, roster.as_ref())?,
            None => {
                warn!("No tenant roster configured, only the error bucket is provisioned");
                provision_destination(&root, &self.config.error_bucket, &StaticRoster::default())?
            }
        };
        info!("Destination ready ({} new tenant directories)", created);

        Ok(RecoveryManager::new(&self.pipeline).run()?)
    }

    /// Runs the service until `shutdown` is triggered.
    pub fn run(&self, shutdown: &ShutdownSignal) -> Result<(), IngestError> {
        let report = self.prepare()?;
        if report.total() > 0 {
            info!(
                "Recovered {} jobs ({} completed, {} failed)",
                report.total(),
                report.completed.len(),
                report.failed.len()
            );
        }

        let layout = self.config.layout();
        let watcher = IntakeWatcher::new(&layout.incoming, self.validator.clone());
        let ingestor = Ingestor::new(&self.pipeline, self.validator.clone(), &self.config.watch);

        // Watch before sweeping so nothing arriving during the sweep is missed
        let (sender, events) = unbounded();
        let _debouncer = watcher.watch(&self.config.watch, sender)?;

        let swept = ingestor.sweep(&watcher, shutdown)?;
        info!("Intake sweep processed {} archives", swept);

        ingestor.run_loop(&events, shutdown)?;
        info!("Service stopped");
        Ok(())
    }
}
