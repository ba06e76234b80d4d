//! Test harness for isolated test execution.
//!
//! The `TestHarness` owns a temporary directory with a base working tree
//! (`base/incoming`, `base/processing`, `base/failed`) and a destination
//! tree (`dest/`), and builds pipelines and services over them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use nfce_ingest::config::Config;
use nfce_ingest::job::{Job, StateRecord, STATE_FILE};
use nfce_ingest::pipeline::Pipeline;
use nfce_ingest::recovery::{RecoveryManager, RecoveryReport};
use nfce_ingest::roster::{StaticRoster, TenantEntry};
use nfce_ingest::worker::Ingestor;
use nfce_ingest::{ArchiveValidator, JobOutcome, Service, StateData};

use super::builders::{ArchiveBuilder, ConfigBuilder};

pub struct TestHarness {
    temp_dir: TempDir,
    pub base_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub config: Config,
}

impl TestHarness {
    /// Harness with default config and tenants provisioned from `tenants`
    /// (`(alias, tax_id)` pairs).
    pub fn with_tenants(tenants: &[(&str, &str)]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_dir = temp_dir.path().join("base");
        let dest_dir = temp_dir.path().join("dest");
        let config = ConfigBuilder::new(&base_dir, &dest_dir).build();

        let harness = Self {
            temp_dir,
            base_dir,
            dest_dir,
            config,
        };
        harness
            .service(tenants)
            .prepare()
            .expect("Failed to prepare service");
        harness
    }

    pub fn new() -> Self {
        Self::with_tenants(&[])
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn incoming(&self) -> PathBuf {
        self.base_dir.join("incoming")
    }

    pub fn processing(&self) -> PathBuf {
        self.base_dir.join("processing")
    }

    pub fn failed(&self) -> PathBuf {
        self.base_dir.join("failed")
    }

    pub fn bucket(&self) -> PathBuf {
        self.dest_dir.join(&self.config.error_bucket)
    }

    pub fn service(&self, tenants: &[(&str, &str)]) -> Service {
        let roster = StaticRoster::new(
            tenants
                .iter()
                .map(|(alias, id)| TenantEntry::new(*alias, *id))
                .collect(),
        );
        Service::new(self.config.clone(), Some(Box::new(roster))).expect("Failed to build service")
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&self.config).expect("Failed to build pipeline")
    }

    /// Writes an archive into the intake directory.
    pub fn drop_archive(&self, name: &str, archive: ArchiveBuilder) -> PathBuf {
        let path = self.incoming().join(name);
        archive.write_to(&path);
        path
    }

    /// Ingests one archive from intake, as the watcher would.
    pub fn ingest(&self, path: &Path) -> Option<JobOutcome> {
        let pipeline = self.pipeline();
        let validator =
            ArchiveValidator::new(&self.config.archive_prefix).expect("Invalid archive prefix");
        let ingestor = Ingestor::new(&pipeline, validator, &self.config.watch);
        ingestor.ingest_archive(path)
    }

    pub fn recover(&self) -> RecoveryReport {
        let pipeline = self.pipeline();
        RecoveryManager::new(&pipeline)
            .run()
            .expect("Recovery failed")
    }

    /// Creates a job directory with the given record and extracted documents,
    /// bypassing the pipeline.
    pub fn job_with_state(&self, id: &str, data: StateData, documents: &[(&str, String)]) -> Job {
        let dir = self.processing().join(id);
        std::fs::create_dir_all(dir.join("extracted")).expect("Failed to create job dir");
        for (name, content) in documents {
            std::fs::write(dir.join("extracted").join(name), content).expect("Failed to write document");
        }
        let record = StateRecord::new(id, None, data);
        std::fs::write(
            dir.join(STATE_FILE),
            serde_json::to_vec_pretty(&record).expect("Failed to encode record"),
        )
        .expect("Failed to write record");
        Job::from_dir(&dir, None)
    }

    /// Immediate children of `dir`, by name.
    pub fn children(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Jobs still in `processing/`.
    pub fn pending_jobs(&self) -> Vec<String> {
        Self::children(&self.processing())
    }

    /// Reads the reason recorded in a quarantined job.
    pub fn failed_reason(&self, job_dir_name: &str) -> String {
        let path = self.failed().join(job_dir_name).join(STATE_FILE);
        let content = std::fs::read_to_string(&path).expect("Failed to read failed record");
        let record: StateRecord = serde_json::from_str(&content).expect("Invalid failed record");
        match record.data {
            StateData::Failed { reason, .. } => reason,
            other => panic!("Expected FAILED record, got {:?}", other),
        }
    }
}
