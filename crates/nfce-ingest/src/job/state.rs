//! The persisted per-job state record.
//!
//! The record is a tagged union keyed by `"state"`, so each state carries
//! exactly the fields that exist at that point of the job's life.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Init,
    Extracting,
    Extracted,
    Analyzing,
    Renaming,
    Moving,
    Completed,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 8] = [
        JobState::Init,
        JobState::Extracting,
        JobState::Extracted,
        JobState::Analyzing,
        JobState::Renaming,
        JobState::Moving,
        JobState::Completed,
        JobState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Init => "INIT",
            JobState::Extracting => "EXTRACTING",
            JobState::Extracted => "EXTRACTED",
            JobState::Analyzing => "ANALYZING",
            JobState::Renaming => "RENAMING",
            JobState::Moving => "MOVING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        }
    }

    /// Human-readable description stored next to the machine state.
    pub fn description(&self) -> &'static str {
        match self {
            JobState::Init => "Job created, archive not yet opened",
            JobState::Extracting => "Extracting documents from archive",
            JobState::Extracted => "Documents extracted",
            JobState::Analyzing => "Analyzing documents",
            JobState::Renaming => "Canonical name computed, not yet placed",
            JobState::Moving => "Copying documents to destination",
            JobState::Completed => "Processing completed",
            JobState::Failed => "Processing failed",
        }
    }

    /// Parses a persisted state name. `RENAMED`, written by older
    /// deployments, reads as `RENAMING`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "RENAMED" {
            return Some(JobState::Renaming);
        }
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the classification stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub canonical_name: String,
    /// `YYYYMMDD`
    pub date_start: String,
    /// `YYYYMMDD`
    pub date_end: String,
    pub tenant_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateData {
    Init,
    Extracting,
    Extracted {
        document_count: usize,
    },
    Analyzing,
    #[serde(alias = "RENAMED")]
    Renaming {
        #[serde(default)]
        classification: Classification,
    },
    Moving {
        #[serde(default)]
        classification: Classification,
        destination: PathBuf,
    },
    Completed,
    Failed {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failed_during: Option<JobState>,
    },
}

impl StateData {
    pub fn state(&self) -> JobState {
        match self {
            StateData::Init => JobState::Init,
            StateData::Extracting => JobState::Extracting,
            StateData::Extracted { .. } => JobState::Extracted,
            StateData::Analyzing => JobState::Analyzing,
            StateData::Renaming { .. } => JobState::Renaming,
            StateData::Moving { .. } => JobState::Moving,
            StateData::Completed => JobState::Completed,
            StateData::Failed { .. } => JobState::Failed,
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            StateData::Renaming { classification } | StateData::Moving { classification, .. } => {
                Some(classification)
            }
            _ => None,
        }
    }
}

/// What is written to `<job_dir>/.state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_archive: Option<String>,
    #[serde(flatten)]
    pub data: StateData,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(job_id: &str, source_archive: Option<&str>, data: StateData) -> Self {
        Self {
            job_id: job_id.to_string(),
            source_archive: source_archive.map(str::to_string),
            description: data.state().description().to_string(),
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> JobState {
        self.data.state()
    }
}
