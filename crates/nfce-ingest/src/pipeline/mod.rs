pub mod classify;
pub mod error;
pub mod extract;
pub mod place;
pub mod runner;

use std::fmt;

pub use classify::ClassificationStage;
pub use error::{FailureReason, StageError};
pub use extract::ExtractionStage;
pub use place::PlacementStage;
pub use runner::{Entry, JobOutcome, Pipeline};

/// The three stages a job passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Classify,
    Place,
}

impl Stage {
    /// Prefix of reason codes for unexpected errors during the stage.
    pub fn error_prefix(&self) -> &'static str {
        match self {
            Stage::Extract => "erro_extracao",
            Stage::Classify => "erro_analise",
            Stage::Place => "erro_mover",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Classify => "classify",
            Stage::Place => "place",
        };
        f.write_str(name)
    }
}
