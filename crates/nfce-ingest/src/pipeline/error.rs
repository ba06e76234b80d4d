use std::fmt;

use thiserror::Error;

use crate::error::{IngestError, StateError, StorageError};
use crate::sanitize;

use super::Stage;

/// Why a job was quarantined. [`FailureReason::code`] is what lands in the
/// `FAILED` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    InvalidArchiveName,
    CorruptArchive,
    NoDocuments,
    ArchiveMissing,
    NoMatchingDocuments,
    NoDataExtracted,
    ExtractedDirMissing,
    CanonicalNameMissing,
    InvalidCanonicalName(String),
    ErrorBucketExhausted,
    /// The resolved destination is not inside the destination root.
    DestinationOutsideRoot,
    NoValidState,
    UnknownState,
    /// Reason already recorded in a `FAILED` record.
    Recorded(String),
    /// Unexpected error while recovering a job.
    Recovery(String),
}

impl FailureReason {
    pub fn code(&self) -> String {
        match self {
            FailureReason::InvalidArchiveName => "formato_arquivo_invalido".to_string(),
            FailureReason::CorruptArchive => "zip_invalido".to_string(),
            FailureReason::NoDocuments => "nenhum_xml_encontrado".to_string(),
            FailureReason::ArchiveMissing => "arquivo_zip_original_ausente".to_string(),
            FailureReason::NoMatchingDocuments => "nenhum_xml_nfce_encontrado".to_string(),
            FailureReason::NoDataExtracted => "nenhum_dado_extraido".to_string(),
            FailureReason::ExtractedDirMissing => "diretorio_extracted_ausente".to_string(),
            FailureReason::CanonicalNameMissing => "nome_diretorio_ausente".to_string(),
            FailureReason::InvalidCanonicalName(name) => {
                format!("formato_invalido_nome_{}", name)
            }
            FailureReason::ErrorBucketExhausted => "destino_erros_esgotado".to_string(),
            FailureReason::DestinationOutsideRoot => "destino_fora_da_raiz".to_string(),
            FailureReason::NoValidState => "sem_estado_valido".to_string(),
            FailureReason::UnknownState => "estado_desconhecido".to_string(),
            FailureReason::Recorded(reason) => reason.clone(),
            FailureReason::Recovery(detail) => sanitize::reason_code("erro_recuperacao", detail),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[derive(Error, Debug)]
pub enum StageError {
    /// The job's input or recorded state cannot be processed.
    #[error("job rejected: {0}")]
    Rejected(FailureReason),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl From<FailureReason> for StageError {
    fn from(reason: FailureReason) -> Self {
        StageError::Rejected(reason)
    }
}

impl From<StorageError> for StageError {
    fn from(e: StorageError) -> Self {
        StageError::Ingest(e.into())
    }
}

impl From<StateError> for StageError {
    fn from(e: StateError) -> Self {
        StageError::Ingest(e.into())
    }
}

impl StageError {
    /// Reason code recorded when this error ends a job during `stage`.
    /// Environment errors embed the innermost error message.
    pub fn reason_code(&self, stage: Stage) -> String {
        match self {
            StageError::Rejected(reason) => reason.code(),
            StageError::Ingest(e) => sanitize::reason_code(stage.error_prefix(), &root_cause(e)),
        }
    }
}

/// Message of the deepest error in the `source()` chain.
pub fn root_cause(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
