//! Classification: extracted documents -> canonical name.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::classifier::{DocumentClassifier, DocumentFacts};
use crate::job::{Classification, Job, JobStore, StateData};
use crate::storage;

use super::error::{FailureReason, StageError};

/// Date label used when no document carries an issuance date.
pub const SENTINEL_DATE: &str = "00000000";
/// Tenant label used when no document carries a tenant id.
pub const NO_TENANT: &str = "SEM_IE";
/// Prefix of canonical names that must go to the error bucket.
pub const ERROR_PREFIX: &str = "ERR_";

pub struct ClassificationStage {
    classifier: DocumentClassifier,
    document_prefix: String,
    document_extension: String,
}

impl ClassificationStage {
    pub fn new(classifier: DocumentClassifier, document_prefix: &str, document_extension: &str) -> Self {
        Self {
            classifier,
            document_prefix: document_prefix.to_string(),
            document_extension: document_extension.to_string(),
        }
    }

    /// Classifies the whole of `extracted/` and persists `RENAMING`.
    pub fn run(&self, store: &JobStore, job: &Job) -> Result<Classification, StageError> {
        let extracted = job.extracted_dir();
        if !extracted.is_dir() {
            return Err(FailureReason::ExtractedDirMissing.into());
        }

        store.write_state(job, StateData::Analyzing)?;

        let documents: Vec<_> = storage::files_with_extension(&extracted, &self.document_extension)?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&self.document_prefix))
                    .unwrap_or(false)
            })
            .collect();

        if documents.is_empty() {
            warn!(prefix = %self.document_prefix, "No matching documents to classify");
            return Err(FailureReason::NoMatchingDocuments.into());
        }

        let mut facts = Vec::with_capacity(documents.len());
        for path in &documents {
            match self.classifier.classify_file(path) {
                Ok(f) => {
                    debug!(
                        document = %path.display(),
                        tenant = f.tenant_id.as_deref().unwrap_or("-"),
                        "Classified"
                    );
                    facts.push(f);
                }
                Err(e) => warn!(document = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        let classification =
            aggregate(&facts).ok_or(StageError::Rejected(FailureReason::NoDataExtracted))?;

        store.write_state(
            job,
            StateData::Renaming {
                classification: classification.clone(),
            },
        )?;
        info!(
            canonical_name = %classification.canonical_name,
            documents = documents.len(),
            "Classification finished"
        );
        Ok(classification)
    }
}

/// Folds per-document facts into one classification. `None` when no
/// document contributed a tenant id or a date.
pub fn aggregate(facts: &[DocumentFacts]) -> Option<Classification> {
    if facts.iter().all(DocumentFacts::is_empty) {
        return None;
    }

    let dates: Vec<NaiveDate> = facts
        .iter()
        .filter_map(|f| f.issued_at.map(|dt| dt.date()))
        .collect();
    let tenants: BTreeSet<&str> = facts.iter().filter_map(|f| f.tenant_id.as_deref()).collect();

    let (date_start, date_end) = match (dates.iter().min(), dates.iter().max()) {
        (Some(min), Some(max)) => (
            min.format("%Y%m%d").to_string(),
            max.format("%Y%m%d").to_string(),
        ),
        _ => (SENTINEL_DATE.to_string(), SENTINEL_DATE.to_string()),
    };

    let tenant_ids: Vec<String> = tenants.into_iter().map(str::to_string).collect();
    let canonical_name = canonical_name(&date_start, &date_end, &tenant_ids);

    Some(Classification {
        canonical_name,
        date_start,
        date_end,
        tenant_ids,
    })
}

/// `<start>_<end>_<tenant>`, or `ERR_<start>_<end>_<id1>_<id2>...` for
/// more than one tenant.
pub fn canonical_name(date_start: &str, date_end: &str, tenant_ids: &[String]) -> String {
    match tenant_ids {
        [] => format!("{}_{}_{}", date_start, date_end, NO_TENANT),
        [only] => format!("{}_{}_{}", date_start, date_end, only),
        many => format!(
            "{}{}_{}_{}",
            ERROR_PREFIX,
            date_start,
            date_end,
            many.join("_")
        ),
    }
}
