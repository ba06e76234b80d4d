//! Extraction of the two routing facts from an NFC-e XML document.
//!
//! Only `emit/IE` (issuer state tax id, used as the tenant identifier) and
//! `ide/dhEmi` or, failing that, `ide/dEmi` (issuance timestamp) are read.
//! Elements outside the configured namespace are ignored.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;
use tracing::warn;

use crate::sanitize;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Failed to read document '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {0}")]
    Xml(String),
}

/// What a single document says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFacts {
    pub tenant_id: Option<String>,
    pub issued_at: Option<NaiveDateTime>,
}

impl DocumentFacts {
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_none() && self.issued_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentClassifier {
    namespace: String,
}

impl DocumentClassifier {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn classify_file(&self, path: &Path) -> Result<DocumentFacts, ClassifyError> {
        let content = std::fs::read(path).map_err(|e| ClassifyError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let xml = String::from_utf8_lossy(&content);
        self.classify_str(&xml)
    }

    pub fn classify_str(&self, xml: &str) -> Result<DocumentFacts, ClassifyError> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        // Local names of open elements; None for elements outside the namespace.
        let mut stack: Vec<Option<Vec<u8>>> = Vec::new();
        let mut tenant_id: Option<String> = None;
        let mut dh_emi: Option<String> = None;
        let mut d_emi: Option<String> = None;

        loop {
            match reader.read_resolved_event() {
                Ok((ns, Event::Start(e))) => {
                    let in_namespace = self.is_bound(&ns);
                    stack.push(in_namespace.then(|| e.local_name().as_ref().to_vec()));
                }
                Ok((_, Event::End(_))) => {
                    stack.pop();
                }
                Ok((_, Event::Text(e))) => {
                    let text = String::from_utf8_lossy(&e).trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    match current_pair(&stack) {
                        Some((b"emit", b"IE")) if tenant_id.is_none() => tenant_id = Some(text),
                        Some((b"ide", b"dhEmi")) if dh_emi.is_none() => dh_emi = Some(text),
                        Some((b"ide", b"dEmi")) if d_emi.is_none() => d_emi = Some(text),
                        _ => {}
                    }
                }
                Ok((_, Event::Eof)) => break,
                Err(e) => return Err(ClassifyError::Xml(e.to_string())),
                _ => {}
            }
        }

        // The tenant id becomes a directory name downstream
        let tenant_id = tenant_id.filter(|id| {
            let safe = sanitize::is_safe_path_segment(id);
            if !safe {
                warn!(tenant_id = %id.escape_debug(), "Ignoring tenant id unusable as a directory name");
            }
            safe
        });

        let issued_at = dh_emi
            .as_deref()
            .and_then(parse_issue_timestamp)
            .or_else(|| d_emi.as_deref().and_then(parse_issue_timestamp));

        Ok(DocumentFacts {
            tenant_id,
            issued_at,
        })
    }

    fn is_bound(&self, ns: &ResolveResult<'_>) -> bool {
        match ns {
            ResolveResult::Bound(namespace) => namespace.0 == self.namespace.as_bytes(),
            _ => false,
        }
    }
}

/// (parent, element) local names at the top of the stack, both in the namespace.
fn current_pair(stack: &[Option<Vec<u8>>]) -> Option<(&[u8], &[u8])> {
    let [.., Some(parent), Some(element)] = stack else {
        return None;
    };
    Some((parent.as_slice(), element.as_slice()))
}

/// Parses `dhEmi` (ISO-8601 date-time, offset optional) or `dEmi` (plain date).
///
/// Offsets are dropped after parsing: the issuer's wall-clock date is what
/// names the output directory.
pub fn parse_issue_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
