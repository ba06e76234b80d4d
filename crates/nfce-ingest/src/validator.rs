//! Archive acceptance by file name.
//!
//! Only `<prefix>*.zip` files become jobs. The prefix is case-sensitive and the
//! match is made on the file name alone, never on the directory.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use crate::error::ConfigError;

const ARCHIVE_SUFFIX: &str = ".zip";

#[derive(Debug, Clone)]
pub struct ArchiveValidator {
    prefix: String,
    pattern: Pattern,
}

impl ArchiveValidator {
    pub fn new(prefix: &str) -> Result<Self, ConfigError> {
        let raw = format!("{}*{}", Pattern::escape(prefix), ARCHIVE_SUFFIX);
        let pattern = Pattern::new(&raw).map_err(|e| ConfigError::InvalidPattern {
            pattern: raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `name` is an acceptable archive file name.
    pub fn accepts_name(&self, name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: true,
        };
        self.pattern.matches_with(name, options)
    }

    /// Returns true if the file name component of `path` is acceptable.
    pub fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| self.accepts_name(name))
            .unwrap_or(false)
    }
}
