//! The roster of active tenants, read once at startup to provision the
//! destination tree.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use thiserror::Error;

use crate::config::RosterConfig;
use crate::sanitize;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Failed to read roster file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse roster file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Roster database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid roster entry: {0}")]
    InvalidEntry(String),
}

/// One active tenant: its display alias and tax identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TenantEntry {
    pub alias: String,
    #[serde(deserialize_with = "string_or_number")]
    pub tax_id: String,
}

impl TenantEntry {
    pub fn new(alias: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            tax_id: tax_id.into(),
        }
    }

    /// Checks that alias and tax id are usable inside one directory name.
    pub fn validate(&self) -> Result<(), RosterError> {
        for (field, value) in [("alias", &self.alias), ("tax_id", &self.tax_id)] {
            if !sanitize::is_safe_path_segment(value) {
                return Err(RosterError::InvalidEntry(format!(
                    "{} {:?} is not a valid directory name component",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// `<alias>_<tax_id>`, the tenant's directory under the destination root.
    pub fn directory_name(&self) -> String {
        format!("{}_{}", self.alias, self.tax_id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

pub trait TenantRoster {
    fn active_tenants(&self) -> Result<Vec<TenantEntry>, RosterError>;
}

/// Fixed in-memory roster.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    entries: Vec<TenantEntry>,
}

impl StaticRoster {
    pub fn new(entries: Vec<TenantEntry>) -> Self {
        Self { entries }
    }
}

impl TenantRoster for StaticRoster {
    fn active_tenants(&self) -> Result<Vec<TenantEntry>, RosterError> {
        Ok(self.entries.clone())
    }
}

/// JSON array of `{ "alias": ..., "tax_id": ... }` objects.
#[derive(Debug, Clone)]
pub struct JsonFileRoster {
    path: PathBuf,
}

impl JsonFileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TenantRoster for JsonFileRoster {
    fn active_tenants(&self) -> Result<Vec<TenantEntry>, RosterError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| RosterError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| RosterError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Tenant registry in an SQLite database, opened read-only. The query must
/// return `(alias, tax_id)` rows; `tax_id` may be stored as text or integer.
#[derive(Debug, Clone)]
pub struct SqliteRoster {
    path: PathBuf,
    query: String,
}

impl SqliteRoster {
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    fn open(&self) -> Result<Connection, RosterError> {
        Ok(Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

impl TenantRoster for SqliteRoster {
    fn active_tenants(&self) -> Result<Vec<TenantEntry>, RosterError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&self.query)?;
        let rows = stmt.query_map([], |row| {
            let alias: String = row.get(0)?;
            let tax_id: Value = row.get(1)?;
            Ok((alias, tax_id))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (alias, tax_id) = row?;
            let tax_id = match tax_id {
                Value::Text(s) => s,
                Value::Integer(n) => n.to_string(),
                other => {
                    return Err(RosterError::InvalidEntry(format!(
                        "tax_id for '{}' has unsupported type {:?}",
                        alias, other
                    )))
                }
            };
            entries.push(TenantEntry { alias, tax_id });
        }
        Ok(entries)
    }
}

pub fn roster_from_config(config: &RosterConfig) -> Box<dyn TenantRoster> {
    match config {
        RosterConfig::Json { path } => Box::new(JsonFileRoster::new(Path::new(path))),
        RosterConfig::Sqlite { path, query } => Box::new(SqliteRoster::new(Path::new(path), query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_name() {
        assert_eq!(TenantEntry::new("ACME", "123").directory_name(), "ACME_123");
    }

    #[test]
    fn test_json_roster_accepts_numeric_tax_id() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("roster.json");
        std::fs::write(
            &path,
            r#"[{"alias": "ACME", "tax_id": "123"}, {"alias": "Beta", "tax_id": 456}]"#,
        )
        .unwrap();

        let entries = JsonFileRoster::new(&path).active_tenants().unwrap();
        assert_eq!(
            entries,
            vec![TenantEntry::new("ACME", "123"), TenantEntry::new("Beta", "456")]
        );
    }

    #[test]
    fn test_validate_rejects_path_components() {
        assert!(TenantEntry::new("ACME", "123").validate().is_ok());
        for (alias, tax_id) in [("a/b", "1"), ("..", "1"), ("ACME", "../x"), ("", "1"), ("ACME", "")] {
            assert!(
                matches!(
                    TenantEntry::new(alias, tax_id).validate(),
                    Err(RosterError::InvalidEntry(_))
                ),
                "{} {}",
                alias,
                tax_id
            );
        }
    }

    #[test]
    fn test_json_roster_missing_file() {
        let roster = JsonFileRoster::new("/nonexistent/roster.json");
        assert!(matches!(
            roster.active_tenants(),
            Err(RosterError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_sqlite_roster_filters_with_query() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("registry.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE tenants (alias TEXT, tax_id, active INTEGER);
                 INSERT INTO tenants VALUES ('ACME', '123', 1);
                 INSERT INTO tenants VALUES ('Beta', 456, 1);
                 INSERT INTO tenants VALUES ('Gone', '789', 0);
                 INSERT INTO tenants VALUES ('NoId', NULL, 1);",
            )
            .unwrap();
        }

        let roster = SqliteRoster::new(
            &path,
            "SELECT alias, tax_id FROM tenants WHERE active = 1 AND tax_id IS NOT NULL ORDER BY alias",
        );
        let entries = roster.active_tenants().unwrap();
        assert_eq!(
            entries,
            vec![TenantEntry::new("ACME", "123"), TenantEntry::new("Beta", "456")]
        );
    }

    #[test]
    fn test_sqlite_roster_missing_database() {
        let tmp = TempDir::new().unwrap();
        let roster = SqliteRoster::new(tmp.path().join("missing.db"), "SELECT 1, 2");
        assert!(matches!(roster.active_tenants(), Err(RosterError::Sqlite(_))));
    }
}
