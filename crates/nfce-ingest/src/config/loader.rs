use std::path::Path;

use crate::config::schema::{Config, RosterConfig};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.base_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "base_directory must not be empty".to_string(),
        });
    }
    if config.destination_root.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "destination_root must not be empty".to_string(),
        });
    }

    for (field, value) in [
        ("archive_prefix", &config.archive_prefix),
        ("document_prefix", &config.document_prefix),
        ("document_extension", &config.document_extension),
        ("error_bucket", &config.error_bucket),
    ] {
        validate_name_segment(field, value)?;
    }

    if config.document_extension.starts_with('.') {
        return Err(ConfigError::Validation {
            message: "document_extension must be given without the leading dot".to_string(),
        });
    }

    if config.watch.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "watch.poll_interval_secs must be greater than zero".to_string(),
        });
    }

    match &config.roster {
        Some(RosterConfig::Json { path }) | Some(RosterConfig::Sqlite { path, .. })
            if path.trim().is_empty() =>
        {
            return Err(ConfigError::Validation {
                message: "roster.path must not be empty".to_string(),
            });
        }
        _ => {}
    }

    Ok(())
}

fn validate_name_segment(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("{} must not be empty", field),
        });
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ConfigError::Validation {
            message: format!("{} must not contain path separators: {}", field, value),
        });
    }
    Ok(())
}
