//! Snapshot loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::Snapshot;
use crate::config::validation::{validate_snapshot, ValidationError};

/// Error type for snapshot loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate a snapshot from TOML text.
pub fn parse_snapshot(content: &str) -> Result<Snapshot, ConfigError> {
    let snapshot: Snapshot = toml::from_str(content)?;

    validate_snapshot(&snapshot).map_err(ConfigError::Validation)?;

    Ok(snapshot)
}

/// Load and validate a snapshot from a TOML file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, ConfigError> {
    let content = fs::read_to_string(path)?;
    let snapshot = parse_snapshot(&content)?;

    tracing::debug!(
        path = %path.display(),
        servers = snapshot.servers.len(),
        backends = snapshot.backends.len(),
        "Snapshot loaded"
    );
    Ok(snapshot)
}
