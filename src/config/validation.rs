//! Snapshot validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce structural invariants the builders rely on (non-empty paths)
//! - Enforce unique backend names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Snapshot → Result<(), Vec<ValidationError>>
//! - Routing references are not checked: a location may name a backend
//!   that does not exist and still renders

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::Snapshot;

/// A single semantic problem in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server #{index} has an empty hostname")]
    EmptyHostname { index: usize },

    #[error("server '{server}' has a location with an empty path")]
    EmptyLocationPath { server: String },

    #[error("server '{server}' location '{path}' does not start with '/'")]
    RelativeLocationPath { server: String, path: String },

    #[error("backend '{name}' is declared more than once")]
    DuplicateBackend { name: String },
}

/// Check a snapshot, collecting every problem found.
pub fn validate_snapshot(snapshot: &Snapshot) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, server) in snapshot.servers.iter().enumerate() {
        if server.hostname.is_empty() {
            errors.push(ValidationError::EmptyHostname { index });
        }

        for location in &server.locations {
            if location.path.is_empty() {
                errors.push(ValidationError::EmptyLocationPath {
                    server: server.hostname.clone(),
                });
            } else if !location.path.starts_with('/') {
                errors.push(ValidationError::RelativeLocationPath {
                    server: server.hostname.clone(),
                    path: location.path.clone(),
                });
            }
        }
    }

    let mut seen = HashSet::new();
    for backend in &snapshot.backends {
        if !seen.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend {
                name: backend.name.clone(),
            });
        }
    }

    let tracing_cfg = &snapshot.global.tracing;
    if tracing_cfg.enabled && !tracing_cfg.zipkin.host.is_empty() && !tracing_cfg.jaeger.host.is_empty() {
        tracing::warn!(
            zipkin = %tracing_cfg.zipkin.host,
            jaeger = %tracing_cfg.jaeger.host,
            "Both tracing collectors configured; Zipkin takes precedence"
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
