//! Upstream name resolution.
//!
//! # Responsibilities
//! - Find the backend a location references
//! - Decide whether the sticky upstream variant applies
//! - Emit the per-upstream balancing directive
//!
//! # Design Decisions
//! - A missing backend is not an error: the bare reference is used
//! - Sticky paths match exactly, never by prefix

use std::collections::BTreeMap;

use crate::directive::Directive;
use crate::model::{Backend, Location};

/// Prefix of the sticky variant of an upstream.
pub const STICKY_PREFIX: &str = "sticky-";

/// Upstream shared by every location when upstreams are dynamic.
pub const DYNAMIC_UPSTREAM: &str = "upstream_balancer";

const ROUND_ROBIN: &str = "round_robin";

/// Look up the backend a location routes to.
pub fn find_backend<'a>(backends: &'a [Backend], location: &Location) -> Option<&'a Backend> {
    backends.iter().find(|b| b.name == location.backend)
}

/// True when `hostname` lists the location's path as sticky.
pub fn sticky_active(
    hostname: &str,
    location: &Location,
    sticky_map: &BTreeMap<String, Vec<String>>,
) -> bool {
    sticky_map
        .get(hostname)
        .map(|paths| paths.iter().any(|p| *p == location.path))
        .unwrap_or(false)
}

/// Name of the upstream block a location proxies to.
pub fn upstream_name(hostname: &str, backends: &[Backend], location: &Location) -> String {
    match find_backend(backends, location) {
        Some(backend)
            if backend.session_affinity.is_cookie()
                && sticky_active(hostname, location, &backend.session_affinity.locations) =>
        {
            format!("{}{}", STICKY_PREFIX, location.backend)
        }
        _ => location.backend.clone(),
    }
}

/// Balancing directive for a backend's upstream block.
///
/// `None` means round robin, which nginx applies without a directive.
pub fn load_balancing_directive(backend: &Backend, fallback: &str) -> Option<Directive> {
    if !backend.upstream_hash_by.is_empty() {
        return Some(Directive::ConsistentHash {
            key: backend.upstream_hash_by.clone(),
        });
    }

    let algorithm = if backend.load_balancing.is_empty() {
        fallback
    } else {
        backend.load_balancing.as_str()
    };

    if algorithm.is_empty() || algorithm == ROUND_ROBIN {
        return None;
    }

    Some(Directive::Balancer {
        algorithm: algorithm.to_string(),
    })
}
