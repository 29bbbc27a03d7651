//! Backend pools.
//!
//! # Responsibilities
//! - Name a pool of service endpoints (the `upstream` block name)
//! - Carry TLS flags that decide the proxy protocol
//! - Carry session affinity and per-backend load balancing overrides

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Affinity type that enables sticky upstreams.
pub const COOKIE_AFFINITY: &str = "cookie";

/// A named pool of endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Backend {
    /// Unique backend identifier.
    pub name: String,

    /// Endpoints speak TLS.
    pub secure: bool,

    /// TLS is passed through untouched to the endpoints.
    pub ssl_passthrough: bool,

    pub session_affinity: SessionAffinity,

    /// Consistent-hash key (e.g. `$request_uri`). Wins over `load_balancing`.
    pub upstream_hash_by: String,

    /// Balancing algorithm. Empty falls back to the global default.
    pub load_balancing: String,

    pub endpoints: Vec<Endpoint>,
}

impl Backend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// True when upstream traffic is TLS.
    pub fn is_tls(&self) -> bool {
        self.secure || self.ssl_passthrough
    }
}

/// Session affinity settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SessionAffinity {
    /// Affinity type; only `cookie` is acted upon.
    pub affinity_type: String,

    /// Name of the sticky cookie.
    pub cookie_name: String,

    /// Hash function used for the cookie value (`md5`, `sha1`, `index`).
    pub cookie_hash: String,

    /// Host name → paths that use the sticky upstream.
    pub locations: BTreeMap<String, Vec<String>>,
}

impl SessionAffinity {
    pub fn is_cookie(&self) -> bool {
        self.affinity_type == COOKIE_AFFINITY
    }
}

/// One service endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Endpoint {
    /// IP address or host name.
    pub address: String,
    pub port: u16,
}
