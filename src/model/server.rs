//! Virtual servers and their locations.

use serde::{Deserialize, Serialize};

use crate::model::rate_limit::RateLimitPolicy;

/// The catch-all location path.
pub const CATCH_ALL: &str = "/";

/// A virtual host.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Server {
    /// Host name matched by `server_name`.
    pub hostname: String,

    /// Locations in declaration order.
    pub locations: Vec<Location>,
}

/// A routable path under a server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Location {
    /// Request path. Never empty; `/` is the catch-all.
    pub path: String,

    /// Name of the backend this location routes to.
    pub backend: String,

    pub rewrite: Rewrite,

    /// Send the matched prefix upstream in `X-Forwarded-Prefix`.
    pub x_forwarded_prefix: bool,

    /// Proxy with `grpc_pass` instead of `proxy_pass`.
    pub grpc: bool,

    pub external_auth: ExternalAuth,

    pub rate_limit: RateLimitPolicy,

    /// Set when the location is blocked; holds the reason.
    pub denied: Option<String>,

    /// Source CIDRs allowed to reach this location. Empty allows everyone.
    pub whitelist: Vec<String>,

    /// Overrides the global `client_body_buffer_size` when valid.
    pub client_body_buffer_size: String,

    /// Overrides the global `proxy_next_upstream` conditions when non-empty.
    pub next_upstream: String,
}

impl Location {
    /// Create a location routing `path` to `backend` with no policies.
    pub fn new(path: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            backend: backend.into(),
            ..Default::default()
        }
    }

    /// True when a rewrite target is set and differs from the path.
    pub fn rewrites(&self) -> bool {
        !self.rewrite.target.is_empty() && self.rewrite.target != self.path
    }
}

/// Path rewrite applied before proxying.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Rewrite {
    /// Replacement path. Empty disables the rewrite.
    pub target: String,

    /// Inject a `<base href>` tag into HTML responses.
    pub add_base_url: bool,

    /// Scheme for the injected base URL; the negotiated scheme when empty.
    pub base_url_scheme: String,
}

/// Delegated authentication through an `auth_request` subrequest.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ExternalAuth {
    /// Authentication service URL. Empty disables external auth.
    pub url: String,

    /// Where to send unauthenticated clients.
    pub signin_url: String,

    /// Auth response headers forwarded to the backend, in order.
    pub response_headers: Vec<String>,
}

impl ExternalAuth {
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }
}
