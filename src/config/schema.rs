//! Configuration schema definitions.
//!
//! This module defines the snapshot handed to the renderer and the
//! settings that steer a render. All types derive Serde traits for
//! deserialization from snapshot files.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::model::{Backend, Server};

/// Placeholder in [`DEFAULT_LOG_FORMAT_UPSTREAM`] for the client address.
pub const CLIENT_PLACEHOLDER: &str = "{client}";

/// Default `log_format upstreaminfo` body.
pub const DEFAULT_LOG_FORMAT_UPSTREAM: &str = concat!(
    "{client} - [$the_real_ip] - $remote_user [$time_local] \"$request\" ",
    "$status $body_bytes_sent \"$http_referer\" \"$http_user_agent\" ",
    "$request_length $request_time [$proxy_upstream_name] $upstream_addr ",
    "$upstream_response_length $upstream_response_time $upstream_status",
);

/// One complete routing model, rendered as a whole.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Snapshot {
    /// Cluster-wide settings.
    pub global: GlobalConfig,

    /// Virtual servers in render order.
    pub servers: Vec<Server>,

    /// Backend pools referenced by locations.
    pub backends: Vec<Backend>,

    /// Name servers for the `resolver` directive.
    pub resolvers: Vec<IpAddr>,
}

/// Cluster-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Distributed tracing module settings.
    pub tracing: TracingConfig,

    /// Drop IPv6 name servers and resolve IPv4 only.
    pub disable_ipv6: bool,

    /// Default balancing algorithm for backends that set none.
    pub load_balance: String,

    /// Body of `log_format upstreaminfo`.
    pub log_format_upstream: String,

    /// Header trusted to carry the original client address.
    pub forwarded_for_header: String,

    /// Retry non-idempotent requests on the next upstream.
    pub retry_non_idempotent: bool,

    /// Conditions passed to `proxy_next_upstream`.
    pub proxy_next_upstream: String,

    /// Default `client_body_buffer_size`. Ignored when malformed.
    pub client_body_buffer_size: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            tracing: TracingConfig::default(),
            disable_ipv6: false,
            load_balance: "round_robin".to_string(),
            log_format_upstream: DEFAULT_LOG_FORMAT_UPSTREAM.to_string(),
            forwarded_for_header: "X-Forwarded-For".to_string(),
            retry_non_idempotent: false,
            proxy_next_upstream: "error timeout".to_string(),
            client_body_buffer_size: "8k".to_string(),
        }
    }
}

impl GlobalConfig {
    /// The upstream log format with the client placeholder resolved.
    ///
    /// Only the built-in format carries the placeholder; custom formats are
    /// returned as configured.
    pub fn log_format_upstream(&self) -> String {
        if self.log_format_upstream == DEFAULT_LOG_FORMAT_UPSTREAM {
            return self
                .log_format_upstream
                .replace(CLIENT_PLACEHOLDER, "$the_real_ip");
        }
        self.log_format_upstream.clone()
    }
}

/// Tracing module configuration. At most one collector is used.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct TracingConfig {
    /// Load the opentracing module.
    pub enabled: bool,

    pub zipkin: ZipkinConfig,

    pub jaeger: JaegerConfig,
}

/// Zipkin collector settings. Active when `host` is set.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ZipkinConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
}

impl Default for ZipkinConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 9411,
            service_name: "nginx".to_string(),
        }
    }
}

/// Jaeger agent settings. Active when `host` is set and Zipkin is not.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct JaegerConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,

    /// Sampler type (`const`, `probabilistic`, `ratelimiting`, `remote`).
    pub sampler_type: String,

    pub sampler_param: String,
}

impl Default for JaegerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 6831,
            service_name: "nginx".to_string(),
            sampler_type: "const".to_string(),
            sampler_param: "1".to_string(),
        }
    }
}

/// Settings that steer one render, independent of the routing model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Route every location through the shared `upstream_balancer`.
    pub dynamic_upstreams: bool,

    /// Squeeze repeated blank lines out of the output.
    pub squeeze_blank_lines: bool,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            dynamic_upstreams: false,
            squeeze_blank_lines: true,
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
