//! Structured nginx directives and their textual form.
//!
//! Builders in `synthesis` decide *which* directives to emit; this module is
//! the only place that decides *how* they print.

use std::fmt;

/// Matches the opening `<head>` tag (any case) so a `<base>` tag can follow it.
pub const HEAD_TAG_REGEX: &str = r#"(<(?:H|h)(?:E|e)(?:A|a)(?:D|d)(?:[^">]|"[^"]*")*>)"#;

/// Named capture holding the path remainder after a rewritten location.
pub const BASEURI_CAPTURE: &str = "(?<baseuri>.*)";

/// Column at which tracing parameter values start.
const TRACING_PARAM_WIDTH: usize = 40;

/// Upstream protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Grpc,
    Grpcs,
}

impl Protocol {
    /// Pick the protocol for a location.
    pub fn select(grpc: bool, tls: bool) -> Self {
        match (grpc, tls) {
            (false, false) => Protocol::Http,
            (false, true) => Protocol::Https,
            (true, false) => Protocol::Grpc,
            (true, true) => Protocol::Grpcs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Grpc => "grpc",
            Protocol::Grpcs => "grpcs",
        }
    }
}

/// Request-rate unit of a `limit_req_zone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    PerSecond,
    PerMinute,
}

impl RateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateUnit::PerSecond => "r/s",
            RateUnit::PerMinute => "r/m",
        }
    }
}

/// One line of nginx configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `proxy_pass` or `grpc_pass` to an upstream.
    Pass { protocol: Protocol, upstream: String },

    /// `rewrite <pattern> <replacement> break;`
    Rewrite { pattern: String, replacement: String },

    /// `proxy_set_header <name> <value>;` with both parts already quoted as needed.
    ProxySetHeader { name: String, value: String },

    /// Injects `<base href>` after the `<head>` tag of HTML responses.
    BaseHref { scheme: String, path: String },

    LimitConnZone { key: String, zone: String, size_mb: i64 },
    LimitReqZone { key: String, zone: String, size_mb: i64, rate: i64, unit: RateUnit },
    LimitConn { zone: String, limit: i64 },
    LimitReq { zone: String, burst: i64 },
    LimitRateAfter { kb: i64 },
    LimitRate { kbps: i64 },

    /// `resolver <addr>... valid=30s[ ipv6=off];`
    Resolver { addresses: Vec<String>, ipv6_off: bool },

    /// `auth_request_set $authHeader<index> $upstream_http_<variable>;`
    AuthRequestSet { index: usize, variable: String },

    /// `hash <key> consistent;`
    ConsistentHash { key: String },

    /// A bare balancing algorithm such as `least_conn;`.
    Balancer { algorithm: String },

    LoadModule { path: String },

    /// A tracing parameter padded so values line up.
    TracingParam { name: &'static str, value: String },
}

impl Directive {
    /// Base proxy directive for a location.
    pub fn pass(grpc: bool, tls: bool, upstream: impl Into<String>) -> Self {
        Directive::Pass {
            protocol: Protocol::select(grpc, tls),
            upstream: upstream.into(),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Pass { protocol, upstream } => {
                let keyword = match protocol {
                    Protocol::Grpc | Protocol::Grpcs => "grpc_pass",
                    Protocol::Http | Protocol::Https => "proxy_pass",
                };
                write!(f, "{} {}://{};", keyword, protocol.as_str(), upstream)
            }
            Directive::Rewrite { pattern, replacement } => {
                write!(f, "rewrite {} {} break;", pattern, replacement)
            }
            Directive::ProxySetHeader { name, value } => {
                write!(f, "proxy_set_header {} {};", name, value)
            }
            Directive::BaseHref { scheme, path } => write!(
                f,
                r#"subs_filter '{}' '$1<base href="{}://$http_host{}">' ro;"#,
                HEAD_TAG_REGEX, scheme, path
            ),
            Directive::LimitConnZone { key, zone, size_mb } => {
                write!(f, "limit_conn_zone $limit_{} zone={}:{}m;", key, zone, size_mb)
            }
            Directive::LimitReqZone { key, zone, size_mb, rate, unit } => write!(
                f,
                "limit_req_zone $limit_{} zone={}:{}m rate={}{};",
                key,
                zone,
                size_mb,
                rate,
                unit.as_str()
            ),
            Directive::LimitConn { zone, limit } => write!(f, "limit_conn {} {};", zone, limit),
            Directive::LimitReq { zone, burst } => {
                write!(f, "limit_req zone={} burst={} nodelay;", zone, burst)
            }
            Directive::LimitRateAfter { kb } => write!(f, "limit_rate_after {}k;", kb),
            Directive::LimitRate { kbps } => write!(f, "limit_rate {}k;", kbps),
            Directive::Resolver { addresses, ipv6_off } => {
                f.write_str("resolver")?;
                for address in addresses {
                    write!(f, " {}", address)?;
                }
                f.write_str(" valid=30s")?;
                if *ipv6_off {
                    f.write_str(" ipv6=off")?;
                }
                f.write_str(";")
            }
            Directive::AuthRequestSet { index, variable } => write!(
                f,
                "auth_request_set $authHeader{} $upstream_http_{};",
                index, variable
            ),
            Directive::ConsistentHash { key } => write!(f, "hash {} consistent;", key),
            Directive::Balancer { algorithm } => write!(f, "{};", algorithm),
            Directive::LoadModule { path } => write!(f, "load_module {};", path),
            Directive::TracingParam { name, value } => {
                write!(f, "{:<width$}{};", name, value, width = TRACING_PARAM_WIDTH)
            }
        }
    }
}

/// Render directives as newline-terminated lines.
pub fn to_lines(directives: &[Directive]) -> String {
    directives.iter().map(|d| format!("{}\n", d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_keyword_follows_protocol() {
        assert_eq!(Directive::pass(false, false, "app").to_string(), "proxy_pass http://app;");
        assert_eq!(Directive::pass(false, true, "app").to_string(), "proxy_pass https://app;");
        assert_eq!(Directive::pass(true, false, "app").to_string(), "grpc_pass grpc://app;");
        assert_eq!(Directive::pass(true, true, "app").to_string(), "grpc_pass grpcs://app;");
    }

    #[test]
    fn test_tracing_param_alignment() {
        let line = Directive::TracingParam {
            name: "zipkin_collector_host",
            value: "zipkin.local".to_string(),
        }
        .to_string();
        assert_eq!(line, "zipkin_collector_host                   zipkin.local;");
        assert_eq!(line.find("zipkin.local"), Some(40));
    }

    #[test]
    fn test_resolver_tokens() {
        let line = Directive::Resolver {
            addresses: vec!["10.0.0.1".into(), "[::1]".into()],
            ipv6_off: false,
        };
        assert_eq!(line.to_string(), "resolver 10.0.0.1 [::1] valid=30s;");
    }

    #[test]
    fn test_to_lines_terminates_each_line() {
        let lines = to_lines(&[
            Directive::LimitRate { kbps: 100 },
            Directive::LimitRateAfter { kb: 10 },
        ]);
        assert_eq!(lines, "limit_rate 100k;\nlimit_rate_after 10k;\n");
    }
}
