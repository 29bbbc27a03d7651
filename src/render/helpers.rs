//! Name-based helper dispatch for template engines.
//!
//! Template engines call helpers by name with loosely typed arguments. This
//! is the only place where argument shapes are checked at runtime: a helper
//! receiving the wrong shape logs an error and returns its safe default, so
//! one bad value never aborts a render.

use std::net::IpAddr;

use thiserror::Error;

use crate::config::GlobalConfig;
use crate::directive::Directive;
use crate::model::{Backend, Location, RateLimitPolicy, Server};
use crate::observability::metrics;
use crate::synthesis::auth::{auth_location, auth_response_headers, sign_auth_url};
use crate::synthesis::location::{location_selector, proxy_target};
use crate::synthesis::opentracing::{module_load_directives, param_directives};
use crate::synthesis::rate_limit::{active_policies, limit_directives, zone_directives};
use crate::synthesis::resolver::{format_address, resolver_directive};
use crate::synthesis::upstream::{load_balancing_directive, upstream_name};
use crate::synthesis::validators::{
    contains_grpc, forwarded_for_variable, is_valid_buffer_size, location_allowed,
    location_in_list, next_upstream_codes,
};
use crate::synthesis::DenySlugCache;

/// Every helper name [`Helpers::invoke`] understands.
pub const HELPER_NAMES: &[&str] = &[
    "empty",
    "location_selector",
    "auth_location",
    "auth_response_headers",
    "load_balancing",
    "proxy_target",
    "rate_limit_policies",
    "rate_limit_zones",
    "rate_limits",
    "resolvers",
    "upstream_name",
    "location_in_list",
    "location_allowed",
    "contains_grpc",
    "log_format_upstream",
    "deny_variable",
    "getenv",
    "contains",
    "has_prefix",
    "has_suffix",
    "to_upper",
    "to_lower",
    "format_ip",
    "next_upstream",
    "valid_buffer_size",
    "forwarded_for",
    "sign_auth_url",
    "tracing_modules",
    "tracing_params",
];

/// A helper argument.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Str(&'a str),
    Bool(bool),
    Location(&'a Location),
    Server(&'a Server),
    Servers(&'a [Server]),
    Backend(&'a Backend),
    Backends(&'a [Backend]),
    Addresses(&'a [IpAddr]),
    Global(&'a GlobalConfig),
}

impl Arg<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Str(_) => "string",
            Arg::Bool(_) => "bool",
            Arg::Location(_) => "location",
            Arg::Server(_) => "server",
            Arg::Servers(_) => "server list",
            Arg::Backend(_) => "backend",
            Arg::Backends(_) => "backend list",
            Arg::Addresses(_) => "address list",
            Arg::Global(_) => "global config",
        }
    }
}

/// A helper result.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Lines(Vec<String>),
    Flag(bool),
    Policies(Vec<RateLimitPolicy>),
}

impl Output {
    /// Text form for direct interpolation into a template.
    pub fn into_text(self) -> String {
        match self {
            Output::Text(text) => text,
            Output::Lines(lines) => lines.join("\n"),
            Output::Flag(flag) => flag.to_string(),
            Output::Policies(policies) => policies
                .into_iter()
                .map(|p| p.id)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Errors a helper call can raise.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HelperError {
    #[error("unknown helper '{0}'")]
    UnknownHelper(String),
}

/// Dispatches helper calls to the typed builders.
#[derive(Debug, Clone, Default)]
pub struct Helpers {
    slugs: DenySlugCache,
    dynamic_upstreams: bool,
}

/// Pull argument `index` out with `pick`, logging a mismatch when it has another shape.
fn arg<'a, T>(
    helper: &str,
    args: &[Arg<'a>],
    index: usize,
    expected: &'static str,
    pick: impl Fn(&Arg<'a>) -> Option<T>,
) -> Option<T> {
    let found = args.get(index);
    let value = found.and_then(&pick);
    if value.is_none() {
        tracing::error!(
            helper,
            expected,
            found = found.map(Arg::kind).unwrap_or("nothing"),
            "Unexpected helper argument type"
        );
        metrics::record_type_mismatch(helper);
    }
    value
}

fn as_str<'a>(a: &Arg<'a>) -> Option<&'a str> {
    match *a {
        Arg::Str(s) => Some(s),
        _ => None,
    }
}

fn as_bool(a: &Arg<'_>) -> Option<bool> {
    match *a {
        Arg::Bool(b) => Some(b),
        _ => None,
    }
}

fn as_location<'a>(a: &Arg<'a>) -> Option<&'a Location> {
    match *a {
        Arg::Location(l) => Some(l),
        _ => None,
    }
}

fn as_server<'a>(a: &Arg<'a>) -> Option<&'a Server> {
    match *a {
        Arg::Server(s) => Some(s),
        _ => None,
    }
}

fn as_servers<'a>(a: &Arg<'a>) -> Option<&'a [Server]> {
    match *a {
        Arg::Servers(s) => Some(s),
        _ => None,
    }
}

fn as_backend<'a>(a: &Arg<'a>) -> Option<&'a Backend> {
    match *a {
        Arg::Backend(b) => Some(b),
        _ => None,
    }
}

fn as_backends<'a>(a: &Arg<'a>) -> Option<&'a [Backend]> {
    match *a {
        Arg::Backends(b) => Some(b),
        _ => None,
    }
}

fn as_addresses<'a>(a: &Arg<'a>) -> Option<&'a [IpAddr]> {
    match *a {
        Arg::Addresses(a) => Some(a),
        _ => None,
    }
}

fn as_global<'a>(a: &Arg<'a>) -> Option<&'a GlobalConfig> {
    match *a {
        Arg::Global(g) => Some(g),
        _ => None,
    }
}

/// Apply a two-string predicate.
fn str_pair(name: &str, args: &[Arg<'_>], f: fn(&str, &str) -> bool) -> Output {
    let haystack = arg(name, args, 0, "string", as_str);
    let needle = arg(name, args, 1, "string", as_str);
    Output::Flag(matches!((haystack, needle), (Some(h), Some(n)) if f(h, n)))
}

fn lines(directives: Vec<Directive>) -> Vec<String> {
    directives.iter().map(ToString::to_string).collect()
}

impl Helpers {
    pub fn new(slugs: DenySlugCache, dynamic_upstreams: bool) -> Self {
        Self {
            slugs,
            dynamic_upstreams,
        }
    }

    /// Call helper `name` with `args`.
    pub fn invoke(&self, name: &str, args: &[Arg<'_>]) -> Result<Output, HelperError> {
        let text = |value: Option<String>| Output::Text(value.unwrap_or_default());
        let flag = |value: Option<bool>| Output::Flag(value.unwrap_or(false));

        let output = match name {
            "empty" => Output::Flag(match args.first() {
                Some(Arg::Str(s)) => s.is_empty(),
                _ => true,
            }),
            "location_selector" => Output::Text(
                arg(name, args, 0, "location", as_location)
                    .map(location_selector)
                    .unwrap_or_else(|| "/".to_string()),
            ),
            "auth_location" => text(arg(name, args, 0, "location", as_location).map(auth_location)),
            "auth_response_headers" => Output::Lines(
                arg(name, args, 0, "location", as_location)
                    .map(|l| lines(auth_response_headers(l)))
                    .unwrap_or_default(),
            ),
            "load_balancing" => {
                let backend = arg(name, args, 0, "backend", as_backend);
                let fallback = arg(name, args, 1, "string", as_str);
                text(backend.zip(fallback).map(|(b, f)| {
                    load_balancing_directive(b, f)
                        .map(|d| d.to_string())
                        .unwrap_or_default()
                }))
            }
            "proxy_target" => {
                let host = arg(name, args, 0, "string", as_str);
                let backends = arg(name, args, 1, "backend list", as_backends);
                let location = arg(name, args, 2, "location", as_location);
                match (host, backends, location) {
                    (Some(h), Some(b), Some(l)) => {
                        Output::Lines(lines(proxy_target(h, b, l, self.dynamic_upstreams)))
                    }
                    _ => Output::Lines(Vec::new()),
                }
            }
            "rate_limit_policies" => Output::Policies(
                arg(name, args, 0, "server list", as_servers)
                    .map(active_policies)
                    .unwrap_or_default(),
            ),
            "rate_limit_zones" => Output::Lines(
                arg(name, args, 0, "server list", as_servers)
                    .map(|s| zone_directives(s).into_iter().collect())
                    .unwrap_or_default(),
            ),
            "rate_limits" => Output::Lines(
                arg(name, args, 0, "location", as_location)
                    .map(|l| lines(limit_directives(l)))
                    .unwrap_or_default(),
            ),
            "resolvers" => {
                let addresses = arg(name, args, 0, "address list", as_addresses);
                let disable_ipv6 = arg(name, args, 1, "bool", as_bool);
                text(addresses.zip(disable_ipv6).map(|(a, d)| resolver_directive(a, d)))
            }
            "upstream_name" => {
                let host = arg(name, args, 0, "string", as_str);
                let backends = arg(name, args, 1, "backend list", as_backends);
                let location = arg(name, args, 2, "location", as_location);
                match (host, backends, location) {
                    (Some(h), Some(b), Some(l)) => Output::Text(upstream_name(h, b, l)),
                    _ => Output::Text(String::new()),
                }
            }
            "location_in_list" => {
                let location = arg(name, args, 0, "location", as_location);
                let list = arg(name, args, 1, "string", as_str);
                flag(location.zip(list).map(|(l, s)| location_in_list(l, s)))
            }
            "location_allowed" => flag(arg(name, args, 0, "location", as_location).map(location_allowed)),
            "contains_grpc" => flag(arg(name, args, 0, "server", as_server).map(contains_grpc)),
            "log_format_upstream" => {
                text(arg(name, args, 0, "global config", as_global).map(GlobalConfig::log_format_upstream))
            }
            "deny_variable" => text(arg(name, args, 0, "string", as_str).map(|l| self.slugs.variable(l))),
            "getenv" => text(
                arg(name, args, 0, "string", as_str).map(|key| std::env::var(key).unwrap_or_default()),
            ),
            "contains" => str_pair(name, args, |h, n| h.contains(n)),
            "has_prefix" => str_pair(name, args, |h, n| h.starts_with(n)),
            "has_suffix" => str_pair(name, args, |h, n| h.ends_with(n)),
            "to_upper" => text(arg(name, args, 0, "string", as_str).map(str::to_uppercase)),
            "to_lower" => text(arg(name, args, 0, "string", as_str).map(str::to_lowercase)),
            "format_ip" => text(arg(name, args, 0, "string", as_str).map(format_address)),
            "next_upstream" => {
                let raw = arg(name, args, 0, "string", as_str);
                let retry = arg(name, args, 1, "bool", as_bool);
                text(raw.zip(retry).map(|(r, n)| next_upstream_codes(r, n)))
            }
            "valid_buffer_size" => flag(arg(name, args, 0, "string", as_str).map(is_valid_buffer_size)),
            "forwarded_for" => text(arg(name, args, 0, "string", as_str).map(forwarded_for_variable)),
            "sign_auth_url" => text(arg(name, args, 0, "string", as_str).map(sign_auth_url)),
            "tracing_modules" => text(
                arg(name, args, 0, "global config", as_global).map(|g| module_load_directives(&g.tracing)),
            ),
            "tracing_params" => text(
                arg(name, args, 0, "global config", as_global).map(|g| param_directives(&g.tracing)),
            ),
            _ => return Err(HelperError::UnknownHelper(name.to_string())),
        };

        Ok(output)
    }
}
