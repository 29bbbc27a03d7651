//! Location selectors and proxy targets.
//!
//! # Responsibilities
//! - Turn a location path into the `location` block selector
//! - Build the rewrite / prefix header / proxy / base-href sequence
//!
//! # Design Decisions
//! - A location without a rewrite keeps its literal path selector
//! - Rewritten locations become case-insensitive regex selectors that
//!   capture the remainder as `$baseuri`
//! - The slash between path and remainder is never captured twice

use crate::directive::{Directive, BASEURI_CAPTURE};
use crate::model::server::CATCH_ALL;
use crate::model::{Backend, Location};
use crate::synthesis::upstream::{find_backend, upstream_name, DYNAMIC_UPSTREAM};

/// Scheme used for the base href when the location sets none.
const NEGOTIATED_SCHEME: &str = "$scheme";

/// The selector following `location` in the generated block.
pub fn location_selector(location: &Location) -> String {
    let path = &location.path;
    if !location.rewrites() {
        return path.clone();
    }

    if path == CATCH_ALL {
        return format!("~* {}", path);
    }

    if path.ends_with('/') {
        format!("~* ^{}{}", path, BASEURI_CAPTURE)
    } else {
        format!(r"~* ^{}\/?{}", path, BASEURI_CAPTURE)
    }
}

/// Directives that hand a location's request to its upstream.
///
/// Without a rewrite this is the single `proxy_pass`/`grpc_pass` line.
/// With one, the sequence is: rewrite rule(s), optional
/// `X-Forwarded-Prefix`, the pass directive, optional base href filter.
pub fn proxy_target(
    hostname: &str,
    backends: &[Backend],
    location: &Location,
    dynamic_upstreams: bool,
) -> Vec<Directive> {
    let tls = find_backend(backends, location)
        .map(Backend::is_tls)
        .unwrap_or(false);

    let upstream = if dynamic_upstreams {
        DYNAMIC_UPSTREAM.to_string()
    } else {
        upstream_name(hostname, backends, location)
    };

    let pass = Directive::pass(location.grpc, tls, upstream);

    if !location.rewrites() {
        return vec![pass];
    }

    let mut path = location.path.clone();
    if !path.ends_with('/') {
        path.push('/');
    }

    let target = &location.rewrite.target;
    let mut directives = Vec::with_capacity(5);

    if target == CATCH_ALL {
        directives.push(Directive::Rewrite {
            pattern: format!("{}(.*)", path),
            replacement: "/$1".to_string(),
        });
        directives.push(Directive::Rewrite {
            pattern: location.path.clone(),
            replacement: CATCH_ALL.to_string(),
        });
    } else {
        directives.push(Directive::Rewrite {
            pattern: format!("{}(.*)", path),
            replacement: format!("{}/$1", target),
        });
    }

    if location.x_forwarded_prefix {
        directives.push(Directive::ProxySetHeader {
            name: "X-Forwarded-Prefix".to_string(),
            value: format!("\"{}\"", path),
        });
    }

    directives.push(pass);

    if location.rewrite.add_base_url {
        let scheme = if location.rewrite.base_url_scheme.is_empty() {
            NEGOTIATED_SCHEME.to_string()
        } else {
            location.rewrite.base_url_scheme.clone()
        };
        directives.push(Directive::BaseHref {
            scheme,
            path: format!("{}$baseuri", path),
        });
    }

    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::HEAD_TAG_REGEX;

    fn rewritten(path: &str, target: &str) -> Location {
        let mut location = Location::new(path, "app-80");
        location.rewrite.target = target.to_string();
        location
    }

    fn lines(directives: &[Directive]) -> Vec<String> {
        directives.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_selector_without_rewrite() {
        assert_eq!(location_selector(&Location::new("/api", "app-80")), "/api");
        assert_eq!(location_selector(&rewritten("/api", "/api")), "/api");
    }

    #[test]
    fn test_selector_catch_all() {
        assert_eq!(location_selector(&rewritten("/", "/app")), "~* /");
    }

    #[test]
    fn test_selector_optional_slash() {
        assert_eq!(
            location_selector(&rewritten("/api", "/")),
            r"~* ^/api\/?(?<baseuri>.*)"
        );
        assert_eq!(
            location_selector(&rewritten("/api/", "/")),
            "~* ^/api/(?<baseuri>.*)"
        );
    }

    #[test]
    fn test_target_equal_to_path_is_base_only() {
        let mut location = rewritten("/api", "/api");
        location.x_forwarded_prefix = true;
        location.rewrite.add_base_url = true;

        let directives = proxy_target("h", &[], &location, false);
        assert_eq!(lines(&directives), vec!["proxy_pass http://app-80;"]);
    }

    #[test]
    fn test_empty_target_is_base_only() {
        let directives = proxy_target("h", &[], &Location::new("/api", "app-80"), false);
        assert_eq!(lines(&directives), vec!["proxy_pass http://app-80;"]);
    }

    #[test]
    fn test_rewrite_to_other_path() {
        let mut location = rewritten("/api", "/internal");
        location.x_forwarded_prefix = true;

        let directives = proxy_target("h", &[], &location, false);
        assert_eq!(
            lines(&directives),
            vec![
                "rewrite /api/(.*) /internal/$1 break;",
                "proxy_set_header X-Forwarded-Prefix \"/api/\";",
                "proxy_pass http://app-80;",
            ]
        );
    }

    #[test]
    fn test_rewrite_to_root_with_base_url() {
        let mut location = rewritten("/app", "/");
        location.rewrite.add_base_url = true;

        let directives = proxy_target("h", &[], &location, false);
        assert_eq!(
            lines(&directives),
            vec![
                "rewrite /app/(.*) /$1 break;".to_string(),
                "rewrite /app / break;".to_string(),
                "proxy_pass http://app-80;".to_string(),
                format!(
                    r#"subs_filter '{}' '$1<base href="$scheme://$http_host/app/$baseuri">' ro;"#,
                    HEAD_TAG_REGEX
                ),
            ]
        );
    }

    #[test]
    fn test_base_url_scheme_override() {
        let mut location = rewritten("/app/", "/");
        location.rewrite.add_base_url = true;
        location.rewrite.base_url_scheme = "https".to_string();

        let directives = proxy_target("h", &[], &location, false);
        let last = directives.last().unwrap().to_string();
        assert!(last.contains(r#"<base href="https://$http_host/app/$baseuri">"#));
    }

    #[test]
    fn test_grpc_secure_backend() {
        let mut backend = Backend::new("app-80");
        backend.secure = true;
        let mut location = rewritten("/svc", "/");
        location.grpc = true;

        let directives = proxy_target("h", &[backend], &location, false);
        assert_eq!(
            lines(&directives),
            vec![
                "rewrite /svc/(.*) /$1 break;",
                "rewrite /svc / break;",
                "grpc_pass grpcs://app-80;",
            ]
        );
    }

    #[test]
    fn test_dynamic_upstream_ignores_sticky() {
        let mut backend = Backend::new("app-80");
        backend.ssl_passthrough = true;
        backend.session_affinity.affinity_type = "cookie".to_string();
        backend
            .session_affinity
            .locations
            .insert("h".to_string(), vec!["/".to_string()]);
        let location = Location::new("/", "app-80");

        let dynamic = proxy_target("h", std::slice::from_ref(&backend), &location, true);
        assert_eq!(lines(&dynamic), vec!["proxy_pass https://upstream_balancer;"]);

        let fixed = proxy_target("h", &[backend], &location, false);
        assert_eq!(lines(&fixed), vec!["proxy_pass https://sticky-app-80;"]);
    }
}
