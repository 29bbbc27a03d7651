//! Shared fixtures for integration tests.

use ingress_directives::config::Snapshot;
use ingress_directives::model::backend::COOKIE_AFFINITY;
use ingress_directives::model::{Backend, Endpoint, Location, RateLimitPolicy, Server, Zone};

/// A backend with one endpoint per address.
pub fn backend(name: &str, addresses: &[&str]) -> Backend {
    let mut backend = Backend::new(name);
    backend.endpoints = addresses
        .iter()
        .map(|a| Endpoint {
            address: a.to_string(),
            port: 8080,
        })
        .collect();
    backend
}

/// Make `backend` sticky for `paths` on `host`.
#[allow(dead_code)]
pub fn make_sticky(backend: &mut Backend, host: &str, paths: &[&str]) {
    backend.session_affinity.affinity_type = COOKIE_AFFINITY.to_string();
    backend.session_affinity.cookie_name = "route".to_string();
    backend
        .session_affinity
        .locations
        .insert(host.to_string(), paths.iter().map(|p| p.to_string()).collect());
}

/// A policy with all three limiters enabled.
#[allow(dead_code)]
pub fn policy(id: &str) -> RateLimitPolicy {
    let zone = |suffix: &str, limit: i64| Zone {
        name: format!("{}_{}", id, suffix),
        shared_size_mb: 5,
        limit,
        burst: limit * 5,
    };
    RateLimitPolicy {
        id: id.to_string(),
        connections: zone("conn", 10),
        rps: zone("rps", 20),
        rpm: zone("rpm", 600),
        limit_rate_kbps: 0,
        limit_rate_after_kb: 0,
        whitelist: Vec::new(),
    }
}

pub fn server(hostname: &str, locations: Vec<Location>) -> Server {
    Server {
        hostname: hostname.to_string(),
        locations,
    }
}

/// Two servers sharing a backend.
pub fn shop_snapshot() -> Snapshot {
    let mut app = Location::new("/app", "shop-web-80");
    app.rewrite.target = "/".to_string();
    app.rewrite.add_base_url = true;

    Snapshot {
        servers: vec![
            server("shop.example.com", vec![Location::new("/", "shop-web-80"), app]),
            server("blog.example.com", vec![Location::new("/", "blog-80")]),
        ],
        backends: vec![
            backend("shop-web-80", &["10.1.0.4", "10.1.0.5"]),
            backend("blog-80", &["fd00::20"]),
        ],
        resolvers: vec!["10.96.0.10".parse().unwrap()],
        ..Default::default()
    }
}
