//! Rate limit zones and limits.
//!
//! # Responsibilities
//! - Collect distinct policies across every server
//! - Declare each shared memory zone exactly once (http context)
//! - Apply the limits inside a location
//!
//! # Design Decisions
//! - Zones are cluster-wide: deduplicated over all servers, by rendered text
//! - Limiter order is fixed: connections, requests/second, requests/minute
//! - Disabled limiters (non-positive limit) emit nothing

use std::collections::{BTreeSet, HashSet};

use crate::directive::{Directive, RateUnit};
use crate::model::{Location, RateLimitPolicy, Server};

/// First occurrence of each distinct policy id, in encounter order.
pub fn active_policies(servers: &[Server]) -> Vec<RateLimitPolicy> {
    let mut seen = HashSet::new();
    let mut policies = Vec::new();

    for location in servers.iter().flat_map(|s| s.locations.iter()) {
        let policy = &location.rate_limit;
        if !policy.id.is_empty() && seen.insert(policy.id.as_str()) {
            policies.push(policy.clone());
        }
    }

    policies
}

/// Zone declarations of one policy: connections, rps, rpm.
fn policy_zones(policy: &RateLimitPolicy) -> Vec<Directive> {
    let mut zones = Vec::with_capacity(3);

    if policy.connections.is_active() {
        zones.push(Directive::LimitConnZone {
            key: policy.id.clone(),
            zone: policy.connections.name.clone(),
            size_mb: policy.connections.shared_size_mb,
        });
    }

    for (zone, unit) in [(&policy.rps, RateUnit::PerSecond), (&policy.rpm, RateUnit::PerMinute)] {
        if zone.is_active() {
            zones.push(Directive::LimitReqZone {
                key: policy.id.clone(),
                zone: zone.name.clone(),
                size_mb: zone.shared_size_mb,
                rate: zone.limit,
                unit,
            });
        }
    }

    zones
}

/// Every zone declaration needed by the configuration, each exactly once.
pub fn zone_directives(servers: &[Server]) -> BTreeSet<String> {
    servers
        .iter()
        .flat_map(|s| s.locations.iter())
        .flat_map(|l| policy_zones(&l.rate_limit))
        .map(|d| d.to_string())
        .collect()
}

/// Limits applied inside a location block, in fixed order.
pub fn limit_directives(location: &Location) -> Vec<Directive> {
    let policy = &location.rate_limit;
    let mut limits = Vec::with_capacity(5);

    if policy.connections.is_active() {
        limits.push(Directive::LimitConn {
            zone: policy.connections.name.clone(),
            limit: policy.connections.limit,
        });
    }

    for zone in [&policy.rps, &policy.rpm] {
        if zone.is_active() {
            limits.push(Directive::LimitReq {
                zone: zone.name.clone(),
                burst: zone.burst,
            });
        }
    }

    if policy.limit_rate_after_kb > 0 {
        limits.push(Directive::LimitRateAfter {
            kb: policy.limit_rate_after_kb,
        });
    }

    if policy.limit_rate_kbps > 0 {
        limits.push(Directive::LimitRate {
            kbps: policy.limit_rate_kbps,
        });
    }

    limits
}
