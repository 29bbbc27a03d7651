//! Name server and address formatting.

use std::net::IpAddr;

use crate::directive::Directive;

/// IPv4-mapped IPv6 addresses count as IPv4.
fn is_ipv6(address: &IpAddr) -> bool {
    match address {
        IpAddr::V4(_) => false,
        IpAddr::V6(v6) => v6.to_ipv4_mapped().is_none(),
    }
}

/// Bracket IPv6 literals; anything else passes through unchanged.
pub fn format_address(input: &str) -> String {
    match input.parse::<IpAddr>() {
        Ok(address) if is_ipv6(&address) => format!("[{}]", input),
        _ => input.to_string(),
    }
}

/// The `resolver` directive, or an empty string without name servers.
///
/// With `disable_ipv6`, IPv6 name servers are dropped and nginx is told
/// not to look up AAAA records.
pub fn resolver_directive(addresses: &[IpAddr], disable_ipv6: bool) -> String {
    if addresses.is_empty() {
        return String::new();
    }

    let addresses = addresses
        .iter()
        .filter_map(|address| match (is_ipv6(address), disable_ipv6) {
            (false, _) => Some(address.to_string()),
            (true, true) => None,
            (true, false) => Some(format!("[{}]", address)),
        })
        .collect();

    Directive::Resolver {
        addresses,
        ipv6_off: disable_ipv6,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ips(raw: &[&str]) -> Vec<IpAddr> {
        raw.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address("10.0.0.1"), "10.0.0.1");
        assert_eq!(format_address("::1"), "[::1]");
        assert_eq!(format_address("fe80::1ff:fe23:4567:890a"), "[fe80::1ff:fe23:4567:890a]");
        assert_eq!(format_address("::ffff:10.0.0.1"), "::ffff:10.0.0.1");
        assert_eq!(format_address("not-an-ip"), "not-an-ip");
        assert_eq!(format_address(""), "");
    }

    #[test]
    fn test_resolver_empty() {
        assert_eq!(resolver_directive(&[], false), "");
        assert_eq!(resolver_directive(&[], true), "");
    }

    #[test]
    fn test_resolver_mixed_families() {
        assert_eq!(
            resolver_directive(&ips(&["10.0.0.1", "::1"]), false),
            "resolver 10.0.0.1 [::1] valid=30s;"
        );
    }

    #[test]
    fn test_resolver_ipv6_disabled() {
        let directive = resolver_directive(&ips(&["10.0.0.1", "::1"]), true);
        assert_eq!(directive, "resolver 10.0.0.1 valid=30s ipv6=off;");
        assert!(!directive.contains("::1"));
    }
}
