//! Small validators, predicates and formatters used while rendering.

use crate::model::{Location, Server};

/// Sentinel in `proxy_next_upstream` that enables retrying POST and friends.
pub const NON_IDEMPOTENT: &str = "non_idempotent";

/// True for a bare integer or an integer with a `k`/`m` suffix (any case).
pub fn is_valid_buffer_size(size: &str) -> bool {
    if size.is_empty() {
        return false;
    }

    if size.parse::<i64>().is_ok() {
        return true;
    }

    let lower = size.to_lowercase();
    let number = lower.strip_suffix('k').or_else(|| lower.strip_suffix('m'));
    if let Some(Ok(_)) = number.map(str::parse::<i64>) {
        return true;
    }

    tracing::warn!(size = %size, "Buffer size has an invalid format and will not be set");
    false
}

/// nginx variable holding a request header, e.g. `$http_x_forwarded_for`.
pub fn forwarded_for_variable(header_name: &str) -> String {
    format!("$http_{}", header_name.to_lowercase().replace('-', "_"))
}

/// Normalized `proxy_next_upstream` conditions.
///
/// The `non_idempotent` sentinel is pulled out of `raw` and, when present
/// there or requested by `retry_non_idempotent`, appended once at the end.
pub fn next_upstream_codes(raw: &str, retry_non_idempotent: bool) -> String {
    let mut retry_non_idempotent = retry_non_idempotent;
    let mut codes: Vec<&str> = Vec::new();

    for token in raw.split(' ').filter(|t| !t.is_empty()) {
        if token == NON_IDEMPOTENT {
            retry_non_idempotent = true;
        } else {
            codes.push(token);
        }
    }

    if retry_non_idempotent {
        codes.push(NON_IDEMPOTENT);
    }

    codes.join(" ")
}

/// True when the location path starts with any entry of a comma-separated list.
pub fn location_in_list(location: &Location, raw_list: &str) -> bool {
    raw_list
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .any(|item| location.path.starts_with(item))
}

/// True unless the location is blocked.
pub fn location_allowed(location: &Location) -> bool {
    location.denied.is_none()
}

/// True when any location of the server proxies gRPC.
pub fn contains_grpc(server: &Server) -> bool {
    server.locations.iter().any(|l| l.grpc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizes() {
        assert!(is_valid_buffer_size("1000"));
        assert!(is_valid_buffer_size("8k"));
        assert!(is_valid_buffer_size("8K"));
        assert!(is_valid_buffer_size("2m"));
        assert!(is_valid_buffer_size("2M"));

        assert!(!is_valid_buffer_size(""));
        assert!(!is_valid_buffer_size("8x"));
        assert!(!is_valid_buffer_size("k"));
        assert!(!is_valid_buffer_size("8km"));
        assert!(!is_valid_buffer_size("1.5m"));
    }

    #[test]
    fn test_forwarded_for_variable() {
        assert_eq!(forwarded_for_variable("X-Forwarded-For"), "$http_x_forwarded_for");
        assert_eq!(forwarded_for_variable("True-Client-IP"), "$http_true_client_ip");
    }

    #[test]
    fn test_next_upstream_sentinel_moves_last() {
        assert_eq!(
            next_upstream_codes("error non_idempotent timeout", false),
            "error timeout non_idempotent"
        );
        assert_eq!(
            next_upstream_codes("error timeout non_idempotent", false),
            "error timeout non_idempotent"
        );
    }

    #[test]
    fn test_next_upstream_flag_appends_once() {
        assert_eq!(next_upstream_codes("error", true), "error non_idempotent");
        assert_eq!(
            next_upstream_codes("error  non_idempotent", true),
            "error non_idempotent"
        );
        assert_eq!(next_upstream_codes("error  http_502 ", false), "error http_502");
        assert_eq!(next_upstream_codes("", false), "");
    }

    #[test]
    fn test_location_in_list() {
        let location = Location::new("/admin/users", "svc");
        assert!(location_in_list(&location, "/public, /admin"));
        assert!(!location_in_list(&location, "/public, ,/api"));
        assert!(!location_in_list(&location, ""));
    }

    #[test]
    fn test_location_allowed() {
        let mut location = Location::new("/", "svc");
        assert!(location_allowed(&location));
        location.denied = Some("service does not exist".to_string());
        assert!(!location_allowed(&location));
    }

    #[test]
    fn test_contains_grpc() {
        let mut grpc = Location::new("/rpc", "svc");
        grpc.grpc = true;
        let mut server = Server {
            hostname: "a".into(),
            locations: vec![Location::new("/", "svc")],
        };
        assert!(!contains_grpc(&server));
        server.locations.push(grpc);
        assert!(contains_grpc(&server));
    }
}
