//! External authentication directives.
//!
//! # Responsibilities
//! - Name the internal location serving the `auth_request` subrequest
//! - Copy auth response headers onto the proxied request
//! - Append the return destination to sign-in URLs
//!
//! # Design Decisions
//! - The intercept path is derived from the location path only, so it is
//!   identical across renders and processes
//! - Header variables are indexed by declaration position

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use url::{form_urlencoded, Url};

use crate::directive::Directive;
use crate::model::Location;

/// Prefix of every external-auth intercept location.
pub const AUTH_LOCATION_PREFIX: &str = "/_external-auth-";

/// Query parameter carrying the post-login destination.
const RETURN_PARAM: &str = "rd";

/// Destination nginx fills in at request time.
const RETURN_DESTINATION: &str = "$pass_access_scheme://$http_host$request_uri";

/// Path of the internal auth location, or empty without external auth.
pub fn auth_location(location: &Location) -> String {
    if !location.external_auth.is_enabled() {
        return String::new();
    }

    format!(
        "{}{}",
        AUTH_LOCATION_PREFIX,
        URL_SAFE_NO_PAD.encode(location.path.as_bytes())
    )
}

/// Two directives per declared auth response header, in declaration order.
pub fn auth_response_headers(location: &Location) -> Vec<Directive> {
    location
        .external_auth
        .response_headers
        .iter()
        .enumerate()
        .flat_map(|(index, header)| {
            let variable = header.to_lowercase().replace('-', "_");
            [
                Directive::AuthRequestSet { index, variable },
                Directive::ProxySetHeader {
                    name: format!("'{}'", header),
                    value: format!("$authHeader{}", index),
                },
            ]
        })
        .collect()
}

/// Sign-in URL with the return destination appended.
///
/// A URL that already names a non-empty `rd` is returned untouched.
pub fn sign_auth_url(base: &str) -> String {
    let query = match Url::parse(base) {
        Ok(url) => url.query().map(str::to_owned),
        Err(e) => {
            tracing::debug!(url = %base, error = %e, "Sign-in URL is not absolute; inspecting raw query");
            base.split_once('?').map(|(_, q)| q.split('#').next().unwrap_or("").to_owned())
        }
    };

    let query = query.unwrap_or_default();
    let mut pairs = form_urlencoded::parse(query.as_bytes()).peekable();

    if pairs.peek().is_none() {
        let separator = if base.ends_with('?') { "" } else { "?" };
        return format!("{}{}{}={}", base, separator, RETURN_PARAM, RETURN_DESTINATION);
    }

    if pairs.any(|(k, v)| k == RETURN_PARAM && !v.is_empty()) {
        return base.to_string();
    }

    format!("{}&{}={}", base, RETURN_PARAM, RETURN_DESTINATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_auth(path: &str, headers: &[&str]) -> Location {
        let mut location = Location::new(path, "svc");
        location.external_auth.url = "http://auth.local/verify".to_string();
        location.external_auth.response_headers = headers.iter().map(|h| h.to_string()).collect();
        location
    }

    #[test]
    fn test_auth_location_disabled() {
        assert_eq!(auth_location(&Location::new("/api", "svc")), "");
    }

    #[test]
    fn test_auth_location_strips_padding() {
        // "/a" encodes to "L2E=" with padding
        assert_eq!(auth_location(&with_auth("/a", &[])), "/_external-auth-L2E");
        assert_eq!(auth_location(&with_auth("/", &[])), "/_external-auth-Lw");
    }

    #[test]
    fn test_auth_location_is_stable() {
        let location = with_auth("/shop/cart", &[]);
        assert_eq!(auth_location(&location), auth_location(&location.clone()));
        assert!(!auth_location(&location).contains('='));
    }

    #[test]
    fn test_auth_response_headers() {
        let location = with_auth("/", &["X-User-Id", "UID"]);
        let lines: Vec<String> = auth_response_headers(&location)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            lines,
            vec![
                "auth_request_set $authHeader0 $upstream_http_x_user_id;",
                "proxy_set_header 'X-User-Id' $authHeader0;",
                "auth_request_set $authHeader1 $upstream_http_uid;",
                "proxy_set_header 'UID' $authHeader1;",
            ]
        );
    }

    #[test]
    fn test_sign_url_without_query() {
        assert_eq!(
            sign_auth_url("https://login.example.com/start"),
            "https://login.example.com/start?rd=$pass_access_scheme://$http_host$request_uri"
        );
    }

    #[test]
    fn test_sign_url_with_query() {
        assert_eq!(
            sign_auth_url("https://login.example.com/start?team=ops"),
            "https://login.example.com/start?team=ops&rd=$pass_access_scheme://$http_host$request_uri"
        );
    }

    #[test]
    fn test_sign_url_keeps_existing_rd() {
        let url = "https://login.example.com/start?rd=https://app.example.com";
        assert_eq!(sign_auth_url(url), url);
    }

    #[test]
    fn test_sign_url_empty_rd_is_replaced() {
        assert_eq!(
            sign_auth_url("https://login.example.com/start?rd="),
            "https://login.example.com/start?rd=&rd=$pass_access_scheme://$http_host$request_uri"
        );
    }

    #[test]
    fn test_sign_relative_url() {
        assert_eq!(
            sign_auth_url("/oauth2/start?x=1"),
            "/oauth2/start?x=1&rd=$pass_access_scheme://$http_host$request_uri"
        );
    }
}
