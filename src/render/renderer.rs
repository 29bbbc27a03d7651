//! Full configuration rendering.
//!
//! # Responsibilities
//! - Emit directive groups in template order (modules, http, upstreams, servers)
//! - Own the deny slug cache for every render of the session
//! - Post-process the output, falling back to raw text on failure
//!
//! # Design Decisions
//! - Rendering is synchronous and CPU-only
//! - Structural problems (empty location path) fail the whole render

use std::fmt::{self, Display, Write};

use crate::config::{RenderSettings, Snapshot};
use crate::directive::Directive;
use crate::model::{Backend, Location, Server};
use crate::observability::metrics;
use crate::render::postprocess::{PostProcessor, SqueezeBlankLines};
use crate::render::{RenderError, RenderResult};
use crate::synthesis::auth::{auth_location, auth_response_headers, sign_auth_url};
use crate::synthesis::location::{location_selector, proxy_target};
use crate::synthesis::opentracing::{module_load_directives, param_directives};
use crate::synthesis::rate_limit::{active_policies, limit_directives, zone_directives};
use crate::synthesis::resolver::{format_address, resolver_directive};
use crate::synthesis::upstream::{load_balancing_directive, upstream_name, DYNAMIC_UPSTREAM, STICKY_PREFIX};
use crate::synthesis::validators::{
    contains_grpc, forwarded_for_variable, is_valid_buffer_size, location_allowed,
    next_upstream_codes,
};
use crate::synthesis::DenySlugCache;

const INDENT: &str = "    ";

/// Indentation-aware line writer.
struct ConfWriter {
    buf: String,
    depth: usize,
}

impl ConfWriter {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(16 * 1024),
            depth: 0,
        }
    }

    fn line(&mut self, line: impl Display) -> fmt::Result {
        for _ in 0..self.depth {
            self.buf.push_str(INDENT);
        }
        writeln!(self.buf, "{}", line)
    }

    /// Write every line of a pre-rendered, newline-separated group.
    fn lines(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            self.line(line)?;
        }
        Ok(())
    }

    fn directives(&mut self, directives: &[Directive]) -> fmt::Result {
        for directive in directives {
            self.line(directive)?;
        }
        Ok(())
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    fn open(&mut self, header: impl Display) -> fmt::Result {
        self.line(format_args!("{} {{", header))?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> fmt::Result {
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Renders snapshots into nginx configuration.
pub struct Renderer {
    settings: RenderSettings,
    slugs: DenySlugCache,
    post_processor: Option<Box<dyn PostProcessor>>,
}

impl Renderer {
    /// Create a renderer with a fresh slug cache.
    pub fn new(settings: RenderSettings) -> Self {
        let post_processor: Option<Box<dyn PostProcessor>> = if settings.squeeze_blank_lines {
            Some(Box::new(SqueezeBlankLines))
        } else {
            None
        };

        Self {
            settings,
            slugs: DenySlugCache::new(),
            post_processor,
        }
    }

    /// Share an existing slug cache (e.g. a seeded one).
    pub fn with_slug_cache(mut self, slugs: DenySlugCache) -> Self {
        self.slugs = slugs;
        self
    }

    /// Replace the post-processor.
    pub fn with_post_processor(mut self, post_processor: impl PostProcessor + 'static) -> Self {
        self.post_processor = Some(Box::new(post_processor));
        self
    }

    pub fn slug_cache(&self) -> &DenySlugCache {
        &self.slugs
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render a snapshot into a complete configuration.
    pub fn render(&self, snapshot: &Snapshot) -> RenderResult<String> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            match serde_json::to_string(snapshot) {
                Ok(json) => tracing::debug!(snapshot = %json, "Rendering snapshot"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize snapshot"),
            }
        }

        let raw = match self.render_raw(snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                metrics::record_render(false, 0);
                return Err(e);
            }
        };

        let output = match &self.post_processor {
            Some(post) => match post.process(&raw) {
                Ok(processed) => processed,
                Err(e) => {
                    metrics::record_postprocess_fallback();
                    tracing::warn!(
                        post_processor = post.name(),
                        error = %e,
                        "Post-processing failed; using raw configuration"
                    );
                    raw
                }
            },
            None => raw,
        };

        metrics::record_render(true, output.lines().count());
        tracing::info!(
            servers = snapshot.servers.len(),
            backends = snapshot.backends.len(),
            bytes = output.len(),
            "Configuration rendered"
        );
        Ok(output)
    }

    fn render_raw(&self, snapshot: &Snapshot) -> RenderResult<String> {
        for server in &snapshot.servers {
            if server.locations.iter().any(|l| l.path.is_empty()) {
                return Err(RenderError::EmptyLocationPath {
                    server: server.hostname.clone(),
                });
            }
        }

        let mut w = ConfWriter::new();
        let global = &snapshot.global;

        let modules = module_load_directives(&global.tracing);
        if !modules.is_empty() {
            w.lines(&modules)?;
            w.blank();
        }

        w.open("events")?;
        w.line("worker_connections 16384;")?;
        w.close()?;
        w.blank();

        w.open("http")?;

        let resolver = resolver_directive(&snapshot.resolvers, global.disable_ipv6);
        if !resolver.is_empty() {
            w.line(resolver)?;
        }
        w.blank();

        if self.settings.dynamic_upstreams {
            w.open("init_by_lua_block")?;
            w.line("balancer = require(\"balancer\")")?;
            w.close()?;
            w.blank();
        }

        w.open("map '' $the_real_ip")?;
        w.line("default $remote_addr;")?;
        w.close()?;
        w.blank();

        w.open("map $http_x_forwarded_proto $pass_access_scheme")?;
        w.line("default $http_x_forwarded_proto;")?;
        w.line("'' $scheme;")?;
        w.close()?;
        w.blank();

        w.line(format_args!("log_format upstreaminfo '{}';", global.log_format_upstream()))?;
        w.blank();

        let forwarded_for = forwarded_for_variable(&global.forwarded_for_header);
        w.open(format_args!("map {} $full_x_forwarded_for", forwarded_for))?;
        w.line(format_args!("default \"{}, $realip_remote_addr\";", forwarded_for))?;
        w.line("'' \"$realip_remote_addr\";")?;
        w.close()?;
        w.blank();

        if global.tracing.enabled && global.tracing.backend().is_some() {
            w.line("opentracing on;")?;
            w.lines(&param_directives(&global.tracing))?;
            w.blank();
        }

        self.write_limit_keys(&mut w, &snapshot.servers)?;

        for zone in zone_directives(&snapshot.servers) {
            w.line(zone)?;
        }
        w.blank();

        self.write_deny_geos(&mut w, &snapshot.servers)?;
        self.write_upstreams(&mut w, snapshot)?;

        for server in &snapshot.servers {
            self.write_server(&mut w, snapshot, server)?;
        }

        w.close()?;
        Ok(w.finish())
    }

    fn deny_label(server: &Server, location: &Location) -> String {
        format!("{}_{}", server.hostname, location.path)
    }

    /// `$limit_<id>` for every policy: the client address, or empty (not
    /// limited) for whitelisted clients.
    fn write_limit_keys(&self, w: &mut ConfWriter, servers: &[Server]) -> fmt::Result {
        for policy in active_policies(servers) {
            w.open(format_args!("geo $remote_addr $whitelist_{}", policy.id))?;
            w.line("default 0;")?;
            for cidr in &policy.whitelist {
                w.line(format_args!("{} 1;", cidr))?;
            }
            w.close()?;
            w.blank();

            w.open(format_args!("map $whitelist_{} $limit_{}", policy.id, policy.id))?;
            w.line("0 $binary_remote_addr;")?;
            w.line("1 \"\";")?;
            w.close()?;
            w.blank();
        }
        Ok(())
    }

    fn write_deny_geos(&self, w: &mut ConfWriter, servers: &[Server]) -> fmt::Result {
        for server in servers {
            for location in &server.locations {
                if location.whitelist.is_empty() || !location_allowed(location) {
                    continue;
                }
                let variable = self.slugs.variable(&Self::deny_label(server, location));
                w.open(format_args!("geo $remote_addr {}", variable))?;
                w.line("default 1;")?;
                for cidr in &location.whitelist {
                    w.line(format_args!("{} 0;", cidr))?;
                }
                w.close()?;
                w.blank();
            }
        }
        Ok(())
    }

    fn write_upstreams(&self, w: &mut ConfWriter, snapshot: &Snapshot) -> fmt::Result {
        if self.settings.dynamic_upstreams {
            w.open(format_args!("upstream {}", DYNAMIC_UPSTREAM))?;
            w.line("server 0.0.0.1;")?;
            w.open("balancer_by_lua_block")?;
            w.line("balancer.balance()")?;
            w.close()?;
            w.close()?;
            w.blank();
            return Ok(());
        }

        for backend in &snapshot.backends {
            w.open(format_args!("upstream {}", backend.name))?;
            if let Some(directive) = load_balancing_directive(backend, &snapshot.global.load_balance) {
                w.line(directive)?;
            }
            Self::write_endpoints(w, backend)?;
            w.close()?;
            w.blank();

            let affinity = &backend.session_affinity;
            if affinity.is_cookie() && affinity.locations.values().any(|paths| !paths.is_empty()) {
                w.open(format_args!("upstream {}{}", STICKY_PREFIX, backend.name))?;
                w.line(format_args!(
                    "sticky hash={} name={} httponly;",
                    if affinity.cookie_hash.is_empty() { "md5" } else { affinity.cookie_hash.as_str() },
                    if affinity.cookie_name.is_empty() { "route" } else { affinity.cookie_name.as_str() },
                ))?;
                Self::write_endpoints(w, backend)?;
                w.close()?;
                w.blank();
            }
        }
        Ok(())
    }

    fn write_endpoints(w: &mut ConfWriter, backend: &Backend) -> fmt::Result {
        if backend.endpoints.is_empty() {
            // nginx rejects an upstream without servers
            return w.line("server 0.0.0.1:80 down;");
        }
        for endpoint in &backend.endpoints {
            w.line(format_args!(
                "server {}:{} max_fails=0 fail_timeout=0;",
                format_address(&endpoint.address),
                endpoint.port
            ))?;
        }
        Ok(())
    }

    fn write_server(&self, w: &mut ConfWriter, snapshot: &Snapshot, server: &Server) -> fmt::Result {
        w.open("server")?;
        w.line(format_args!("server_name {};", server.hostname))?;
        if contains_grpc(server) {
            w.line("listen 80 http2;")?;
        } else {
            w.line("listen 80;")?;
        }
        w.blank();

        for location in &server.locations {
            self.write_location(w, snapshot, server, location)?;
        }

        w.close()?;
        w.blank();
        Ok(())
    }

    fn write_location(
        &self,
        w: &mut ConfWriter,
        snapshot: &Snapshot,
        server: &Server,
        location: &Location,
    ) -> fmt::Result {
        let global = &snapshot.global;
        let allowed = location_allowed(location);
        let auth_path = auth_location(location);

        if allowed && !auth_path.is_empty() {
            w.open(format_args!("location = {}", auth_path))?;
            w.line("internal;")?;
            w.line("proxy_pass_request_body off;")?;
            w.line("proxy_set_header Content-Length \"\";")?;
            w.line("proxy_set_header X-Original-URI $request_uri;")?;
            w.line(format_args!("proxy_pass {};", location.external_auth.url))?;
            w.close()?;
            w.blank();
        }

        w.open(format_args!("location {}", location_selector(location)))?;

        if let Some(reason) = &location.denied {
            tracing::debug!(
                host = %server.hostname,
                path = %location.path,
                reason = %reason,
                "Location denied"
            );
            w.line("return 503;")?;
            w.close()?;
            w.blank();
            return Ok(());
        }

        if !location.whitelist.is_empty() {
            let variable = self.slugs.variable(&Self::deny_label(server, location));
            w.open(format_args!("if ({})", variable))?;
            w.line("return 403;")?;
            w.close()?;
        }

        w.line(format_args!(
            "set $proxy_upstream_name \"{}\";",
            upstream_name(&server.hostname, &snapshot.backends, location)
        ))?;

        if !auth_path.is_empty() {
            w.line(format_args!("auth_request {};", auth_path))?;
            w.directives(&auth_response_headers(location))?;
            if !location.external_auth.signin_url.is_empty() {
                w.line(format_args!(
                    "error_page 401 = {};",
                    sign_auth_url(&location.external_auth.signin_url)
                ))?;
            }
        }

        w.directives(&limit_directives(location))?;

        let buffer_size = if is_valid_buffer_size(&location.client_body_buffer_size) {
            Some(&location.client_body_buffer_size)
        } else if is_valid_buffer_size(&global.client_body_buffer_size) {
            Some(&global.client_body_buffer_size)
        } else {
            None
        };
        if let Some(size) = buffer_size {
            w.line(format_args!("client_body_buffer_size {};", size))?;
        }

        w.line("proxy_set_header X-Forwarded-For $full_x_forwarded_for;")?;

        let next_upstream = if location.next_upstream.is_empty() {
            &global.proxy_next_upstream
        } else {
            &location.next_upstream
        };
        let codes = next_upstream_codes(next_upstream, global.retry_non_idempotent);
        if !codes.is_empty() {
            w.line(format_args!("proxy_next_upstream {};", codes))?;
        }

        w.directives(&proxy_target(
            &server.hostname,
            &snapshot.backends,
            location,
            self.settings.dynamic_upstreams,
        ))?;

        w.close()?;
        w.blank();
        Ok(())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::postprocess::PostProcessError;

    struct Failing;

    impl PostProcessor for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn process(&self, _raw: &str) -> Result<String, PostProcessError> {
            Err(PostProcessError::Failed {
                name: "failing",
                reason: "exit status 1".to_string(),
            })
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            servers: vec![Server {
                hostname: "a.example.com".into(),
                locations: vec![Location::new("/", "web-80")],
            }],
            backends: vec![Backend::new("web-80")],
            ..Default::default()
        }
    }

    #[test]
    fn test_conf_writer_indents_blocks() {
        let mut w = ConfWriter::new();
        w.open("http").unwrap();
        w.open("server").unwrap();
        w.line("listen 80;").unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert_eq!(w.finish(), "http {\n    server {\n        listen 80;\n    }\n}\n");
    }

    #[test]
    fn test_empty_path_fails_render() {
        let mut snapshot = snapshot();
        snapshot.servers[0].locations.push(Location::new("", "web-80"));

        let err = Renderer::default().render(&snapshot).unwrap_err();
        assert!(matches!(err, RenderError::EmptyLocationPath { ref server } if server == "a.example.com"));
    }

    #[test]
    fn test_post_process_failure_returns_raw() {
        let settings = RenderSettings {
            squeeze_blank_lines: false,
            ..Default::default()
        };
        let raw = Renderer::new(settings.clone()).render(&snapshot()).unwrap();
        let fallback = Renderer::new(settings)
            .with_post_processor(Failing)
            .render(&snapshot())
            .unwrap();
        assert_eq!(raw, fallback);
    }

    #[test]
    fn test_squeezed_output_has_no_double_blank_lines() {
        let output = Renderer::default().render(&snapshot()).unwrap();
        assert!(!output.contains("\n\n\n"));
    }

    #[test]
    fn test_tracing_without_collector_stays_off() {
        let mut snapshot = snapshot();
        snapshot.global.tracing.enabled = true;

        let output = Renderer::default().render(&snapshot).unwrap();
        assert!(output.contains("ngx_http_opentracing_module.so;"));
        assert!(!output.contains("opentracing on;"));

        snapshot.global.tracing.zipkin.host = "zipkin.local".into();
        let output = Renderer::default().render(&snapshot).unwrap();
        assert!(output.contains("opentracing on;"));
    }

    #[test]
    fn test_limit_key_per_policy() {
        let mut snapshot = snapshot();
        let policy = &mut snapshot.servers[0].locations[0].rate_limit;
        policy.id = "shop".into();
        policy.connections.name = "shop_conn".into();
        policy.connections.shared_size_mb = 5;
        policy.connections.limit = 10;
        policy.whitelist = vec!["10.0.0.0/8".into()];

        let output = Renderer::default().render(&snapshot).unwrap();
        let geo = output.find("geo $remote_addr $whitelist_shop {").unwrap();
        let map = output.find("map $whitelist_shop $limit_shop {").unwrap();
        let zone = output.find("limit_conn_zone $limit_shop zone=shop_conn:5m;").unwrap();
        assert!(geo < map && map < zone);
        assert!(output.contains("10.0.0.0/8 1;"));
        assert!(output.contains("0 $binary_remote_addr;"));
    }

    #[test]
    fn test_dynamic_upstreams_load_balancer_module() {
        let settings = RenderSettings {
            dynamic_upstreams: true,
            ..Default::default()
        };
        let output = Renderer::new(settings).render(&snapshot()).unwrap();
        let init = output.find("balancer = require(\"balancer\")").unwrap();
        let call = output.find("balancer.balance()").unwrap();
        assert!(init < call);
    }

    #[test]
    fn test_denied_location_returns_503() {
        let mut snapshot = snapshot();
        snapshot.servers[0].locations[0].denied = Some("no endpoints".into());

        let output = Renderer::default().render(&snapshot).unwrap();
        assert!(output.contains("return 503;"));
        assert!(!output.contains("proxy_pass http://web-80;"));
    }
}
