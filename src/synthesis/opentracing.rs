//! Tracing module directives.

use crate::config::schema::{JaegerConfig, TracingConfig, ZipkinConfig};
use crate::directive::{to_lines, Directive};

const MODULE_DIR: &str = "/etc/nginx/modules";

/// The collector a configuration traces to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TracingBackend<'a> {
    Zipkin(&'a ZipkinConfig),
    Jaeger(&'a JaegerConfig),
}

impl TracingConfig {
    /// Zipkin when its host is set, else Jaeger when its host is set.
    pub fn backend(&self) -> Option<TracingBackend<'_>> {
        if !self.zipkin.host.is_empty() {
            Some(TracingBackend::Zipkin(&self.zipkin))
        } else if !self.jaeger.host.is_empty() {
            Some(TracingBackend::Jaeger(&self.jaeger))
        } else {
            None
        }
    }
}

fn module(name: &str) -> Directive {
    Directive::LoadModule {
        path: format!("{}/ngx_http_{}_module.so", MODULE_DIR, name),
    }
}

/// `load_module` lines for the opentracing module and its collector.
pub fn module_load_directives(cfg: &TracingConfig) -> String {
    if !cfg.enabled {
        return String::new();
    }

    let mut modules = vec![module("opentracing")];
    match cfg.backend() {
        Some(TracingBackend::Zipkin(_)) => modules.push(module("zipkin")),
        Some(TracingBackend::Jaeger(_)) => modules.push(module("jaeger")),
        None => {}
    }

    to_lines(&modules)
}

/// Collector parameters for the http context.
pub fn param_directives(cfg: &TracingConfig) -> String {
    if !cfg.enabled {
        return String::new();
    }

    let params = match cfg.backend() {
        Some(TracingBackend::Zipkin(zipkin)) => vec![
            Directive::TracingParam {
                name: "zipkin_collector_host",
                value: zipkin.host.clone(),
            },
            Directive::TracingParam {
                name: "zipkin_collector_port",
                value: zipkin.port.to_string(),
            },
            Directive::TracingParam {
                name: "zipkin_service_name",
                value: zipkin.service_name.clone(),
            },
        ],
        Some(TracingBackend::Jaeger(jaeger)) => vec![
            Directive::TracingParam {
                name: "jaeger_reporter_local_agent_host_port",
                value: format!("{}:{}", jaeger.host, jaeger.port),
            },
            Directive::TracingParam {
                name: "jaeger_service_name",
                value: jaeger.service_name.clone(),
            },
            Directive::TracingParam {
                name: "jaeger_sampler_type",
                value: jaeger.sampler_type.clone(),
            },
            Directive::TracingParam {
                name: "jaeger_sampler_param",
                value: jaeger.sampler_param.clone(),
            },
        ],
        None => Vec::new(),
    };

    to_lines(&params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> TracingConfig {
        TracingConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_is_empty() {
        let mut cfg = TracingConfig::default();
        cfg.zipkin.host = "zipkin.local".to_string();
        assert_eq!(module_load_directives(&cfg), "");
        assert_eq!(param_directives(&cfg), "");
    }

    #[test]
    fn test_zipkin() {
        let mut cfg = enabled();
        cfg.zipkin.host = "zipkin.local".to_string();

        assert_eq!(
            module_load_directives(&cfg),
            "load_module /etc/nginx/modules/ngx_http_opentracing_module.so;\n\
             load_module /etc/nginx/modules/ngx_http_zipkin_module.so;\n"
        );

        let rendered = param_directives(&cfg);
        let params: Vec<&str> = rendered.lines().collect();
        assert_eq!(params.len(), 3);
        assert!(params[0].starts_with("zipkin_collector_host "));
        assert!(params[0].ends_with(" zipkin.local;"));
        assert!(params[1].ends_with(" 9411;"));
        assert!(params[2].ends_with(" nginx;"));
    }

    #[test]
    fn test_zipkin_wins_over_jaeger() {
        let mut cfg = enabled();
        cfg.zipkin.host = "zipkin.local".to_string();
        cfg.jaeger.host = "jaeger.local".to_string();

        assert!(!module_load_directives(&cfg).contains("jaeger"));
        assert!(!param_directives(&cfg).contains("jaeger"));
    }

    #[test]
    fn test_jaeger() {
        let mut cfg = enabled();
        cfg.jaeger.host = "jaeger.local".to_string();
        cfg.jaeger.sampler_type = "probabilistic".to_string();
        cfg.jaeger.sampler_param = "0.25".to_string();

        assert!(module_load_directives(&cfg).ends_with("ngx_http_jaeger_module.so;\n"));

        let params = param_directives(&cfg);
        let lines: Vec<&str> = params.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with(" jaeger.local:6831;"));
        assert!(lines[2].ends_with(" probabilistic;"));
        assert!(lines[3].ends_with(" 0.25;"));
    }

    #[test]
    fn test_enabled_without_collector() {
        let cfg = enabled();
        assert_eq!(
            module_load_directives(&cfg),
            "load_module /etc/nginx/modules/ngx_http_opentracing_module.so;\n"
        );
        assert_eq!(param_directives(&cfg), "");
    }
}
