//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use axum::http::Method;
use axum::routing::MethodFilter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::proxy::descriptor::{Encoding, UnknownEncoding};

/// Root configuration for the standalone proxy server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream the routes forward to.
    pub upstream: ProxyConfig,

    /// Route declarations.
    pub routes: Vec<RouteConfig>,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream binding shared by every middleware a factory produces.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the upstream (e.g., "http://127.0.0.1:3000").
    /// The resolved path is appended verbatim.
    pub host: String,

    /// Write the upstream failure reason into the response body.
    pub propagate_error_body: bool,

    /// Deadline for one outbound call, in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Largest inbound request body buffered, in bytes.
    pub max_body_size: usize,

    /// Largest upstream response body buffered, in bytes.
    pub max_response_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            propagate_error_body: true,
            timeout_secs: 30,
            connect_timeout_secs: 5,
            max_body_size: 2 * 1024 * 1024, // 2MB
            max_response_size: 64 * 1024 * 1024, // 64MB
        }
    }
}

impl ProxyConfig {
    /// Config for `host` with every other setting at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One proxied route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Inbound path declaration, with `:name` placeholders.
    pub path: String,

    /// Accepted methods; empty accepts any.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Upstream path template; empty forwards the inbound path.
    #[serde(default)]
    pub upstream: String,

    /// Body encoding: "utf8", "latin1", or "none" for raw bytes.
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    "utf8".to_string()
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: Vec::new(),
            upstream: upstream.into(),
            encoding: default_encoding(),
        }
    }

    pub fn encoding(&self) -> Result<Option<Encoding>, UnknownEncoding> {
        Encoding::parse_optional(&self.encoding)
    }

    /// Combined filter for `methods`, `None` when any method is accepted.
    pub fn method_filter(&self) -> Result<Option<MethodFilter>, String> {
        let mut combined: Option<MethodFilter> = None;
        for name in &self.methods {
            let method = Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| format!("invalid method '{}'", name))?;
            let filter = MethodFilter::try_from(method)
                .map_err(|_| format!("unsupported method '{}'", name))?;
            combined = Some(match combined {
                Some(existing) => existing.or(filter),
                None => filter,
            });
        }
        Ok(combined)
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed to answer an inbound request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: ServerConfig = toml::from_str(
            r#"
            [upstream]
            host = "http://localhost:3000"

            [[routes]]
            path = "/foo"
            upstream = "/hurp"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.host, "http://localhost:3000");
        assert!(config.upstream.propagate_error_body);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(30));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].encoding().unwrap(), Some(Encoding::Utf8));
        assert_eq!(config.routes[0].method_filter().unwrap(), None);
    }

    #[test]
    fn test_route_options() {
        let route: RouteConfig = toml::from_str(
            r#"
            path = "/static/:file"
            methods = ["get", "HEAD"]
            encoding = "none"
            "#,
        )
        .unwrap();

        assert_eq!(route.upstream, "");
        assert_eq!(route.encoding().unwrap(), None);
        assert_eq!(
            route.method_filter().unwrap(),
            Some(MethodFilter::GET.or(MethodFilter::HEAD))
        );
    }

    #[test]
    fn test_bad_method() {
        let mut route = RouteConfig::new("/", "");
        route.methods = vec!["BREW".into()];
        assert!(route.method_filter().is_err());
    }
}
