//! Proxy factory.
//!
//! Binds the upstream configuration once and hands out one
//! [`ProxyMiddleware`] per route. All middleware from the same factory share
//! the config, transport, and diagnostics sink.

use std::sync::Arc;

use crate::config::validation::validate_proxy;
use crate::config::ProxyConfig;
use crate::observability::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::proxy::context::{Context, Flow};
use crate::proxy::descriptor::Encoding;
use crate::proxy::forwarder::{RequestForwarder, RouteTarget};
use crate::proxy::transport::{HttpTransport, Transport};

/// Produces route middleware bound to one upstream.
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use pixie_proxy::{relay, ProxyConfig, ProxyFactory};
///
/// let proxy = ProxyFactory::new(ProxyConfig::new("http://localhost:3000"));
/// let app: Router = Router::new()
///     .route("/foo", get(relay).route_layer(proxy.proxy("/hurp")))
///     .route("/haveparams/{hurp}", get(relay).route_layer(proxy.proxy("/haveparams/:hurp")));
/// ```
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    config: Arc<ProxyConfig>,
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl ProxyFactory {
    /// Factory using the hyper transport and `tracing` diagnostics. No I/O happens here.
    ///
    /// An invalid binding is logged, not rejected: every forward then fails
    /// with a status instead.
    pub fn new(config: ProxyConfig) -> Self {
        if let Err(errors) = validate_proxy(&config) {
            for error in errors {
                tracing::warn!(error = %error, "Questionable upstream configuration");
            }
        }
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config));
        Self {
            config: Arc::new(config),
            transport,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Middleware forwarding to `template`, decoding text as UTF-8.
    ///
    /// An empty template forwards the inbound path unchanged.
    pub fn proxy(&self, template: &str) -> ProxyMiddleware {
        self.proxy_with_encoding(template, Some(Encoding::Utf8))
    }

    /// Middleware forwarding to `template` with an explicit body encoding.
    /// `None` relays raw bytes, for images and other binary payloads.
    pub fn proxy_with_encoding(&self, template: &str, encoding: Option<Encoding>) -> ProxyMiddleware {
        let forwarder = RequestForwarder::new(
            self.config.clone(),
            self.transport.clone(),
            self.diagnostics.clone(),
        );
        ProxyMiddleware {
            forwarder,
            target: Arc::new(RouteTarget::new(template, encoding)),
        }
    }
}

/// Forwards every request of one route to the upstream.
///
/// Usable directly through [`ProxyMiddleware::handle`], or as a
/// [`tower::Layer`] on an axum route (see [`crate::proxy::layer`]).
#[derive(Debug, Clone)]
pub struct ProxyMiddleware {
    forwarder: RequestForwarder,
    target: Arc<RouteTarget>,
}

impl ProxyMiddleware {
    /// Run the middleware for one request.
    pub async fn handle(&self, ctx: &mut Context) -> Flow {
        self.forwarder.forward(ctx, &self.target).await
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn max_body_size(&self) -> usize {
        self.forwarder.config().max_body_size
    }
}
