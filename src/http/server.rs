//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create an axum Router with one proxied route per `RouteConfig`
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Stop accepting on the shutdown signal

use axum::routing::{any, on};
use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::validation::check_route_path;
use crate::config::{RouteConfig, ServerConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::proxy::{relay, ProxyFactory, ProxyMiddleware};
use crate::routing::PathTemplate;

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server for a validated configuration.
    pub fn new(config: ServerConfig) -> Self {
        let factory = ProxyFactory::new(config.upstream.clone());
        Self::with_factory(config, factory)
    }

    /// Create a server whose routes come from `factory`.
    pub fn with_factory(config: ServerConfig, factory: ProxyFactory) -> Self {
        let router = Self::build_router(&config, &factory);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, factory: &ProxyFactory) -> Router {
        let mut router = Router::new();

        for route in &config.routes {
            let Some(middleware) = Self::route_middleware(route, factory) else {
                continue;
            };
            let handler = match route.method_filter() {
                Ok(Some(filter)) => on(filter, relay),
                Ok(None) => any(relay),
                Err(e) => {
                    tracing::error!(path = %route.path, error = %e, "Skipping route");
                    continue;
                }
            };

            let declared = PathTemplate::parse(route.path.as_str());
            tracing::info!(
                path = %route.path,
                upstream = %route.upstream,
                encoding = %route.encoding,
                "Route registered"
            );
            router = router.route(&declared.router_path(), handler.route_layer(middleware));
        }

        router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    fn route_middleware(route: &RouteConfig, factory: &ProxyFactory) -> Option<ProxyMiddleware> {
        let registrable = if route.path.starts_with('/') {
            check_route_path(&route.path)
        } else {
            Err("must start with '/'".to_string())
        };
        if let Err(e) = registrable {
            tracing::error!(path = %route.path, error = %e, "Skipping route");
            return None;
        }
        match route.encoding() {
            Ok(encoding) => Some(factory.proxy_with_encoding(&route.upstream, encoding)),
            Err(e) => {
                tracing::error!(path = %route.path, error = %e, "Skipping route");
                None
            }
        }
    }

    /// The assembled router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.host,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
