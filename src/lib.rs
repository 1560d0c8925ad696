//! Route-level HTTP forwarding middleware for axum.
//!
//! A [`ProxyFactory`] binds an upstream host once and produces one
//! [`ProxyMiddleware`] per route. Each middleware optionally rewrites the
//! outbound path from the route's captured parameters, forwards method,
//! headers, query, and body, and relays the upstream status, headers, and
//! body back to the caller.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::{ProxyConfig, RouteConfig, ServerConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{relay, Encoding, Flow, ProxyFactory, ProxyMiddleware};
pub use routing::{resolve, ParamMap, PathTemplate};
