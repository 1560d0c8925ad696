//! Request-forwarding engine.
//!
//! # Data Flow
//! ```text
//! ProxyFactory (factory.rs, binds ProxyConfig)
//!     → proxy(template, encoding) → ProxyMiddleware (one per route)
//!
//! Per request:
//!     axum request
//!     → layer.rs (params, query, body → InboundRequest)
//!     → forwarder.rs (RequestDescriptor, template resolved if parametric)
//!     → transport.rs (hyper client, deadline)
//!     → forwarder.rs (ResponseDescriptor → InboundResponse, or failure status)
//!     → Flow::Continue → next stage (relay) / Flow::Halt → error response
//! ```
//!
//! # Design Decisions
//! - One outbound call per inbound request: no retries, no pooling policy
//! - Config, transport, and diagnostics are shared read-only via Arc
//! - Dropping the inbound future drops the outbound call with it

pub mod context;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod forwarder;
pub mod layer;
pub mod transport;

pub use context::{Context, Flow, InboundRequest, InboundResponse};
pub use descriptor::{Encoding, Payload, QueryMap, RequestDescriptor, ResponseDescriptor};
pub use error::{UpstreamError, UpstreamErrorKind};
pub use factory::{ProxyFactory, ProxyMiddleware};
pub use forwarder::{RequestForwarder, RouteTarget};
pub use layer::{relay, ProxiedResponse, ProxyService};
pub use transport::{HttpTransport, Transport};
