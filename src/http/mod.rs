//! Standalone HTTP server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, one route per RouteConfig)
//!     → request.rs (request ID)
//!     → proxy layer (forward to upstream)
//!     → relay handler → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
