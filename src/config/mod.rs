//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → ProxyConfig shared via Arc by every proxied route
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields except the upstream host have defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::RouteConfig;
pub use schema::ServerConfig;
pub use schema::TimeoutConfig;
