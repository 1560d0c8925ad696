//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration ("/haveparams/:hurp")
//!     → template.rs (parse once into literal / placeholder segments)
//!     → host router path ("/haveparams/{hurp}") at startup
//!
//! Per request:
//!     captured params {hurp: "bar"}
//!     → template.rs (substitute into upstream template)
//!     → resolved path "/haveparams/bar"
//! ```
//!
//! # Design Decisions
//! - Templates are parsed when a route is declared, never per request
//! - Substitution, not matching: the resolved path is not validated
//! - Unknown placeholders pass through literally

pub mod template;

pub use template::{resolve, ParamMap, PathTemplate};
