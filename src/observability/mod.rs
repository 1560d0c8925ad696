//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarder produces:
//!     → diagnostics.rs (typed proxy events, injected per factory)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs (tracing subscriber, stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → RecordingDiagnostics in tests
//! ```
//!
//! # Design Decisions
//! - Diagnostics are a collaborator passed in, never a global
//! - Request ID flows through the server's tracing spans
//! - Metrics are cheap (atomic increments) and no-ops without a recorder

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use diagnostics::{Diagnostic, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
