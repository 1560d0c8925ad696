//! Proxy diagnostics.
//!
//! # Responsibilities
//! - Define the events the forwarder reports
//! - Route them to `tracing` in production
//! - Record them in memory for tests
//!
//! # Design Decisions
//! - Injected into the forwarder so assertions do not depend on a global subscriber
//! - A missing POST/PUT body and an unresolved placeholder are warnings, never errors

use axum::http::{Method, StatusCode};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::proxy::error::UpstreamErrorKind;

/// Something worth reporting about one forwarded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The outbound descriptor is built and about to be sent.
    Forwarding {
        method: Method,
        url: String,
        json: bool,
        has_body: bool,
    },
    /// A POST or PUT carried no body; the request proceeds without one.
    MissingBody { method: Method, url: String },
    /// A template placeholder had no captured value and was sent literally.
    UnresolvedPlaceholder { template: String, name: String },
    /// The upstream answered and the response was relayed.
    Relayed {
        method: Method,
        url: String,
        status: StatusCode,
        elapsed: Duration,
    },
    /// The outbound call failed; `status` is what the caller receives.
    UpstreamFailed {
        method: Method,
        url: String,
        status: StatusCode,
        kind: UpstreamErrorKind,
        reason: String,
    },
}

/// Sink for [`Diagnostic`] events.
pub trait Diagnostics: Send + Sync + fmt::Debug {
    fn record(&self, event: Diagnostic);
}

/// Emits every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::Forwarding {
                method,
                url,
                json,
                has_body,
            } => {
                tracing::debug!(method = %method, url = %url, json, has_body, "Proxying request");
            }
            Diagnostic::MissingBody { method, url } => {
                tracing::warn!(method = %method, url = %url, "Sending PUT or POST but no request body found");
            }
            Diagnostic::UnresolvedPlaceholder { template, name } => {
                tracing::warn!(template = %template, placeholder = %name, "No route parameter for placeholder, sending it literally");
            }
            Diagnostic::Relayed {
                method,
                url,
                status,
                elapsed,
            } => {
                tracing::debug!(method = %method, url = %url, status = %status, elapsed = ?elapsed, "Upstream response relayed");
            }
            Diagnostic::UpstreamFailed {
                method,
                url,
                status,
                kind,
                reason,
            } => {
                tracing::error!(method = %method, url = %url, status = %status, kind = %kind, reason = %reason, "Upstream error");
            }
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn missing_body_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Diagnostic::MissingBody { .. }))
            .count()
    }

    /// Placeholder names reported as unresolved.
    pub fn unresolved(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Diagnostic::UnresolvedPlaceholder { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&self, event: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
