//! Upstream failure type.

use axum::http::StatusCode;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::proxy::descriptor::Payload;

/// Where an outbound call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// The upstream answered with a non-2xx status.
    Status,
    /// Connecting or speaking HTTP to the upstream failed.
    Transport,
    /// The upstream did not answer before the deadline.
    Timeout,
    /// The descriptor could not be turned into a valid request.
    Request,
    /// The response body could not be read.
    Body,
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpstreamErrorKind::Status => "status",
            UpstreamErrorKind::Transport => "transport",
            UpstreamErrorKind::Timeout => "timeout",
            UpstreamErrorKind::Request => "request",
            UpstreamErrorKind::Body => "body",
        };
        f.write_str(name)
    }
}

/// A failed outbound call, carrying the status to report when one exists.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub status: Option<StatusCode>,
    pub reason: String,
}

impl UpstreamError {
    /// Non-2xx upstream answer. The reason is the upstream body when it has
    /// one, otherwise the canonical status text.
    pub fn status(status: StatusCode, body: &Payload) -> Self {
        let text = match body {
            Payload::Json(value) => value.to_string(),
            Payload::Text(text) => text.clone(),
            Payload::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        };
        let reason = if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("upstream error")
                .to_string()
        } else {
            text
        };
        Self {
            kind: UpstreamErrorKind::Status,
            status: Some(status),
            reason,
        }
    }

    pub fn transport(err: impl StdError) -> Self {
        Self {
            kind: UpstreamErrorKind::Transport,
            status: None,
            reason: error_chain(&err),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self {
            kind: UpstreamErrorKind::Timeout,
            status: Some(StatusCode::GATEWAY_TIMEOUT),
            reason: format!("upstream did not respond within {}s", after.as_secs_f64()),
        }
    }

    pub fn request(err: impl StdError) -> Self {
        Self {
            kind: UpstreamErrorKind::Request,
            status: None,
            reason: error_chain(&err),
        }
    }

    pub fn body(err: impl StdError) -> Self {
        Self {
            kind: UpstreamErrorKind::Body,
            status: None,
            reason: error_chain(&err),
        }
    }

    /// Status reported to the original caller.
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_reason_from_body() {
        let err = UpstreamError::status(StatusCode::NOT_FOUND, &Payload::Text("no such hobbit".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "no such hobbit");

        let err = UpstreamError::status(StatusCode::CONFLICT, &Payload::Json(json!({"e": 1})));
        assert_eq!(err.reason, r#"{"e":1}"#);
    }

    #[test]
    fn test_status_reason_falls_back_to_canonical() {
        let err = UpstreamError::status(StatusCode::INTERNAL_SERVER_ERROR, &Payload::Text(String::new()));
        assert_eq!(err.reason, "Internal Server Error");
    }

    #[test]
    fn test_missing_status_defaults_to_500() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = UpstreamError::transport(io);
        assert_eq!(err.status, None);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, UpstreamErrorKind::Transport);
    }

    #[test]
    fn test_timeout_carries_504() {
        let err = UpstreamError::timeout(Duration::from_secs(2));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(err.reason.contains("2s"));
    }
}
