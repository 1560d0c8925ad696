//! Outbound request and upstream response descriptors.
//!
//! # Responsibilities
//! - Describe one outbound call (method, url, headers, query, body, encoding, json mode)
//! - Describe one upstream result (status, headers, body)
//! - Convert bodies between wire bytes and [`Payload`] under a given [`Encoding`]
//!
//! # Design Decisions
//! - Descriptors are built fresh per request and consumed once
//! - Body presence is an `Option`, never inferred from emptiness
//! - `encoding: None` means raw bytes end to end

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parsed query parameters. Ordered so outbound query strings are deterministic.
pub type QueryMap = BTreeMap<String, String>;

pub const APPLICATION_JSON: &str = "application/json";

/// Character encoding used to turn upstream bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encoding '{0}' (expected utf8, latin1 or none)")]
pub struct UnknownEncoding(pub String);

impl Encoding {
    /// Parse a configured encoding name, where `none` selects raw bytes.
    pub fn parse_optional(name: &str) -> Result<Option<Self>, UnknownEncoding> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "raw" => Ok(None),
            other => other.parse().map(Some),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    pub fn encode(self, text: &str) -> Bytes {
        match self {
            Encoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect::<Vec<u8>>()
                .into(),
        }
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Utf8 => f.write_str("utf8"),
            Encoding::Latin1 => f.write_str("latin1"),
        }
    }
}

/// An opaque message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Structured JSON, serialized on the wire.
    Json(serde_json::Value),
    /// Text decoded with the route's encoding.
    Text(String),
    /// Raw bytes, passed through untouched.
    Bytes(Bytes),
}

impl Payload {
    /// Interpret upstream bytes the way the route asked for.
    ///
    /// JSON mode parses structured bodies where possible and falls back to
    /// text when the upstream sent something else.
    pub fn decode(bytes: Bytes, encoding: Option<Encoding>, json: bool) -> Self {
        if json && !bytes.is_empty() {
            if let Ok(value) = serde_json::from_slice(&bytes) {
                return Payload::Json(value);
            }
        }
        match encoding {
            Some(encoding) => Payload::Text(encoding.decode(&bytes)),
            None => Payload::Bytes(bytes),
        }
    }

    /// Wire bytes for this payload.
    pub fn to_bytes(&self, encoding: Option<Encoding>) -> Bytes {
        match self {
            Payload::Json(value) => Bytes::from(value.to_string()),
            Payload::Text(text) => encoding.unwrap_or_default().encode(text),
            Payload::Bytes(bytes) => bytes.clone(),
        }
    }

    /// Content type assumed when nothing upstream declared one.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Payload::Json(_) => APPLICATION_JSON,
            Payload::Text(_) => "text/plain; charset=utf-8",
            Payload::Bytes(_) => "application/octet-stream",
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Everything the transport needs to perform one outbound call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute URL: configured host followed by the resolved path.
    pub url: String,
    pub headers: HeaderMap,
    pub query: QueryMap,
    pub body: Option<Payload>,
    pub encoding: Option<Encoding>,
    /// Serialize the body and parse the reply as structured JSON.
    pub json: bool,
}

/// The upstream's answer to a [`RequestDescriptor`].
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Payload,
}
