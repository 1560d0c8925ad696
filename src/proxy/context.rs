//! Per-request context shared with the host pipeline.
//!
//! # Responsibilities
//! - Expose what the host knows about the inbound request (method, path,
//!   headers, query, captured params, parsed body)
//! - Hold the response being built for the original caller
//! - Tell the host whether to continue the pipeline
//!
//! # Design Decisions
//! - Header copies overwrite by name instead of appending duplicates
//! - Framing headers are recomputed for the buffered body on the way out,
//!   except the declared length of a HEAD answer
//! - Text goes back out in the encoding it was decoded with

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::descriptor::{Encoding, Payload, QueryMap, APPLICATION_JSON};
use crate::routing::ParamMap;

/// What the host pipeline should do after the middleware ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// The response is populated; run the next stage exactly once.
    Continue,
    /// The response carries an error status; stop here.
    Halt,
}

/// The request received from the original caller.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    pub headers: HeaderMap,
    pub query: QueryMap,
    /// Parameters captured by the host router.
    pub params: ParamMap,
    /// Parsed body, `None` when the caller sent none.
    pub body: Option<Payload>,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: QueryMap::new(),
            params: ParamMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }

    /// Media type of the body, without parameters such as `charset`.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim())
    }

    /// True when the caller declared exactly `application/json`.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .is_some_and(|t| t.eq_ignore_ascii_case(APPLICATION_JSON))
    }
}

/// The response being built for the original caller.
#[derive(Debug, Clone)]
pub struct InboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Payload>,
    /// Encoding used to write text bodies; UTF-8 when unset.
    pub encoding: Option<Encoding>,
    /// Answer to a HEAD request: the upstream's `content-length` is kept.
    pub head: bool,
}

impl Default for InboundResponse {
    /// Nothing written yet: the host answers 404.
    fn default() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: HeaderMap::new(),
            body: None,
            encoding: None,
            head: false,
        }
    }
}

impl InboundResponse {
    /// Copy `headers` onto the response. A name already present is replaced
    /// by the incoming values rather than duplicated.
    pub fn copy_headers(&mut self, headers: &HeaderMap) {
        for name in headers.keys() {
            self.headers.remove(name);
            for value in headers.get_all(name) {
                self.headers.append(name.clone(), value.clone());
            }
        }
    }
}

impl IntoResponse for InboundResponse {
    fn into_response(self) -> Response {
        let InboundResponse {
            status,
            mut headers,
            body,
            encoding,
            head,
        } = self;

        // The body is fully buffered; let the server frame it.
        if !head {
            headers.remove(header::CONTENT_LENGTH);
        }
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONNECTION);

        let body = match body {
            Some(payload) => {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(payload.default_content_type()),
                    );
                }
                Body::from(payload.to_bytes(encoding))
            }
            None => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

/// Request and response for one pass through the pipeline.
#[derive(Debug, Clone)]
pub struct Context {
    pub request: InboundRequest,
    pub response: InboundResponse,
}

impl Context {
    pub fn new(request: InboundRequest) -> Self {
        Self {
            request,
            response: InboundResponse::default(),
        }
    }
}
