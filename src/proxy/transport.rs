//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Turn a [`RequestDescriptor`] into a wire request
//! - Perform the call and buffer the upstream body
//! - Map non-2xx answers and I/O failures to [`UpstreamError`]
//!
//! # Design Decisions
//! - `Transport` returns a boxed future so it can live behind `Arc<dyn Transport>`
//! - Framing headers from the inbound request are dropped; the client sets
//!   them for the body it actually sends
//! - Plain HTTP only: the connector carries no TLS
//! - Redirects are not followed; a 3xx answer takes the failure path

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Uri};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::config::ProxyConfig;
use crate::proxy::descriptor::{Payload, RequestDescriptor, ResponseDescriptor, APPLICATION_JSON};
use crate::proxy::error::UpstreamError;

/// Performs outbound calls on behalf of the forwarder.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(
        &self,
        request: RequestDescriptor,
    ) -> BoxFuture<'_, Result<ResponseDescriptor, UpstreamError>>;
}

/// [`Transport`] backed by the hyper client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    max_response_size: usize,
}

impl HttpTransport {
    pub fn new(config: &ProxyConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            max_response_size: config.max_response_size,
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        descriptor: RequestDescriptor,
    ) -> BoxFuture<'_, Result<ResponseDescriptor, UpstreamError>> {
        Box::pin(async move {
            let request = build_request(&descriptor)?;

            let response = self
                .client
                .request(request)
                .await
                .map_err(UpstreamError::transport)?;

            let (parts, body) = response.into_parts();
            let bytes = axum::body::to_bytes(Body::new(body), self.max_response_size)
                .await
                .map_err(UpstreamError::body)?;
            let payload = Payload::decode(bytes, descriptor.encoding, descriptor.json);

            if !parts.status.is_success() {
                return Err(UpstreamError::status(parts.status, &payload));
            }

            Ok(ResponseDescriptor {
                status: parts.status,
                headers: parts.headers,
                body: payload,
            })
        })
    }
}

/// Build the wire request for `descriptor`.
///
/// The query map is appended to whatever query the URL already carries.
pub fn build_request(descriptor: &RequestDescriptor) -> Result<Request<Body>, UpstreamError> {
    let mut url = Url::parse(&descriptor.url).map_err(UpstreamError::request)?;
    if !descriptor.query.is_empty() {
        url.query_pairs_mut().extend_pairs(descriptor.query.iter());
    }
    let uri: Uri = url.as_str().parse().map_err(UpstreamError::request)?;

    let mut headers = descriptor.headers.clone();
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);

    if descriptor.json {
        headers
            .entry(header::ACCEPT)
            .or_insert(HeaderValue::from_static(APPLICATION_JSON));
    }

    let body = match &descriptor.body {
        Some(payload) => {
            if descriptor.json {
                headers
                    .entry(header::CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(APPLICATION_JSON));
            }
            Body::from(payload.to_bytes(descriptor.encoding))
        }
        None => Body::empty(),
    };

    let mut request = Request::builder()
        .method(descriptor.method.clone())
        .uri(uri)
        .body(body)
        .map_err(UpstreamError::request)?;
    *request.headers_mut() = headers;

    Ok(request)
}
