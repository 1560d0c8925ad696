//! axum integration.
//!
//! # Responsibilities
//! - Build an [`InboundRequest`] from an axum request (params, query, body)
//! - Run the [`ProxyMiddleware`] and continue or stop the pipeline
//! - Hand the relayed response to the next stage through request extensions
//!
//! # Design Decisions
//! - The middleware is a plain [`tower::Layer`], so it composes with any route
//! - "Continue" means calling the inner service exactly once; on failure the
//!   inner service is never called
//! - Only `application/json` bodies are parsed; anything else stays raw bytes

use axum::body::Body;
use axum::extract::{FromRequestParts, Query, RawPathParams, Request};
use axum::http::{header, request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service, ServiceExt};
use tracing::Instrument;

use crate::http::request::RequestIdExt;
use crate::proxy::context::{Context, Flow, InboundRequest, InboundResponse};
use crate::proxy::descriptor::{Payload, QueryMap};
use crate::proxy::factory::ProxyMiddleware;
use crate::routing::ParamMap;

/// The relayed upstream response, available to the stage after the proxy.
#[derive(Debug, Clone)]
pub struct ProxiedResponse(pub InboundResponse);

impl IntoResponse for ProxiedResponse {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Terminal handler for proxied routes: answers with the relayed response.
///
/// Without a proxy layer in front it answers 404.
pub async fn relay(mut request: Request) -> Response {
    match request.extensions_mut().remove::<ProxiedResponse>() {
        Some(proxied) => proxied.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

impl<S> Layer<S> for ProxyMiddleware {
    type Service = ProxyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProxyService {
            middleware: self.clone(),
            inner,
        }
    }
}

/// Service produced by layering a [`ProxyMiddleware`] over `S`.
#[derive(Debug, Clone)]
pub struct ProxyService<S> {
    middleware: ProxyMiddleware,
    inner: S,
}

impl<S> Service<Request> for ProxyService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        // The inner service is driven with `oneshot`, which waits for readiness itself.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let middleware = self.middleware.clone();
        let inner = self.inner.clone();
        let span = tracing::debug_span!(
            "proxy",
            request_id = request.request_id().unwrap_or("-"),
            template = %middleware.target().template(),
        );

        let fut = async move {
            let (mut parts, body) = request.into_parts();
            let inbound = match inbound_request(&mut parts, body, middleware.max_body_size()).await {
                Ok(inbound) => inbound,
                Err(rejection) => return Ok(rejection),
            };

            let mut ctx = Context::new(inbound);
            match middleware.handle(&mut ctx).await {
                Flow::Continue => {
                    let mut request = Request::from_parts(parts, Body::empty());
                    request
                        .extensions_mut()
                        .insert(ProxiedResponse(ctx.response));
                    inner.oneshot(request).await
                }
                Flow::Halt => Ok(ctx.response.into_response()),
            }
        };
        Box::pin(fut.instrument(span))
    }
}

/// Collect what the forwarder needs from an axum request.
///
/// Fails with a ready-made response when the query or body cannot be parsed.
pub async fn inbound_request(
    parts: &mut Parts,
    body: Body,
    max_body_size: usize,
) -> Result<InboundRequest, Response> {
    // Routes without captures have no params to extract.
    let params: ParamMap = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(raw) => raw
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(_) => ParamMap::new(),
    };

    let Query(query) = Query::<QueryMap>::try_from_uri(&parts.uri)
        .map_err(IntoResponse::into_response)?;

    let declared = parts.headers.contains_key(header::CONTENT_LENGTH)
        || parts.headers.contains_key(header::TRANSFER_ENCODING);

    let bytes = axum::body::to_bytes(body, max_body_size).await.map_err(|e| {
        tracing::warn!(error = %e, limit = max_body_size, "Failed to buffer request body");
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body could not be read").into_response()
    })?;

    let mut inbound = InboundRequest::new(parts.method.clone(), parts.uri.path());
    inbound.headers = parts.headers.clone();
    inbound.query = query;
    inbound.params = params;

    inbound.body = if bytes.is_empty() && !declared {
        None
    } else if inbound.is_json() && !bytes.is_empty() {
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(Payload::Json(value)),
            Err(e) => {
                return Err((StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)).into_response())
            }
        }
    } else {
        Some(Payload::Bytes(bytes))
    };

    Ok(inbound)
}
