//! Request forwarding.
//!
//! # Responsibilities
//! - Build the outbound [`RequestDescriptor`] from the inbound request
//! - Execute it through the [`Transport`] under the configured deadline
//! - Write the upstream answer, or the failure status, onto the context
//!
//! # Design Decisions
//! - Exactly one suspension point per request: the transport call
//! - Headers and query are copied verbatim; nothing is sanitized
//! - A missing POST/PUT body is reported, never fatal
//! - Every failure becomes a status on the response; nothing escapes

use axum::http::Method;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ProxyConfig;
use crate::observability::diagnostics::{Diagnostic, Diagnostics};
use crate::observability::metrics;
use crate::proxy::context::{Context, Flow, InboundRequest, InboundResponse};
use crate::proxy::descriptor::{Encoding, Payload, RequestDescriptor, ResponseDescriptor};
use crate::proxy::error::UpstreamError;
use crate::proxy::transport::Transport;
use crate::routing::PathTemplate;

/// Where one route sends its requests, fixed when the route is declared.
#[derive(Debug, Clone)]
pub struct RouteTarget {
    template: PathTemplate,
    parametric: bool,
    encoding: Option<Encoding>,
}

impl RouteTarget {
    pub fn new(template: &str, encoding: Option<Encoding>) -> Self {
        let template = PathTemplate::parse(template);
        let parametric = template.is_parametric();
        Self {
            template,
            parametric,
            encoding,
        }
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Path on the upstream for `request`.
    fn target_path(&self, request: &InboundRequest) -> String {
        if self.parametric {
            self.template.resolve(&request.params)
        } else if !self.template.is_empty() {
            self.template.as_str().to_string()
        } else {
            request.path.clone()
        }
    }
}

/// Translates inbound requests into upstream calls and back.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    config: Arc<ProxyConfig>,
    transport: Arc<dyn Transport>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl RequestForwarder {
    pub fn new(
        config: Arc<ProxyConfig>,
        transport: Arc<dyn Transport>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            config,
            transport,
            diagnostics,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Build the outbound descriptor for `request` on `target`.
    pub fn describe(&self, request: &InboundRequest, target: &RouteTarget) -> RequestDescriptor {
        if target.parametric {
            for name in target.template.unresolved(&request.params) {
                self.diagnostics.record(Diagnostic::UnresolvedPlaceholder {
                    template: target.template.to_string(),
                    name: name.to_string(),
                });
            }
        }

        let url = format!("{}{}", self.config.host, target.target_path(request));

        let mut descriptor = RequestDescriptor {
            method: request.method.clone(),
            url,
            headers: request.headers.clone(),
            query: request.query.clone(),
            body: None,
            encoding: target.encoding,
            json: false,
        };

        if descriptor.method == Method::POST || descriptor.method == Method::PUT {
            match &request.body {
                Some(body) => descriptor.body = Some(body.clone()),
                None => self.diagnostics.record(Diagnostic::MissingBody {
                    method: descriptor.method.clone(),
                    url: descriptor.url.clone(),
                }),
            }

            if request.is_json() {
                descriptor.json = true;
            }
        }

        descriptor
    }

    /// Forward the context's request and populate its response.
    ///
    /// Returns [`Flow::Continue`] when the upstream answered with a 2xx and
    /// [`Flow::Halt`] otherwise.
    pub async fn forward(&self, ctx: &mut Context, target: &RouteTarget) -> Flow {
        let descriptor = self.describe(&ctx.request, target);
        let method = descriptor.method.clone();
        let url = descriptor.url.clone();

        self.diagnostics.record(Diagnostic::Forwarding {
            method: method.clone(),
            url: url.clone(),
            json: descriptor.json,
            has_body: descriptor.body.is_some(),
        });

        let start = Instant::now();
        match self.execute(descriptor).await {
            Ok(response) => {
                let status = response.status;
                let head = ctx.request.method == Method::HEAD;
                self.apply_response(&mut ctx.response, response, target.encoding, head);
                metrics::record_forward(&method, status, start);
                self.diagnostics.record(Diagnostic::Relayed {
                    method,
                    url,
                    status,
                    elapsed: start.elapsed(),
                });
                Flow::Continue
            }
            Err(err) => {
                self.apply_failure(&mut ctx.response, &err);
                metrics::record_forward(&method, ctx.response.status, start);
                self.diagnostics.record(Diagnostic::UpstreamFailed {
                    method,
                    url,
                    status: ctx.response.status,
                    kind: err.kind,
                    reason: err.reason,
                });
                Flow::Halt
            }
        }
    }

    async fn execute(&self, descriptor: RequestDescriptor) -> Result<ResponseDescriptor, UpstreamError> {
        let deadline = self.config.timeout();
        match tokio::time::timeout(deadline, self.transport.send(descriptor)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::timeout(deadline)),
        }
    }

    fn apply_response(
        &self,
        response: &mut InboundResponse,
        upstream: ResponseDescriptor,
        encoding: Option<Encoding>,
        head: bool,
    ) {
        response.copy_headers(&upstream.headers);
        response.status = upstream.status;
        response.body = Some(upstream.body);
        response.encoding = encoding;
        response.head = head;
    }

    fn apply_failure(&self, response: &mut InboundResponse, err: &UpstreamError) {
        response.status = err.status_code();
        if self.config.propagate_error_body {
            response.body = Some(Payload::Text(err.reason.clone()));
        }
    }
}
