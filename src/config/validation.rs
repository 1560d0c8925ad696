//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream host is an absolute http URL
//! - Validate value ranges (timeouts > 0)
//! - Detect duplicate or malformed routes, including paths the host
//!   router would refuse to register
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::schema::{ProxyConfig, ServerConfig};
use crate::routing::template::MARKER;
use crate::routing::{ParamMap, PathTemplate};

/// A single semantic problem, tied to the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate the upstream binding on its own.
pub fn validate_proxy(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_proxy(config, "upstream", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a full server configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_proxy(&config.upstream, "upstream", &mut errors);

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);

        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                format!("'{}' must start with '/'", route.path),
            ));
        }

        if let Err(message) = check_route_path(&route.path) {
            errors.push(ValidationError::new(format!("{}.path", field), message));
        }

        // Placeholder names are irrelevant to the host router: "/a/:x" and "/a/:y" collide.
        let declared = PathTemplate::parse(route.path.as_str());
        let anonymous: ParamMap = declared
            .placeholders()
            .map(|name| (name.to_string(), ":".to_string()))
            .collect();
        let shape = declared.resolve(&anonymous);
        if !seen.insert(shape) {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                format!("'{}' is declared more than once", route.path),
            ));
        }

        if !route.upstream.is_empty() && !route.upstream.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.upstream", field),
                format!("'{}' must start with '/'", route.upstream),
            ));
        }

        if let Err(e) = route.encoding() {
            errors.push(ValidationError::new(format!("{}.encoding", field), e.to_string()));
        }

        if let Err(e) = route.method_filter() {
            errors.push(ValidationError::new(format!("{}.methods", field), e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Each placeholder must fill a whole segment, once per path, and no literal
/// segment may start with a capture marker.
pub fn check_route_path(path: &str) -> Result<(), String> {
    let mut names = HashSet::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let parsed = PathTemplate::parse(segment);
        let mut placeholders = parsed.placeholders();
        match (placeholders.next(), placeholders.next()) {
            (Some(name), None) if segment.len() == name.len() + 1 => {
                if !names.insert(name.to_string()) {
                    return Err(format!("placeholder ':{}' is used twice in '{}'", name, path));
                }
            }
            (Some(_), _) => {
                return Err(format!(
                    "segment '{}' of '{}' must be a single placeholder or plain text",
                    segment, path
                ))
            }
            (None, _) if segment.starts_with(MARKER) || segment.starts_with('*') => {
                return Err(format!(
                    "segment '{}' of '{}' cannot start with ':' or '*'",
                    segment, path
                ))
            }
            (None, _) => {}
        }
    }
    Ok(())
}

fn check_proxy(config: &ProxyConfig, prefix: &str, errors: &mut Vec<ValidationError>) {
    let field = format!("{}.host", prefix);
    if config.host.is_empty() {
        errors.push(ValidationError::new(field, "is required"));
    } else {
        match Url::parse(&config.host) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
                field,
                format!("scheme '{}' is not supported, use http", url.scheme()),
            )),
            Ok(url) if url.host_str().is_none() => {
                errors.push(ValidationError::new(field, "must include a host"))
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::new(
                field,
                format!("'{}' is not an absolute URL: {}", config.host, e),
            )),
        }
    }

    if config.timeout_secs == 0 {
        errors.push(ValidationError::new(format!("{}.timeout_secs", prefix), "must be greater than 0"));
    }
    if config.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            format!("{}.connect_timeout_secs", prefix),
            "must be greater than 0",
        ));
    }
    if config.max_body_size == 0 {
        errors.push(ValidationError::new(format!("{}.max_body_size", prefix), "must be greater than 0"));
    }
    if config.max_response_size == 0 {
        errors.push(ValidationError::new(
            format!("{}.max_response_size", prefix),
            "must be greater than 0",
        ));
    }
}
