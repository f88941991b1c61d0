//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Request deadline must outlast the identity call plus the forward
//! - Check URLs are absolute http(s)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Hostname uniqueness is checked when the site registry is built

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
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

/// Check an [`EdgeConfig`] for semantic errors.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    check_url(&mut errors, "upstreams.dynamic_url", &config.dynamic_url());
    if let Some(mini) = &config.upstreams.mini_url {
        check_url(&mut errors, "upstreams.mini_url", mini);
    }
    check_url(&mut errors, "identity.base_url", &config.identity_url());
    check_url(&mut errors, "routing.default_site_url", &config.routing.default_site_url);

    for (field, value) in [
        ("upstreams.timeout_secs", config.upstreams.timeout_secs),
        ("identity.timeout_secs", config.identity.timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    let per_call = config
        .identity
        .timeout_secs
        .saturating_add(config.upstreams.timeout_secs);
    if config.timeouts.request_secs > 0 && config.timeouts.request_secs <= per_call {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed identity.timeout_secs + upstreams.timeout_secs ({})",
                per_call
            ),
        ));
    }

    if config.cookie.name.is_empty() {
        errors.push(ValidationError::new("cookie.name", "must not be empty"));
    }
    if config.cookie.max_age_secs <= 0 {
        errors.push(ValidationError::new("cookie.max_age_secs", "must be greater than 0"));
    }

    if !config.routing.health_path.starts_with('/') {
        errors.push(ValidationError::new("routing.health_path", "must start with '/'"));
    }

    for (from, to) in &config.routing.legacy_redirects {
        if !from.starts_with('/') {
            errors.push(ValidationError::new(
                "routing.legacy_redirects",
                format!("source path must start with '/': {}", from),
            ));
        }
        if to.is_empty() {
            errors.push(ValidationError::new(
                "routing.legacy_redirects",
                format!("empty target for {}", from),
            ));
        }
    }

    for (alias, target) in &config.routing.host_aliases {
        if alias.is_empty() || target.is_empty() || alias == target {
            errors.push(ValidationError::new(
                "routing.host_aliases",
                format!("invalid alias {} -> {}", alias, target),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push(ValidationError::new(field, format!("not an http(s) URL: {}", value))),
        Err(e) => errors.push(ValidationError::new(field, format!("{}: {}", value, e))),
    }
}
