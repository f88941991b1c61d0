//! Edge-level error type and the client-facing failure payload.
//!
//! Every failure a client can see is the same generic 500 JSON body; the
//! detail goes to the log only.

use std::any::Any;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::sites::RegistryError;
use crate::upstream::ForwardError;

/// User-facing message for every internal failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Some exception occurred at server. Please try again.";

#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("site registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("identity endpoint failure: {0}")]
    Identity(#[from] IdentityError),

    #[error("upstream forward failure: {0}")]
    Upstream(#[from] ForwardError),

    #[error("asset store failure: {0}")]
    Asset(#[from] AssetError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(error = %self, "Request failed");
        generic_failure()
    }
}

/// The fixed 500 response shown to clients.
pub fn generic_failure() -> Response<Body> {
    let body = serde_json::json!({ "message": GENERIC_FAILURE_MESSAGE }).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Converts a handler panic into the generic failure.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Request handler panicked");
    generic_failure()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failures_render_the_generic_payload() {
        let response = EdgeError::Identity(IdentityError::EmptyToken).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], GENERIC_FAILURE_MESSAGE);
        assert!(!String::from_utf8_lossy(&body).contains("token"));
    }

    #[test]
    fn panics_become_server_errors() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
