//! Executes pipeline decisions and shapes the client response.
//!
//! # Responsibilities
//! - Redirects, health answers and blank stubs are built locally
//! - Forwards go through the pooled upstream client; the backend response
//!   is relayed as-is (streamed)
//! - Asset reads go through the asset store
//! - A freshly issued token is persisted with `Set-Cookie` on whatever
//!   response the request ends with
//!
//! # Design Decisions
//! - Upstream and asset I/O failures become the generic 500; detail is logged
//! - A missing asset is a plain 404, like any static file server would answer

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::assets::AssetError;
use crate::dispatch::{Action, RequestContext, Target};
use crate::error::{generic_failure, EdgeError};
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn execute(state: &AppState, action: Action, ctx: &RequestContext) -> Response {
    let result = match action {
        Action::Health => Ok(health()),
        Action::Redirect {
            status,
            location,
            reason,
        } => Ok(redirect(ctx, status, &location, reason)),
        Action::Forward { target } => forward(state, target, ctx).await,
        Action::Serve {
            logical_path,
            content_type,
        } => serve_asset(state, &logical_path, content_type).await,
        Action::Blank { content_type } => Ok(blank(content_type)),
    };

    match result {
        Ok(mut response) => {
            write_back_token(state, ctx, response.headers_mut());
            response
        }
        Err(err) => err.into_response(),
    }
}

fn health() -> Response {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    (
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        now.to_string(),
    )
        .into_response()
}

fn redirect(
    ctx: &RequestContext,
    status: StatusCode,
    location: &str,
    reason: &'static str,
) -> Response {
    let Ok(value) = HeaderValue::from_str(location) else {
        tracing::error!(
            request_id = ?ctx.request_id,
            location = %location,
            "Redirect location is not a valid header value"
        );
        return generic_failure();
    };
    tracing::debug!(
        request_id = ?ctx.request_id,
        status = status.as_u16(),
        location = %location,
        reason,
        "Redirecting"
    );
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response.headers_mut().insert(header::LOCATION, value);
    response
}

async fn forward(
    state: &AppState,
    target: Target,
    ctx: &RequestContext,
) -> Result<Response, EdgeError> {
    let base = match target {
        Target::Dynamic => None,
        Target::Rendering => state.mini.as_ref(),
    };
    state.upstream.forward(base, ctx).await.map_err(|err| {
        metrics::record_upstream_failure(target.as_str());
        tracing::error!(
            request_id = ?ctx.request_id,
            target = target.as_str(),
            error = %err,
            "Upstream forward failed"
        );
        EdgeError::from(err)
    })
}

async fn serve_asset(
    state: &AppState,
    logical_path: &str,
    content_type: &'static str,
) -> Result<Response, EdgeError> {
    match state.assets.read(logical_path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response()),
        Err(AssetError::NotFound(path)) | Err(AssetError::Forbidden(path)) => {
            tracing::debug!(path = %path, "Asset not served");
            Ok(StatusCode::NOT_FOUND.into_response())
        }
        Err(err) => Err(err.into()),
    }
}

fn blank(content_type: &'static str) -> Response {
    ([(header::CONTENT_TYPE, content_type)], "").into_response()
}

fn write_back_token(state: &AppState, ctx: &RequestContext, headers: &mut HeaderMap) {
    let (Some(token), Some(site)) = (&ctx.access_token, &ctx.site) else {
        return;
    };
    state.dispatcher.tokens().write_back(token, site, headers);
}
