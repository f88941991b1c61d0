//! Forwarding client for the dynamic and mini backends.
//!
//! # Responsibilities
//! - Build the upstream URL (original path/query, pipeline token appended)
//! - Keep pooled keep-alive connections per backend, one pool for plain
//!   HTTP and one for TLS
//! - Bound every call by the upstream timeout
//! - Relay status, headers and body unchanged (body streamed, never buffered)
//!
//! # Design Decisions
//! - Non-2xx upstream statuses are relayed, not treated as failures
//! - No retries; failures surface as [`ForwardError`]
//! - Redirects from upstream are relayed to the client, never followed
//! - Dropping the returned future (client went away) cancels the upstream call

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::BoxError;
use futures_util::{stream, StreamExt};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::config::UpstreamConfig;
use crate::dispatch::RequestContext;
use crate::upstream::headers::{
    insert_lossy, strip_hop_by_hop, X_CRAWL_MODE, X_FORWARDED_HOST, X_FORWARDED_PROTO,
};

const TOKEN_PARAM: &str = "accessToken";

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream URL {url}: {source}")]
    InvalidTarget {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported upstream scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("upstream {url} failed: {source}")]
    Plain {
        url: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {url} failed: {source}")]
    Secure {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Parse a configured backend base URL.
pub fn parse_target(raw: &str) -> Result<Url, ForwardError> {
    let url = Url::parse(raw).map_err(|source| ForwardError::InvalidTarget {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ForwardError::UnsupportedScheme(other.to_string())),
    }
}

/// Pooled HTTP client relaying requests to backend services.
#[derive(Debug, Clone)]
pub struct ForwardingClient {
    plain: Client<HttpConnector, Body>,
    secure: reqwest::Client,
    default_target: Url,
    timeout: Duration,
}

impl ForwardingClient {
    /// Create a client whose default target is the deployment's dynamic backend.
    pub fn new(default_target: Url, config: &UpstreamConfig) -> Result<Self, ForwardError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let idle = Duration::from_secs(config.pool_idle_timeout_secs);

        let mut connector = HttpConnector::new();
        connector.set_keepalive(Some(Duration::from_secs(60)));
        connector.set_nodelay(true);
        let plain = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(idle)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        let secure = reqwest::Client::builder()
            .https_only(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .pool_idle_timeout(idle)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(ForwardError::Build)?;

        Ok(Self {
            plain,
            secure,
            default_target,
            timeout,
        })
    }

    pub fn default_target(&self) -> &Url {
        &self.default_target
    }

    /// Forward the request to `target`, or to the dynamic backend when `None`.
    pub async fn forward(
        &self,
        target: Option<&Url>,
        ctx: &RequestContext,
    ) -> Result<Response<Body>, ForwardError> {
        let base = target.unwrap_or(&self.default_target);
        let url = upstream_url(base, ctx);
        let headers = upstream_headers(ctx);
        let started = Instant::now();

        let result = match url.scheme() {
            "http" => self.forward_plain(&url, ctx, headers).await,
            "https" => self.forward_secure(&url, ctx, headers).await,
            other => Err(ForwardError::UnsupportedScheme(other.to_string())),
        };

        let mut response = result?;
        strip_hop_by_hop(response.headers_mut());

        tracing::debug!(
            request_id = ?ctx.request_id,
            upstream = %redact(&url),
            status = %response.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );
        Ok(response)
    }

    async fn forward_plain(
        &self,
        url: &Url,
        ctx: &RequestContext,
        headers: HeaderMap,
    ) -> Result<Response<Body>, ForwardError> {
        let mut builder = Request::builder().method(ctx.method.clone()).uri(url.as_str());
        if let Some(h) = builder.headers_mut() {
            h.extend(headers);
        }
        let request = builder.body(Body::empty())?;

        // One deadline covers response headers and the relayed body.
        let deadline = tokio::time::Instant::now() + self.timeout;
        match tokio::time::timeout_at(deadline, self.plain.request(request)).await {
            Err(_) => Err(ForwardError::Timeout {
                url: redact(url),
                timeout: self.timeout,
            }),
            Ok(Err(source)) => Err(ForwardError::Plain {
                url: redact(url),
                source,
            }),
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                let body = body_with_deadline(Body::new(body), deadline, redact(url), self.timeout);
                Ok(Response::from_parts(parts, body))
            }
        }
    }

    async fn forward_secure(
        &self,
        url: &Url,
        ctx: &RequestContext,
        headers: HeaderMap,
    ) -> Result<Response<Body>, ForwardError> {
        let response = self
            .secure
            .request(ctx.method.clone(), url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|source| {
                if source.is_timeout() {
                    ForwardError::Timeout {
                        url: redact(url),
                        timeout: self.timeout,
                    }
                } else {
                    ForwardError::Secure {
                        url: redact(url),
                        source,
                    }
                }
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;
        Ok(relayed)
    }
}

/// Relay `body` until `deadline`; a body still streaming at the deadline
/// ends with [`ForwardError::Timeout`], which aborts the client response.
fn body_with_deadline(
    body: Body,
    deadline: tokio::time::Instant,
    url: String,
    timeout: Duration,
) -> Body {
    let frames = stream::unfold(Some(body.into_data_stream()), move |state| {
        let url = url.clone();
        async move {
            let mut frames = state?;
            match tokio::time::timeout_at(deadline, frames.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(frames))),
                Ok(Some(Err(err))) => Some((Err(BoxError::from(err)), None)),
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!(upstream = %url, ?timeout, "Upstream body exceeded deadline");
                    Some((Err(BoxError::from(ForwardError::Timeout { url, timeout })), None))
                }
            }
        }
    });
    Body::from_stream(frames)
}

/// Upstream URL: backend base + original path and query, with the
/// pipeline's token replacing any `accessToken` the client sent.
pub fn upstream_url(base: &Url, ctx: &RequestContext) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, ctx.path));
    url.set_query(forwarded_query(ctx.query.as_deref()).as_deref());
    if let Some(token) = &ctx.access_token {
        url.query_pairs_mut().append_pair(TOKEN_PARAM, token.as_str());
    }
    url
}

fn forwarded_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    let carries_token = form_urlencoded::parse(query.as_bytes()).any(|(k, _)| k == TOKEN_PARAM);
    if !carries_token {
        return Some(query.to_string());
    }

    let kept: Vec<_> = form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k != TOKEN_PARAM)
        .collect();
    if kept.is_empty() {
        return None;
    }
    Some(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(kept)
            .finish(),
    )
}

fn upstream_headers(ctx: &RequestContext) -> HeaderMap {
    let mut headers = ctx.passthrough.clone();
    insert_lossy(&mut headers, X_FORWARDED_HOST, &ctx.host);
    insert_lossy(
        &mut headers,
        X_FORWARDED_PROTO,
        if ctx.secure { "https" } else { "http" },
    );
    if let Some(id) = &ctx.request_id {
        insert_lossy(&mut headers, "x-request-id", id);
    }
    if ctx.crawl_mode {
        insert_lossy(&mut headers, X_CRAWL_MODE, "1");
    }
    headers
}

/// URL without its query, safe to log (the query carries the token).
fn redact(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    )
}
