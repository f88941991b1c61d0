//! Per-request state owned by the dispatch pipeline.

use std::sync::Arc;

use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, Method, Uri};

use crate::agent::ClientClass;
use crate::identity::{cookie::read_cookie, AccessToken};
use crate::sites::{HostKind, Site};

/// Request headers copied onto forwarded upstream calls.
const PASSTHROUGH_HEADERS: &[&str] = &[
    "user-agent",
    "accept",
    "accept-language",
    "referer",
    "if-none-match",
    "if-modified-since",
];

/// Mutable per-request state. Created from the inbound request, dropped
/// once the response is sent; never shared between requests.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub method: Method,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    /// Whether the client reached us over TLS (directly or via the load balancer).
    pub secure: bool,
    /// Token the client already holds in its cookie.
    pub client_token: Option<String>,
    /// Token acquired by the pipeline for this request.
    pub access_token: Option<AccessToken>,
    pub site: Option<Arc<Site>>,
    pub host_kind: Option<HostKind>,
    pub client_class: Option<ClientClass>,
    /// Ask the rendering backend for crawler-oriented output.
    pub crawl_mode: bool,
    /// Inbound headers forwarded upstream.
    pub passthrough: HeaderMap,
    terminated: bool,
}

impl RequestContext {
    /// Build a context from the inbound request line and headers.
    pub fn from_http(method: &Method, uri: &Uri, headers: &HeaderMap, cookie_name: &str) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let forwarded_https = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);
        let secure = forwarded_https || uri.scheme_str() == Some("https");

        let mut passthrough = HeaderMap::new();
        for name in PASSTHROUGH_HEADERS {
            if let Some(value) = headers.get(*name) {
                passthrough.insert(HeaderName::from_static(*name), value.clone());
            }
        }

        Self {
            request_id: header_string(headers, "x-request-id"),
            method: method.clone(),
            host,
            path: uri.path().to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            user_agent: header_string(headers, header::USER_AGENT.as_str()),
            referer: header_string(headers, header::REFERER.as_str()),
            secure,
            client_token: read_cookie(headers, cookie_name),
            access_token: None,
            site: None,
            host_kind: None,
            client_class: None,
            crawl_mode: false,
            passthrough,
            terminated: false,
        }
    }

    /// Path plus `?query` when present.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// First value of a decoded query parameter.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
