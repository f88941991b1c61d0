//! Header handling for forwarded calls.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Headers describing a single connection hop; never passed through.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_CRAWL_MODE: &str = "x-crawl-mode";

/// Drop hop-by-hop headers from an upstream response before relaying it.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Insert a header from runtime text, skipping values that are not valid header text.
pub fn insert_lossy(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
