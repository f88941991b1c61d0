//! Reading and writing the client-side token cookie.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::Cookie;

/// Value of the named cookie in the request's `Cookie` headers, if non-empty.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw).filter_map(Result::ok))
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Render the `Set-Cookie` value persisting a token on the client.
///
/// The cookie stays readable by page scripts (not HttpOnly).
pub fn token_cookie(name: &str, value: &str, domain: Option<&str>, max_age_secs: i64) -> String {
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .http_only(false);
    if let Some(domain) = domain {
        builder = builder.domain(domain.to_string());
    }
    builder.build().to_string()
}

/// Append a `Set-Cookie` header; values that are not valid header text are dropped.
pub fn append_set_cookie(headers: &mut HeaderMap, rendered: &str) {
    match HeaderValue::from_str(rendered) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Dropping unrenderable Set-Cookie"),
    }
}
