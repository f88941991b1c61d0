//! Per-request access token acquisition.
//!
//! # Responsibilities
//! - Reuse the token the client already holds, without re-validating it
//! - Otherwise fetch one from the identity endpoint
//! - Persist freshly issued tokens back to the client
//!
//! # Design Decisions
//! - At most one acquisition per request; nothing cached across requests
//! - No retries: an identity failure ends the request with a 500

use axum::http::HeaderMap;

use crate::config::CookieConfig;
use crate::dispatch::RequestContext;
use crate::identity::client::{IdentityClient, IdentityError};
use crate::identity::cookie::{append_set_cookie, token_cookie};
use crate::sites::Site;

/// Where a request's token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// The client's own cookie.
    Client,
    /// Issued by the identity endpoint during this request.
    Issued,
}

/// Opaque access token; never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    source: TokenSource,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, source: TokenSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn source(&self) -> TokenSource {
        self.source
    }
}

/// Obtains tokens for requests and arranges their write-back.
#[derive(Debug, Clone)]
pub struct TokenManager {
    identity: IdentityClient,
    cookie: CookieConfig,
}

impl TokenManager {
    pub fn new(identity: IdentityClient, cookie: CookieConfig) -> Self {
        Self { identity, cookie }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie.name
    }

    /// Make sure the request has a token, attaching it to the context.
    pub async fn ensure(&self, ctx: &mut RequestContext) -> Result<AccessToken, IdentityError> {
        if let Some(token) = &ctx.access_token {
            return Ok(token.clone());
        }

        let token = match &ctx.client_token {
            Some(existing) => AccessToken::new(existing.clone(), TokenSource::Client),
            None => {
                // A token in the URL is presented so the endpoint can re-issue it.
                let presented = ctx.query_param("accessToken").filter(|t| !t.is_empty());
                let value = self
                    .identity
                    .issue(presented.as_deref(), ctx.request_id.as_deref())
                    .await?;
                tracing::debug!(
                    request_id = ?ctx.request_id,
                    host = %ctx.host,
                    "Issued access token"
                );
                AccessToken::new(value, TokenSource::Issued)
            }
        };

        ctx.access_token = Some(token.clone());
        Ok(token)
    }

    /// Add the `Set-Cookie` persisting a freshly issued token.
    pub fn write_back(&self, token: &AccessToken, site: &Site, headers: &mut HeaderMap) {
        if token.source() != TokenSource::Issued {
            return;
        }
        let domain = site.cookie_domain();
        let rendered = token_cookie(
            &self.cookie.name,
            token.as_str(),
            domain.as_deref(),
            self.cookie.max_age_secs,
        );
        append_set_cookie(headers, &rendered);
    }
}
