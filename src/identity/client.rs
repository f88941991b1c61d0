//! HTTP client for the identity (token issuing) endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

/// Failures talking to the identity endpoint. All are terminal for the request.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to build identity client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("identity request timed out after {0:?}")]
    Timeout(Duration),

    #[error("identity request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("identity endpoint returned {0}")]
    Status(StatusCode),

    #[error("identity response is not valid JSON: {0}")]
    Body(#[from] serde_json::Error),

    #[error("identity response carried no access token")]
    EmptyToken,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// Client for `GET {base}/accesstoken[?accessToken=<existing>]`.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: Client,
    endpoint: String,
    timeout: Duration,
}

impl IdentityClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, IdentityError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(IdentityError::Build)?;

        Ok(Self {
            http,
            endpoint: format!("{}/accesstoken", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    /// Ask the endpoint for a token, optionally presenting one the client already had.
    pub async fn issue(
        &self,
        existing: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<String, IdentityError> {
        let mut request = self.http.get(&self.endpoint);
        if let Some(existing) = existing {
            request = request.query(&[("accessToken", existing)]);
        }
        if let Some(id) = request_id {
            request = request.header("x-request-id", id);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status));
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let parsed: AccessTokenResponse = serde_json::from_slice(&body)?;

        match parsed.access_token {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(IdentityError::EmptyToken),
        }
    }

    fn classify(&self, error: reqwest::Error) -> IdentityError {
        if error.is_timeout() {
            IdentityError::Timeout(self.timeout)
        } else {
            IdentityError::Request(error)
        }
    }
}
