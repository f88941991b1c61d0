//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sites::Site;

const PROD_API_URL: &str = "https://api.pratilipi.com";
const DEVO_API_URL: &str = "https://devo-pratilipi.appspot.com";

/// Deployment stage of this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Developer machine.
    #[default]
    Local,
    Devo,
    Gamma,
    Prod,
}

impl Stage {
    /// Production receives real user traffic; device-based redirects only apply there.
    pub fn is_full_traffic(self) -> bool {
        self == Stage::Prod
    }

    pub fn is_local(self) -> bool {
        self == Stage::Local
    }

    /// Dynamic backend used when none is configured.
    pub fn default_dynamic_url(self) -> &'static str {
        match self {
            Stage::Prod | Stage::Gamma => PROD_API_URL,
            Stage::Devo | Stage::Local => DEVO_API_URL,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Local => "local",
            Stage::Devo => "devo",
            Stage::Gamma => "gamma",
            Stage::Prod => "prod",
        };
        f.write_str(name)
    }
}

/// Root configuration for the edge server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Deployment stage.
    pub stage: Stage,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dynamic and mini backend settings.
    pub upstreams: UpstreamConfig,

    /// Identity (token issuing) endpoint.
    pub identity: IdentityConfig,

    /// Client-side token cookie.
    pub cookie: CookieConfig,

    /// Static asset store.
    pub assets: AssetConfig,

    /// Host canonicalization and redirect tables.
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Site table override. Empty means the built-in table.
    pub sites: Vec<Site>,
}

impl EdgeConfig {
    /// Dynamic backend base URL for this deployment.
    pub fn dynamic_url(&self) -> String {
        self.upstreams
            .dynamic_url
            .clone()
            .unwrap_or_else(|| self.stage.default_dynamic_url().to_string())
    }

    /// Identity endpoint base URL; `/accesstoken` is appended to it.
    pub fn identity_url(&self) -> String {
        self.identity
            .base_url
            .clone()
            .unwrap_or_else(|| format!("{}/user", self.dynamic_url().trim_end_matches('/')))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// Upstream backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Dynamic application backend. Defaults per stage.
    pub dynamic_url: Option<String>,

    /// Lightweight rendering backend. Forwards fall back to the dynamic backend when unset.
    pub mini_url: Option<String>,

    /// Deadline for one forwarded call, in seconds.
    pub timeout_secs: u64,

    /// Idle keep-alive connections kept per backend host.
    pub pool_max_idle_per_host: usize,

    /// How long an idle pooled connection is kept, in seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            dynamic_url: None,
            mini_url: None,
            timeout_secs: 60,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Identity endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base URL; defaults to `<dynamic>/user`.
    pub base_url: Option<String>,

    /// Deadline for one identity call, in seconds.
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 60,
        }
    }
}

/// Access token cookie.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    pub name: String,

    /// Lifetime in seconds (30 days).
    pub max_age_secs: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "access_token".to_string(),
            max_age_secs: 30 * 86_400,
        }
    }
}

/// Static asset store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Root directory holding `pwa-markup/`, `pwa-manifest/`, `pwa-images/`, …
    pub root: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "static".to_string(),
        }
    }
}

/// Host and path canonicalization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Liveness path answered before any other stage.
    pub health_path: String,

    /// Where clients of unknown hosts are sent.
    pub default_site_url: String,

    /// Extra hostname → canonical hostname aliases (`www.` aliases are automatic).
    pub host_aliases: BTreeMap<String, String>,

    /// Legacy path → new location, merged over the built-in table.
    pub legacy_redirects: BTreeMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        let mut host_aliases = BTreeMap::new();
        host_aliases.insert("pratilipi.com".to_string(), "www.pratilipi.com".to_string());
        Self {
            health_path: "/health".to_string(),
            default_site_url: "https://www.pratilipi.com/?redirect=ecs".to_string(),
            host_aliases,
            legacy_redirects: BTreeMap::new(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request deadline in seconds. Must exceed the identity and
    /// upstream timeouts combined, since both calls can run for one request.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 125 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
