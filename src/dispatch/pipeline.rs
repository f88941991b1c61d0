//! The dispatch pipeline: a linear sequence of stages with early exit.
//!
//! # Stages
//! ```text
//!  1 health check          → Health
//!  2 host resolution       → 301 default site        (unknown host)
//!  3 canonical host        → 301 canonical host      (alias host)
//!  4 transport             → 301 https://            (plain HTTP, non-local site)
//!  5 trailing slash        → 301 path without slash
//!  6 legacy table          → 301 new path
//!  7 crawler rules         → forward dynamic/rendering (non-local stage)
//!  8 basic browser         → 307 mobile host         (primary host, prod)
//!  9 token acquisition     → 500 on failure          (skipped for static paths)
//! 10 mobile host           → forward rendering
//! 11 aggregate site        → forward rendering
//! 12 editor / no-PWA       → forward rendering
//! 13 static/app serving    → Serve | Blank
//! ```
//!
//! # Design Decisions
//! - Order is fixed: host and transport normalization run before the
//!   client classifier, and the token is acquired before any forward that
//!   carries it
//! - Stages only decide; executing the decision (I/O to backends and the
//!   asset store) is the HTTP layer's job
//! - Decisions depend only on the request, the immutable tables and the
//!   identity endpoint; nothing is shared between requests

use std::sync::Arc;

use crate::agent::{classify, ClientClass};
use crate::config::{RoutingConfig, Stage};
use crate::dispatch::action::{Action, Target};
use crate::dispatch::context::RequestContext;
use crate::dispatch::legacy::LegacyRedirects;
use crate::dispatch::paths::{
    has_no_pwa_marker, is_crawler_index, is_editor_path, is_static_request, referer_wants_rendering,
    strip_trailing_slash,
};
use crate::error::EdgeError;
use crate::identity::TokenManager;
use crate::observability::metrics;
use crate::sites::{HostKind, Site, SiteRegistry};

const STYLESHEET_PATH: &str = "/pwa-stylesheets/css/style.css";
const IMAGES_PREFIX: &str = "/pwa-images/";
const STUB_PREFIXES: &[&str] = &["/resources/", "/stylesheets/"];

/// Decides what to do with each request.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<SiteRegistry>,
    tokens: TokenManager,
    legacy: LegacyRedirects,
    routing: RoutingConfig,
    stage: Stage,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SiteRegistry>,
        tokens: TokenManager,
        routing: RoutingConfig,
        stage: Stage,
    ) -> Self {
        let legacy = LegacyRedirects::new(&routing.legacy_redirects);
        Self {
            registry,
            tokens,
            legacy,
            routing,
            stage,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Run the pipeline. The context is marked terminated once an action
    /// is chosen; an error means the request ends with the generic 500.
    pub async fn decide(&self, ctx: &mut RequestContext) -> Result<Action, EdgeError> {
        let action = self.run(ctx).await?;
        ctx.terminate();
        tracing::debug!(
            request_id = ?ctx.request_id,
            host = %ctx.host,
            path = %ctx.path,
            action = action.name(),
            "Dispatch decided"
        );
        Ok(action)
    }

    async fn run(&self, ctx: &mut RequestContext) -> Result<Action, EdgeError> {
        if ctx.path == self.routing.health_path {
            return Ok(Action::Health);
        }

        let Some(resolution) = self.registry.resolve(&ctx.host) else {
            tracing::info!(host = %ctx.host, "Unknown host, redirecting to default site");
            return Ok(Action::permanent(
                self.routing.default_site_url.clone(),
                "unknown_host",
            ));
        };
        let site = resolution.site;
        let kind = resolution.kind;
        ctx.site = Some(site.clone());
        ctx.host_kind = Some(kind.clone());

        if let Some(action) = canonical_host(ctx, &site, &kind) {
            return Ok(action);
        }
        if let Some(action) = transport(ctx, &site) {
            return Ok(action);
        }
        if let Some(action) = trailing_slash(ctx) {
            return Ok(action);
        }
        if let Some(location) = self.legacy.lookup(&ctx.path, ctx.query.as_deref()) {
            return Ok(Action::permanent(location, "legacy_path"));
        }
        if let Some(action) = self.crawler_rules(ctx) {
            return Ok(action);
        }
        if let Some(action) = self.basic_browser(ctx, &site, &kind) {
            return Ok(action);
        }

        if !is_static_request(&ctx.path) {
            if let Err(err) = self.tokens.ensure(ctx).await {
                metrics::record_identity_failure();
                return Err(err.into());
            }
        }

        if kind == HostKind::Mobile && site.mobile_host != site.primary_host {
            return Ok(Action::Forward {
                target: Target::Rendering,
            });
        }
        if site.is_aggregate() {
            return Ok(Action::Forward {
                target: Target::Rendering,
            });
        }
        if is_editor_path(&ctx.path)
            || has_no_pwa_marker(ctx.query.as_deref())
            || referer_wants_rendering(ctx.referer.as_deref())
        {
            return Ok(Action::Forward {
                target: Target::Rendering,
            });
        }

        Ok(serve(&ctx.path, &site))
    }

    fn crawler_rules(&self, ctx: &mut RequestContext) -> Option<Action> {
        let class = classify(ctx.user_agent.as_deref());
        if class == ClientClass::Unknown {
            tracing::warn!(
                request_id = ?ctx.request_id,
                user_agent = ?ctx.user_agent,
                "Unrecognized user agent, treating as basic browser"
            );
        }
        ctx.client_class = Some(class);

        if self.stage.is_local() {
            return None;
        }
        if is_crawler_index(&ctx.path) {
            return Some(Action::Forward {
                target: Target::Dynamic,
            });
        }
        if class == ClientClass::Crawler {
            ctx.crawl_mode = true;
            return Some(Action::Forward {
                target: Target::Rendering,
            });
        }
        None
    }

    fn basic_browser(&self, ctx: &RequestContext, site: &Site, kind: &HostKind) -> Option<Action> {
        let needs_basic = ctx.client_class.map(ClientClass::needs_basic).unwrap_or(false);
        if *kind == HostKind::Primary
            && self.stage.is_full_traffic()
            && !site.is_test_environment()
            && needs_basic
            && site.mobile_host != site.primary_host
        {
            let location = format!("https://{}{}", site.mobile_host, ctx.path_and_query());
            return Some(Action::temporary(location, "basic_browser"));
        }
        None
    }
}

fn canonical_host(ctx: &RequestContext, site: &Site, kind: &HostKind) -> Option<Action> {
    let HostKind::Alias { canonical } = kind else {
        return None;
    };
    let scheme = if site.is_local() { "http" } else { "https" };
    let location = format!("{}://{}{}", scheme, canonical, ctx.path_and_query());
    Some(Action::permanent(location, "alias_host"))
}

fn transport(ctx: &RequestContext, site: &Site) -> Option<Action> {
    if ctx.secure || site.is_local() {
        return None;
    }
    let location = format!("https://{}{}", ctx.host, ctx.path_and_query());
    Some(Action::permanent(location, "insecure_transport"))
}

fn trailing_slash(ctx: &RequestContext) -> Option<Action> {
    let stripped = strip_trailing_slash(&ctx.path)?;
    let location = match &ctx.query {
        Some(q) => format!("{}?{}", stripped, q),
        None => stripped,
    };
    Some(Action::permanent(location, "trailing_slash"))
}

/// Terminal stage: well-known asset paths, stubs, or the site's app shell.
fn serve(path: &str, site: &Site) -> Action {
    let name = &site.name;

    if path == STYLESHEET_PATH {
        return Action::Serve {
            logical_path: "pwa-stylesheets/style.css".to_string(),
            content_type: "text/css",
        };
    }
    if path == format!("/pwa-sw-{}.js", name) {
        return Action::Serve {
            logical_path: format!("pwa-service-worker/pwa-sw-{}.js", name),
            content_type: "text/javascript",
        };
    }
    if path == "/favicon.ico" {
        return Action::Serve {
            logical_path: "favicon.ico".to_string(),
            content_type: "image/x-icon",
        };
    }
    if let Some(rest) = path.strip_prefix(IMAGES_PREFIX) {
        let content_type = mime_guess::from_path(rest)
            .first_raw()
            .unwrap_or("application/octet-stream");
        return Action::Serve {
            logical_path: format!("pwa-images/{}", rest),
            content_type,
        };
    }
    if STUB_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return Action::Blank {
            content_type: "text/plain",
        };
    }
    if path == format!("/pwa-manifest-{}.json", name) {
        return Action::Serve {
            logical_path: format!("pwa-manifest/pwa-manifest-{}.json", name),
            content_type: "application/json",
        };
    }

    Action::Serve {
        logical_path: format!("pwa-markup/PWA-{}.html", name),
        content_type: "text/html",
    }
}
