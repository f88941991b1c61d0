//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the single edge handler
//! - Wire up middleware (request ID, tracing, panic catching)
//! - Bound every request by the whole-request deadline
//! - Build the long-lived collaborators (dispatcher, forwarding pools, asset store)
//! - Serve on a listener until shutdown is triggered

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::assets::AssetStore;
use crate::config::EdgeConfig;
use crate::dispatch::{Dispatcher, RequestContext};
use crate::error::{generic_failure, panic_response, EdgeError};
use crate::http::response;
use crate::identity::{IdentityClient, TokenManager};
use crate::observability::metrics;
use crate::sites::SiteRegistry;
use crate::upstream::{parse_target, ForwardingClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub upstream: ForwardingClient,
    /// Mini (rendering) backend; rendering forwards use the dynamic backend without it.
    pub mini: Option<Url>,
    pub assets: Arc<dyn AssetStore>,
    /// Whole-request deadline covering token acquisition and the forward.
    pub request_timeout: Duration,
}

/// HTTP server for the edge layer.
pub struct EdgeServer {
    router: Router,
    config: EdgeConfig,
}

impl EdgeServer {
    /// Create a server from a validated configuration.
    pub fn new(
        config: EdgeConfig,
        registry: Arc<SiteRegistry>,
        assets: Arc<dyn AssetStore>,
    ) -> Result<Self, EdgeError> {
        let dynamic = parse_target(&config.dynamic_url())?;
        let mini = config
            .upstreams
            .mini_url
            .as_deref()
            .map(parse_target)
            .transpose()?;
        let upstream = ForwardingClient::new(dynamic, &config.upstreams)?;

        let identity = IdentityClient::new(
            &config.identity_url(),
            Duration::from_secs(config.identity.timeout_secs),
        )?;
        let tokens = TokenManager::new(identity, config.cookie.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            tokens,
            config.routing.clone(),
            config.stage,
        ));

        tracing::info!(
            stage = %config.stage,
            dynamic = %upstream.default_target(),
            mini = ?mini.as_ref().map(Url::as_str),
            identity = %config.identity_url(),
            sites = dispatcher.registry().sites().count(),
            "Edge server configured"
        );

        let state = AppState {
            dispatcher,
            upstream,
            mini,
            assets,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    /// Only GET (and HEAD) are served; other methods get 405.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(edge_handler))
            .route("/{*path}", get(edge_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(panic_response)),
            )
    }

    /// The fully layered router, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

/// The edge handler: build the context, run the pipeline, execute its decision.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let (parts, _body) = request.into_parts();
    let mut ctx = RequestContext::from_http(
        &parts.method,
        &parts.uri,
        &parts.headers,
        state.dispatcher.tokens().cookie_name(),
    );

    let outcome = tokio::time::timeout(state.request_timeout, dispatch(&state, &mut ctx)).await;
    let (name, response) = match outcome {
        Ok(handled) => handled,
        Err(_) => {
            tracing::error!(
                request_id = ?ctx.request_id,
                host = %ctx.host,
                path = %ctx.path,
                timeout = ?state.request_timeout,
                "Request exceeded deadline"
            );
            ("timeout", generic_failure())
        }
    };
    metrics::record_request(name, response.status().as_u16(), started);
    response
}

async fn dispatch(state: &AppState, ctx: &mut RequestContext) -> (&'static str, Response) {
    let action = match state.dispatcher.decide(ctx).await {
        Ok(action) => action,
        Err(err) => {
            tracing::error!(
                request_id = ?ctx.request_id,
                host = %ctx.host,
                path = %ctx.path,
                "Dispatch failed"
            );
            return ("error", err.into_response());
        }
    };

    let name = action.name();
    (name, response::execute(state, action, ctx).await)
}
