//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use site_edge::assets::FsAssetStore;
use site_edge::config::{EdgeConfig, Stage};
use site_edge::sites::SiteRegistry;
use site_edge::EdgeServer;

pub const MODERN_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";
pub const BASIC_UA: &str =
    "Mozilla/5.0 (Linux; Android 4.4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/30.0.1599.92 Mobile Safari/537.36";
pub const GOOGLEBOT_UA: &str =
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

pub const HINDI_MARKUP: &str = "<html><body>hindi app shell</body></html>";

/// An edge server wired to mock identity/dynamic/mini services and a
/// temporary asset directory. Dropping it tears everything down.
pub struct TestEdge {
    pub router: Router,
    pub identity: MockServer,
    pub dynamic: MockServer,
    pub mini: MockServer,
    pub assets: TempDir,
}

impl TestEdge {
    pub async fn start(stage: Stage) -> Self {
        Self::start_with(stage, |_| {}).await
    }

    /// Start with a config hook applied after the mock URLs are filled in.
    pub async fn start_with(stage: Stage, customize: impl FnOnce(&mut EdgeConfig)) -> Self {
        let identity = MockServer::start().await;
        let dynamic = MockServer::start().await;
        let mini = MockServer::start().await;
        let assets = asset_root();

        let mut config = EdgeConfig::default();
        config.stage = stage;
        config.identity.base_url = Some(format!("{}/user", identity.uri()));
        config.upstreams.dynamic_url = Some(dynamic.uri());
        config.upstreams.mini_url = Some(mini.uri());
        config.upstreams.timeout_secs = 5;
        config.assets.root = assets.path().to_string_lossy().into_owned();
        customize(&mut config);

        let router = build_router(config);
        Self {
            router,
            identity,
            dynamic,
            mini,
            assets,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn build_router(config: EdgeConfig) -> Router {
    let registry = SiteRegistry::with_defaults(&config.routing.host_aliases).unwrap();
    let assets = Arc::new(FsAssetStore::new(&config.assets.root));
    EdgeServer::new(config, Arc::new(registry), assets)
        .unwrap()
        .router()
}

/// Asset directory laid out like a deployment's static root.
pub fn asset_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "pwa-markup/PWA-HINDI.html", HINDI_MARKUP);
    write(root, "pwa-markup/PWA-ALPHA.html", "<html>alpha</html>");
    write(root, "pwa-stylesheets/style.css", "body { margin: 0 }");
    write(root, "pwa-service-worker/pwa-sw-HINDI.js", "self.addEventListener('fetch', () => {});");
    write(root, "pwa-images/logo.png", "\u{89}PNG");
    dir
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Mount an identity endpoint issuing `token`, expected to be called `calls` times.
pub async fn mount_identity(server: &MockServer, token: &str, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/user/accesstoken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accessToken": token })),
        )
        .expect(calls)
        .mount(server)
        .await;
}

/// Mount a catch-all backend answering 200 with `body`, expected `calls` times.
pub async fn mount_backend(server: &MockServer, body: &str, calls: u64) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// A plain-HTTP backend that sends headers and part of the body, then stalls.
/// Returns its base URL.
pub async fn stalling_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\npartial")
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });
    format!("http://{}", addr)
}

/// A GET as it arrives from the load balancer over TLS.
pub fn secure_get(host: &str, uri: &str, user_agent: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("host", host)
        .header("x-forwarded-proto", "https");
    if let Some(ua) = user_agent {
        builder = builder.header("user-agent", ua);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}
