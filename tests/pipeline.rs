//! End-to-end dispatch scenarios, driven through the full router.

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use wiremock::matchers::{header as header_eq, header_exists, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use site_edge::config::Stage;
use site_edge::error::GENERIC_FAILURE_MESSAGE;

mod common;
use common::{
    body_string, mount_backend, mount_identity, secure_get, stalling_backend, TestEdge, BASIC_UA,
    GOOGLEBOT_UA, HINDI_MARKUP, MODERN_UA,
};

#[tokio::test]
async fn unknown_host_is_sent_to_default_site() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;

    let response = edge
        .send(secure_get("evil.example.com", "/some/page", Some(MODERN_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://www.pratilipi.com/?redirect=ecs"
    );
}

#[tokio::test]
async fn mobile_host_with_client_token_goes_to_mini_without_identity_call() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/story/some-title"))
        .and(query_param("ref", "home"))
        .and(query_param("accessToken", "held-token"))
        .and(header_eq("x-forwarded-host", "hi.pratilipi.com"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_string("mini page"))
        .expect(1)
        .mount(&edge.mini)
        .await;
    mount_backend(&edge.dynamic, "dynamic", 0).await;

    let mut request = secure_get("hi.pratilipi.com", "/story/some-title?ref=home", Some(BASIC_UA));
    request.headers_mut().insert(
        header::COOKIE,
        "theme=dark; access_token=held-token".parse().unwrap(),
    );
    let response = edge.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(body_string(response).await, "mini page");
}

#[tokio::test]
async fn malformed_identity_body_fails_with_generic_payload() {
    let edge = TestEdge::start(Stage::Prod).await;
    Mock::given(method("GET"))
        .and(path("/user/accesstoken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&edge.identity)
        .await;
    mount_backend(&edge.dynamic, "dynamic", 0).await;
    mount_backend(&edge.mini, "mini", 0).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, serde_json::json!({ "message": GENERIC_FAILURE_MESSAGE }));
}

#[tokio::test]
async fn app_shell_is_served_with_issued_token_cookie() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "fresh-token", 1).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("access_token=fresh-token"));
    assert!(cookie.contains("Domain=pratilipi.com"));
    assert!(cookie.contains("Max-Age=2592000"));
    assert!(!cookie.contains("HttpOnly"));
    assert_eq!(body_string(response).await, HINDI_MARKUP);
}

#[tokio::test]
async fn static_assets_skip_token_acquisition() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/pwa-stylesheets/css/style.css", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/pwa-images/logo.png", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/pwa-images/missing.png", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn legacy_stub_paths_answer_empty() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "tok", 1).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/resources/old/widget", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_string(response).await, "");
}

#[tokio::test]
async fn health_answers_with_epoch_millis() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("host", "10.0.0.7:80")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = edge.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let millis: u128 = body_string(response).await.parse().unwrap();
    assert!(millis > 1_500_000_000_000);
}

#[tokio::test]
async fn secure_requests_are_never_transport_redirected() {
    let edge = TestEdge::start(Stage::Gamma).await;
    Mock::given(method("GET"))
        .and(path("/user/accesstoken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accessToken": "t" })),
        )
        .mount(&edge.identity)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&edge.mini)
        .await;

    let hosts = [
        "www.pratilipi.com",
        "hindi.pratilipi.com",
        "hi.pratilipi.com",
        "tamil-gamma.pratilipi.com",
        "m-devo.pratilipi.com",
    ];
    for host in hosts {
        let response = edge.send(secure_get(host, "/story/x", Some(MODERN_UA))).await;
        assert_ne!(response.status(), StatusCode::MOVED_PERMANENTLY, "{}", host);
    }
}

#[tokio::test]
async fn plain_http_is_redirected_to_https() {
    let edge = TestEdge::start(Stage::Prod).await;

    let request = axum::http::Request::builder()
        .uri("/story/x?p=1")
        .header("host", "tamil.pratilipi.com")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = edge.send(request).await;

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://tamil.pratilipi.com/story/x?p=1"
    );
}

#[tokio::test]
async fn trailing_slash_redirect_does_not_repeat() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "tok", 1).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x/", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert_eq!(location, "/story/x");

    let response = edge
        .send(secure_get("hindi.pratilipi.com", &location, Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn basic_browsers_are_sent_to_mobile_host() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x?p=2", Some(BASIC_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://hi.pratilipi.com/story/x?p=2"
    );
}

#[tokio::test]
async fn crawlers_are_forwarded_with_crawl_mode_hint() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/story/x"))
        .and(header_eq("x-crawl-mode", "1"))
        .and(header_eq("user-agent", GOOGLEBOT_UA))
        .respond_with(ResponseTemplate::new(200).set_body_string("rendered"))
        .expect(1)
        .mount(&edge.mini)
        .await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x", Some(GOOGLEBOT_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "rendered");
}

#[tokio::test]
async fn sitemaps_go_to_dynamic_backend() {
    let edge = TestEdge::start(Stage::Prod).await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<urlset/>"))
        .expect(1)
        .mount(&edge.dynamic)
        .await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/sitemap.xml", Some(MODERN_UA)))
        .await;
    assert_eq!(body_string(response).await, "<urlset/>");
}

#[tokio::test]
async fn upstream_error_statuses_are_relayed() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "tok", 1).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-backend", "mini")
                .set_body_string("no such story"),
        )
        .mount(&edge.mini)
        .await;

    let response = edge
        .send(secure_get("hi.pratilipi.com", "/story/missing", Some(MODERN_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-backend"], "mini");
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .starts_with("access_token=tok"));
    assert_eq!(body_string(response).await, "no such story");
}

#[tokio::test]
async fn unreachable_upstream_fails_with_generic_payload() {
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.upstreams.mini_url = Some("http://127.0.0.1:1".to_string());
    })
    .await;
    mount_identity(&edge.identity, "tok", 1).await;

    let response = edge
        .send(secure_get("hi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.contains(GENERIC_FAILURE_MESSAGE));
    assert!(!body.contains("127.0.0.1"));
}

#[tokio::test]
async fn rendering_falls_back_to_dynamic_without_mini() {
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.upstreams.mini_url = None;
    })
    .await;
    mount_identity(&edge.identity, "tok", 1).await;
    mount_backend(&edge.mini, "mini", 0).await;
    mount_backend(&edge.dynamic, "dynamic", 1).await;

    let response = edge
        .send(secure_get("www.pratilipi.com", "/", Some(MODERN_UA)))
        .await;
    assert_eq!(body_string(response).await, "dynamic");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let edge = TestEdge::start(Stage::Prod).await;

    let response = edge
        .send(secure_get("evil.example.com", "/", Some(MODERN_UA)))
        .await;
    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);
}

async fn assert_generic_failure(response: axum::http::Response<Body>) {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body, serde_json::json!({ "message": GENERIC_FAILURE_MESSAGE }));
}

#[tokio::test]
async fn stalled_upstream_body_is_cut_off_at_the_deadline() {
    let backend = stalling_backend().await;
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.upstreams.dynamic_url = Some(backend);
        config.upstreams.timeout_secs = 1;
    })
    .await;

    let started = Instant::now();
    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/sitemap.xml", Some(MODERN_UA)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let read = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .expect("body still pending after the upstream deadline");
    assert!(read.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn slow_identity_fails_with_generic_payload() {
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.identity.timeout_secs = 1;
    })
    .await;
    Mock::given(method("GET"))
        .and(path("/user/accesstoken"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "accessToken": "late" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&edge.identity)
        .await;

    let response = edge
        .send(secure_get("hindi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;
    assert_generic_failure(response).await;
}

#[tokio::test]
async fn slow_upstream_fails_with_generic_payload() {
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.upstreams.timeout_secs = 1;
    })
    .await;
    mount_identity(&edge.identity, "tok", 1).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&edge.mini)
        .await;

    let response = edge
        .send(secure_get("hi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;
    assert_generic_failure(response).await;
}

#[tokio::test]
async fn request_deadline_fails_with_generic_payload() {
    let edge = TestEdge::start_with(Stage::Prod, |config| {
        config.identity.timeout_secs = 2;
        config.upstreams.timeout_secs = 2;
        config.timeouts.request_secs = 3;
    })
    .await;
    Mock::given(method("GET"))
        .and(path("/user/accesstoken"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "accessToken": "tok" }))
                .set_delay(Duration::from_millis(1600)),
        )
        .mount(&edge.identity)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("mini page")
                .set_delay(Duration::from_millis(1600)),
        )
        .mount(&edge.mini)
        .await;

    let response = edge
        .send(secure_get("hi.pratilipi.com", "/story/x", Some(MODERN_UA)))
        .await;
    assert_generic_failure(response).await;
}

#[tokio::test]
async fn non_get_methods_are_rejected_before_forwarding() {
    let edge = TestEdge::start(Stage::Prod).await;
    mount_identity(&edge.identity, "tok", 0).await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&edge.mini)
        .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/story/x")
        .header("host", "hi.pratilipi.com")
        .header("x-forwarded-proto", "https")
        .header("user-agent", MODERN_UA)
        .body(Body::from("payload=important"))
        .unwrap();
    let response = edge.send(request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
