//! # Gateway Server Integration Tests
//!
//! Enrich-and-forward behaviour of the HTTP adapter with a wiremock upstream.

mod common;

use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
};
use common::{cache_with, token_for, FakeResolver};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tenant_groups_gateway::core::config::GatewayConfig;
use tenant_groups_gateway::gateway::{build_router, ServerState};
use tenant_groups_gateway::GatewayServer;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(upstream: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.upstream_url = Some(upstream.to_string());
    config.server.upstream_timeout = Duration::from_secs(2);
    config
}

fn router_for(upstream: &str, resolver: Arc<FakeResolver>) -> axum::Router {
    let cache = cache_with(resolver, Duration::from_secs(120 * 60));
    build_router(ServerState::new(&config_for(upstream), cache).unwrap())
}

#[tokio::test]
async fn test_forwards_enriched_request_and_relays_response() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(query_param("limit", "5"))
        .and(header("x-tenant-id", "abc_123"))
        .and(header("x-auth-user-groups", "Engineering"))
        .and(header("from", "dev@example.com"))
        .and(header("x-request-id", "req-42"))
        .and(body_string("{\"item\":1}"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-upstream", "yes")
                .set_body_json(json!({"created": true})),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let resolver = Arc::new(FakeResolver::new().with_groups("abc-123", &[("g1", "Engineering")]));
    let app = router_for(&upstream.uri(), resolver);

    let token = token_for(json!({"tid": "abc-123", "groups": ["g1", "g2"], "email": "dev@example.com"}));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/orders?limit=5")
        .header("authorization", format!("Bearer {}", token))
        .header("x-request-id", "req-42")
        .header("content-type", "application/json")
        .body(Body::from("{\"item\":1}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"created": true}));
}

#[tokio::test]
async fn test_requests_without_token_are_forwarded_untouched() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .and(|request: &wiremock::Request| {
            !request.headers.iter().any(|(name, _)| {
                ["x-tenant-id", "x-auth-user-groups", "x-auth-user-roles", "from"]
                    .iter()
                    .any(|enriched| name.as_str().eq_ignore_ascii_case(enriched))
            })
        })
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&upstream)
        .await;

    let resolver = Arc::new(FakeResolver::new());
    let app = router_for(&upstream.uri(), resolver.clone());

    let response = app
        .oneshot(Request::builder().uri("/public").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(resolver.calls(), 0);
}

#[tokio::test]
async fn test_directory_outage_does_not_fail_the_request() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .and(header("x-tenant-id", "t1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = router_for(&upstream.uri(), Arc::new(FakeResolver::new().failing()));
    let token = token_for(json!({"tid": "t1", "groups": ["g1"]}));
    let request = Request::builder()
        .uri("/reports")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_error_status_is_relayed() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&upstream)
        .await;

    let app = router_for(&upstream.uri(), Arc::new(FakeResolver::new()));
    let response = app
        .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"maintenance");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let app = router_for("http://127.0.0.1:1", Arc::new(FakeResolver::new()));
    let response = app
        .oneshot(Request::builder().uri("/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_slow_upstream_is_gateway_timeout() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&upstream)
        .await;

    let app = router_for(&upstream.uri(), Arc::new(FakeResolver::new()));
    let response = app
        .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_health_reports_cache_state() {
    let resolver = Arc::new(FakeResolver::new());
    let cache = cache_with(resolver, Duration::from_secs(60));
    cache.populate("t1", vec![tenant_groups_gateway::DirectoryGroup::new("g1", "Engineering")]);

    let server = GatewayServer::new(&config_for("http://127.0.0.1:1"), cache).unwrap();
    let response = server
        .router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cached_group_names"], 1);
    assert_eq!(body["tracked_tenants"], 1);
}

#[test]
fn test_server_requires_upstream() {
    let cache = cache_with(Arc::new(FakeResolver::new()), Duration::from_secs(60));
    assert!(GatewayServer::new(&GatewayConfig::default(), cache).is_err());
}
