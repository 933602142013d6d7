//! Proxy service against a mocked upstream greeting server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_hello::config::UpstreamConfig;
use mcp_hello::proxy::{build_proxy_router, UpstreamClient, PROXY_INFO};

fn router(base_url: String, id_token: Option<&str>) -> axum::Router {
    let client = UpstreamClient::new(&UpstreamConfig {
        base_url,
        id_token: id_token.map(String::from),
        timeout: Duration::from_secs(5),
    });
    build_proxy_router(Arc::new(client))
}

fn proxy_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/proxy_hello")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("req")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), 64 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&body).expect("json")
}

#[tokio::test]
async fn wraps_upstream_greeting() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .and(query_param("name", "Ada"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Hello, Ada!", "type": "greeting" })),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), None)
        .oneshot(proxy_request(json!({ "name": "Ada" })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        json_body(resp).await,
        json!({ "proxied_message": "Hello, Ada!", "proxy_info": PROXY_INFO })
    );
}

#[tokio::test]
async fn name_defaults_to_world() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .and(query_param("name", "World"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Hello, World!" })))
        .expect(1)
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), None)
        .oneshot(proxy_request(json!({})))
        .await
        .expect("resp");
    assert_eq!(json_body(resp).await["proxied_message"], "Hello, World!");
}

#[tokio::test]
async fn sends_bearer_token_when_auth_enabled() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .and(header_eq("authorization", "Bearer upstream-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Hello, Ada!" })))
        .expect(1)
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), Some("upstream-token"))
        .oneshot(proxy_request(json!({ "name": "Ada", "enable_auth": true })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn upstream_rejection_keeps_status() {
    let upstream = MockServer::start().await;
    let rejection = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": { "code": -32001, "message": "Unauthorized" }
    });
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(401).set_body_json(rejection.clone()))
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), None)
        .oneshot(proxy_request(json!({ "name": "Ada", "enable_auth": true })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(resp).await;
    assert_eq!(body["detail"]["status"], "error");
    assert_eq!(body["detail"]["upstream_error"], rejection);
    assert!(body["detail"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to call hello server"));
}

#[tokio::test]
async fn upstream_text_error_is_wrapped() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), None)
        .oneshot(proxy_request(json!({ "name": "Ada" })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(resp).await["detail"]["upstream_error"],
        json!({ "text": "overloaded" })
    );
}

#[tokio::test]
async fn missing_message_is_internal_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "greeting": "hi" })))
        .mount(&upstream)
        .await;

    let resp = router(upstream.uri(), None)
        .oneshot(proxy_request(json!({ "name": "Ada" })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert!(body["detail"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Internal server error"));
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    // Nothing listens on port 9 of the loopback interface.
    let resp = router("http://127.0.0.1:9".to_string(), None)
        .oneshot(proxy_request(json!({ "name": "Ada" })))
        .await
        .expect("resp");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}
