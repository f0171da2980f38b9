mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{MIRROR_KEY, seeded};
use serde_json::{Value, json};
use std::sync::Arc;
use switchyard::server::router::{SwitchyardState, switchyard_router};
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn app(fx: &common::Fixture) -> axum::Router {
    let (coordinator, _writer) = fx.coordinator().await;
    switchyard_router(SwitchyardState::new(coordinator, Arc::from(KEY)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-switch-key", KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_the_key_are_rejected() {
    let fx = seeded().await;
    let app = app(&fx).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/providers/claude")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v1/status")
                .header("x-switch-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn list_hides_settings_and_reports_endpoints() {
    let fx = seeded().await;
    let app = app(&fx).await;

    let resp = app.oneshot(get("/v1/providers/claude")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let body = json_body(resp).await;
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], "p1");
    assert_eq!(list[0]["is_current"], true);
    assert_eq!(list[0]["endpoint"], "https://one.example");
    assert!(list[0].get("settings_config").is_none());
}

#[tokio::test]
async fn switch_then_read_current() {
    let fx = seeded().await;
    let app = app(&fx).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            "/v1/providers/claude/switch",
            r#"{"providerId":"p2"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(
        body,
        json!({
            "status": "OK",
            "provider_name": "Provider Two",
            "endpoint": "https://two.example",
        })
    );
    assert_eq!(fx.read_mirror()[MIRROR_KEY], "p2");

    let current = json_body(
        app.clone()
            .oneshot(get("/v1/providers/claude/current"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(current["id"], "p2");

    let status = json_body(app.oneshot(get("/v1/status")).await.unwrap()).await;
    assert_eq!(status["state"], "ok");
    assert_eq!(status["generation"], 1);
    assert!(status["last_switched_at"].is_string());
}

#[tokio::test]
async fn switch_failures_map_to_status_codes() {
    let fx = seeded().await;
    let app = app(&fx).await;

    let resp = app
        .clone()
        .oneshot(post_json(
            "/v1/providers/claude/switch",
            r#"{"provider_id":"ghost"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let resp = app
        .clone()
        .oneshot(post_json("/v1/providers/claude/switch", "not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/v1/providers/claude/switch",
            r#"{"provider_id":"  "}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(get("/v1/providers/gemini/current"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "NO_CURRENT_PROVIDER");
}

#[tokio::test]
async fn unknown_routes_fall_through_to_404() {
    let fx = seeded().await;
    let app = app(&fx).await;

    let resp = app.oneshot(get("/v2/nothing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_catalog_reports_unavailable() {
    let fx = seeded().await;
    let mut cfg = fx.config();
    cfg.database_path = fx.dir.path().join("moved-away.db");
    let (coordinator, _writer) = fx.coordinator_with(cfg).await;
    assert!(!coordinator.is_available());
    let app = switchyard_router(SwitchyardState::new(coordinator, Arc::from(KEY)));

    let resp = app
        .clone()
        .oneshot(get("/v1/providers/claude"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(resp).await["error"]["code"], "STORE_UNAVAILABLE");

    let resp = app
        .oneshot(post_json(
            "/v1/providers/claude/switch",
            r#"{"provider_id":"p2"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    assert_eq!(fx.current_ids().await, vec!["p1".to_string()]);
    assert_eq!(fx.settings_endpoint().as_deref(), Some("https://one.example"));
}
