use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use app_api::AppContext;
use tracker_app::{AppState, TrackerConfig};
use tracker_db::{InfluxConnection, InfluxStore, SqliteStore};

use http_api::HttpState;

struct TestApp {
    _temp_dir: tempfile::TempDir,
    router: axum::Router,
}

fn build_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(temp_dir.path().join("http.sqlite")).expect("store");
    let app_state = AppState::with_store(TrackerConfig::default(), Arc::new(store));
    let router = http_api::router(HttpState::new(AppContext::new(app_state)));
    TestApp {
        _temp_dir: temp_dir,
        router,
    }
}

fn unreachable_app() -> axum::Router {
    let connection = InfluxConnection {
        url: "http://127.0.0.1:1".to_string(),
        token: "token".to_string(),
        org: "org".to_string(),
        bucket: "bucket".to_string(),
    };
    let store = InfluxStore::new(&connection).expect("influx store");
    let app_state = AppState::with_store(TrackerConfig::default(), Arc::new(store));
    http_api::router(HttpState::new(AppContext::new(app_state)))
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&body).expect("json body")
}

fn post_track(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/track")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn track_then_read_metrics() {
    let app = build_app();

    let response = app
        .router
        .clone()
        .oneshot(post_track(
            r#"[
                {"projectName":"web","agentName":"build","model":"openai/gpt-4o","inputTokens":100,"outputTokens":50},
                {"projectName":"web","agentName":"plan","model":"openai/gpt-4o","inputTokens":10,"additions":4,"filesChanged":1}
            ]"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"success": true}));
    // Writes are stamped with the current millisecond; the query window ends before "now".
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let response = app
        .router
        .oneshot(get("/api/metrics?range=1h&project=web"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["summary"]["total"], 160.0);
    assert_eq!(payload["summary"]["additions"], 4.0);
    assert_eq!(payload["changes"]["total"], 100.0);
    assert_eq!(payload["agents"][0]["name"], "build");
    assert_eq!(payload["agents"][0]["value"], 150.0);
    let buckets = payload["timeline"].as_array().map(Vec::len).unwrap_or(0);
    assert!((60..=61).contains(&buckets), "{buckets} buckets");
    assert!(payload.get("previousSummary").is_some());
}

#[tokio::test]
async fn malformed_track_body_is_bad_request() {
    let app = build_app();
    let response = app
        .router
        .oneshot(post_track(r#"{"inputTokens":"lots"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = json_body(response).await;
    assert_eq!(payload["code"], "invalid_input");
    assert!(payload["error"].is_string());
}

#[tokio::test]
async fn negative_counts_are_rejected() {
    let app = build_app();
    let response = app
        .router
        .oneshot(post_track(r#"[{"inputTokens":-5}]"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn invalid_dates_are_bad_request() {
    let app = build_app();
    let response = app
        .router
        .oneshot(get("/api/metrics?startDate=yesterday"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_input");
}

#[tokio::test]
async fn health_reports_backend() {
    let app = build_app();
    let response = app
        .router
        .oneshot(get("/api/health"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = json_body(response).await;
    assert_eq!(payload["ok"], true);
    assert_eq!(payload["backend"], "sqlite");
}

#[tokio::test]
async fn unreachable_store_is_bad_gateway() {
    let router = unreachable_app();

    let response = router
        .clone()
        .oneshot(get("/api/metrics?range=3h"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = json_body(response).await;
    assert!(payload["error"].as_str().is_some_and(|e| e.starts_with("store error")));
    assert!(payload.get("code").is_none());

    let response = router
        .clone()
        .oneshot(post_track(r#"[{"inputTokens":1}]"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let response = router
        .oneshot(get("/api/health"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = build_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/track")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*")
    );
}
