//! HTTP API integration tests
//!
//! Drives the router in-process with stub clients behind the trait seams,
//! checking status codes, response shapes, and the error envelope.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use shelfaware_common::{EventBus, Result};
use shelfaware_ui::scanner::ScanEngine;
use shelfaware_ui::store::{Coupon, ProductRecord, RowStore};
use shelfaware_ui::vision::{ProcessingStatus, VisionBackend};
use shelfaware_ui::{build_router, AppState};

/// Vision stub: starts cleanly, never detects anything
struct StubVision;

#[async_trait]
impl VisionBackend for StubVision {
    async fn start_capture(&self) -> Result<()> {
        Ok(())
    }

    async fn stop_capture(&self) -> Result<()> {
        Ok(())
    }

    async fn status(&self) -> Result<ProcessingStatus> {
        Ok(ProcessingStatus {
            processing: true,
            detected_text: None,
        })
    }

    async fn process_results(&self) -> Result<()> {
        Ok(())
    }

    fn stream_url(&self, token: Uuid) -> String {
        format!("http://vision.test/video_feed?token={}", token)
    }
}

/// Row-store stub with a fixed balance and coupon list
struct StubStore {
    points: i64,
}

#[async_trait]
impl RowStore for StubStore {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>> {
        Ok(Vec::new())
    }

    async fn clear_products(&self) -> Result<()> {
        Ok(())
    }

    async fn points_balance(&self) -> Result<i64> {
        Ok(self.points)
    }

    async fn add_points(&self, delta: i64) -> Result<i64> {
        Ok(self.points + delta)
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        Ok(vec![
            Coupon {
                id: 1,
                header: Some("Cheap one".to_string()),
                body: None,
                code: Some("CHEAP".to_string()),
                logo: None,
                points: 20,
            },
            Coupon {
                id: 2,
                header: Some("Expensive one".to_string()),
                body: None,
                code: Some("PRICEY".to_string()),
                logo: None,
                points: 500,
            },
        ])
    }
}

fn test_app(points: i64) -> axum::Router {
    let bus = EventBus::new(64);
    let engine = ScanEngine::new(
        Arc::new(StubVision),
        Arc::new(StubStore { points }),
        bus.clone(),
        Duration::from_secs(1),
        3,
    );
    let state = AppState::new(engine, Arc::new(StubStore { points }), bus, 10);
    build_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_module_and_status() {
    let app = test_app(0);

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "shelfaware-ui");
}

#[tokio::test]
async fn scan_status_starts_idle() {
    let app = test_app(0);

    let response = app
        .oneshot(Request::get("/scan/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["attempts"], 0);
    assert_eq!(json["max_attempts"], 3);
}

#[tokio::test]
async fn scan_start_enters_streaming_with_stream_url() {
    let app = test_app(0);

    let response = app
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "STREAMING");
    let stream_url = json["stream_url"].as_str().unwrap();
    assert!(stream_url.starts_with("http://vision.test/video_feed?token="));
}

#[tokio::test]
async fn second_start_while_active_is_a_conflict() {
    let app = test_app(0);

    let first = app
        .clone()
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = body_json(second).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn stop_after_start_returns_to_idle() {
    let app = test_app(0);

    app.clone()
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(Request::post("/scan/stop").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "IDLE");
}

#[tokio::test]
async fn product_is_not_found_before_a_scan_resolves() {
    let app = test_app(0);

    let response = app
        .oneshot(Request::get("/product").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn compare_without_a_resolved_scan_is_rejected() {
    let app = test_app(0);

    let response = app
        .oneshot(Request::post("/compare").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn points_endpoint_returns_the_balance() {
    let app = test_app(120);

    let response = app
        .oneshot(Request::get("/points").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["points"], 120);
}

#[tokio::test]
async fn coupons_are_marked_against_the_balance() {
    let app = test_app(120);

    let response = app
        .oneshot(Request::get("/coupons").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let coupons = json.as_array().unwrap();
    assert_eq!(coupons.len(), 2);
    // 120 covers the 20-point coupon but not the 500-point one
    assert_eq!(coupons[0]["points_fulfilled"], true);
    assert_eq!(coupons[1]["points_fulfilled"], false);
}

#[tokio::test]
async fn stream_error_while_streaming_rotates_the_token() {
    let app = test_app(0);

    let started = app
        .clone()
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let started = body_json(started).await;
    let old_url = started["stream_url"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::post("/scan/stream_error")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "STREAMING");
    assert_ne!(json["stream_url"].as_str().unwrap(), old_url);
    assert!(json["stream_notice"].is_string());
}

#[tokio::test]
async fn reset_returns_a_fresh_idle_session() {
    let app = test_app(0);

    app.clone()
        .oneshot(Request::post("/scan/start").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = app
        .oneshot(Request::post("/scan/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["attempts"], 0);
    assert!(json["detected_text"].is_null());
}
