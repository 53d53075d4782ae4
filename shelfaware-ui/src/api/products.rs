//! Product, points, and coupon API handlers
//!
//! GET /product, POST /compare, GET /points, GET /coupons

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use shelfaware_common::ScanEvent;

use crate::{
    error::{ApiError, ApiResult},
    models::ScanOutcome,
    store::Coupon,
    AppState,
};

/// GET /product
///
/// The product rows from the most recent resolved scan. 404 until a scan
/// has resolved.
pub async fn get_product(State(state): State<AppState>) -> ApiResult<Json<ScanOutcome>> {
    state
        .engine
        .outcome()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No resolved scan yet".to_string()))
}

/// POST /compare response
#[derive(Debug, Serialize)]
pub struct CompareResponse {
    /// Points granted for this comparison
    pub awarded: i64,
    /// New points balance
    pub points: i64,
}

/// POST /compare
///
/// A qualifying comparison action: award the fixed reward points and clear
/// the product rows so the next scan starts clean.
pub async fn compare(State(state): State<AppState>) -> ApiResult<Json<CompareResponse>> {
    if state.engine.outcome().await.is_none() {
        return Err(ApiError::BadRequest(
            "No resolved scan to compare".to_string(),
        ));
    }

    let total = state.store.add_points(state.reward_points).await?;
    state.store.clear_products().await?;

    tracing::info!(awarded = state.reward_points, total, "Comparison reward granted");
    state.bus.emit(ScanEvent::PointsAwarded {
        delta: state.reward_points,
        total,
        timestamp: Utc::now(),
    });

    Ok(Json(CompareResponse {
        awarded: state.reward_points,
        points: total,
    }))
}

/// GET /points response
#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub points: i64,
}

/// GET /points
pub async fn get_points(State(state): State<AppState>) -> ApiResult<Json<PointsResponse>> {
    let points = state.store.points_balance().await?;
    Ok(Json(PointsResponse { points }))
}

/// Coupon row with its redeemability computed against the current balance
#[derive(Debug, Serialize)]
pub struct CouponResponse {
    #[serde(flatten)]
    pub coupon: Coupon,
    /// Whether the current balance covers this coupon
    pub points_fulfilled: bool,
}

/// GET /coupons
pub async fn get_coupons(State(state): State<AppState>) -> ApiResult<Json<Vec<CouponResponse>>> {
    let points = state.store.points_balance().await?;
    let coupons = state.store.list_coupons().await?;

    let response = coupons
        .into_iter()
        .map(|coupon| CouponResponse {
            points_fulfilled: points >= coupon.points,
            coupon,
        })
        .collect();

    Ok(Json(response))
}

/// Build product/points/coupon routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/product", get(get_product))
        .route("/compare", post(compare))
        .route("/points", get(get_points))
        .route("/coupons", get(get_coupons))
}
