//! Row-store client
//!
//! Product, points, and coupon records live in a hosted BaaS table service
//! reached over its PostgREST-style endpoint. The client is injected into
//! the scan engine and the API handlers as a trait object so tests can
//! substitute a fake instead of hitting the network.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use shelfaware_common::{Error, Result};

/// Default timeout for row-store requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Table holding the most recently resolved product rows
const PRODUCT_TABLE: &str = "product_information";

/// Single-row table holding the reward points balance
const POINTS_TABLE: &str = "Points";

/// Table of redeemable coupons
const COUPONS_TABLE: &str = "Coupons";

/// Row id of the points balance record
const POINTS_ROW_ID: i64 = 1;

/// Product record fetched after a detection resolves
///
/// The row-store schema is owned by the backend pipeline; unknown or absent
/// columns are tolerated rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    /// JSON object of nutrient name → amount, stored as text
    #[serde(default)]
    pub health_nutrients: Option<String>,
    /// JSON array of ingredient names, stored as text
    #[serde(default)]
    pub health_ingredients: Option<String>,
    #[serde(default)]
    pub health_index: Option<f64>,
    #[serde(default)]
    pub sustainability_biodegradable: Option<String>,
    #[serde(default)]
    pub sustainability_recyclable: Option<String>,
    #[serde(default)]
    pub sustainability_rating: Option<f64>,
    #[serde(default)]
    pub dustbin_color: Option<String>,
}

/// Redeemable coupon row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    /// Points required to redeem this coupon
    #[serde(default)]
    pub points: i64,
}

/// Row-store operations used by the workflow and the API layer
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Fetch all product rows written by the result-processing pipeline
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>>;

    /// Delete all product rows (post-comparison cleanup)
    async fn clear_products(&self) -> Result<()>;

    /// Current reward points balance
    async fn points_balance(&self) -> Result<i64>;

    /// Increment the points balance and return the new total
    async fn add_points(&self, delta: i64) -> Result<i64>;

    /// All coupon rows
    async fn list_coupons(&self) -> Result<Vec<Coupon>>;
}

/// PostgREST client for the hosted row-store
pub struct PostgrestStore {
    http_client: Client,
    base_url: String,
}

impl PostgrestStore {
    /// Create a new client for the given endpoint and API key
    ///
    /// The key is sent both as `apikey` and as a bearer token, as the
    /// hosted service expects.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Self {
        let mut headers = header::HeaderMap::new();
        if let Ok(value) = header::HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = header::HeaderValue::from_str(&format!("Bearer {}", api_key)) {
            headers.insert(header::AUTHORIZATION, value);
        }

        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .default_headers(headers)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    async fn check(&self, response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Error::Store(format!("{} failed ({}): {}", context, status, body)))
        }
    }
}

#[async_trait]
impl RowStore for PostgrestStore {
    async fn fetch_products(&self) -> Result<Vec<ProductRecord>> {
        let response = self
            .http_client
            .get(self.table_url(PRODUCT_TABLE))
            .query(&[("select", "*")])
            .send()
            .await?;

        let response = self.check(response, "Product fetch").await?;
        let products: Vec<ProductRecord> = response.json().await?;

        debug!(count = products.len(), "Fetched product rows");
        Ok(products)
    }

    async fn clear_products(&self) -> Result<()> {
        let response = self
            .http_client
            .delete(self.table_url(PRODUCT_TABLE))
            .query(&[("id", "not.is.null")])
            .header("Prefer", "return=minimal")
            .send()
            .await?;

        self.check(response, "Product cleanup").await?;
        debug!("Cleared product rows");
        Ok(())
    }

    async fn points_balance(&self) -> Result<i64> {
        let response = self
            .http_client
            .get(self.table_url(POINTS_TABLE))
            .query(&[
                ("select", "points".to_string()),
                ("id", format!("eq.{}", POINTS_ROW_ID)),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound("Points row not found".to_string()));
        }
        let response = self.check(response, "Points fetch").await?;
        let rows: Vec<PointsRow> = response.json().await?;

        // Absent row reads as a zero balance, matching the original UI
        Ok(rows.first().map(|r| r.points).unwrap_or(0))
    }

    async fn add_points(&self, delta: i64) -> Result<i64> {
        let current = self.points_balance().await?;
        let updated = current + delta;

        let response = self
            .http_client
            .patch(self.table_url(POINTS_TABLE))
            .query(&[("id", format!("eq.{}", POINTS_ROW_ID))])
            .header("Prefer", "return=representation")
            .json(&json!({ "points": updated }))
            .send()
            .await?;

        let response = self.check(response, "Points update").await?;
        let rows: Vec<PointsRow> = response.json().await?;

        rows.first()
            .map(|r| r.points)
            .ok_or_else(|| Error::Store("Points update returned no row".to_string()))
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let response = self
            .http_client
            .get(self.table_url(COUPONS_TABLE))
            .query(&[("select", "*")])
            .send()
            .await?;

        let response = self.check(response, "Coupon fetch").await?;
        let coupons: Vec<Coupon> = response.json().await?;

        debug!(count = coupons.len(), "Fetched coupon rows");
        Ok(coupons)
    }
}

#[derive(Debug, Deserialize)]
struct PointsRow {
    points: i64,
}

// ============================================================================
// Tests
// ============================================================================
