//! Feature store client.
//!
//! Thin HTTP wrapper for the three endpoints the editor uses:
//! `GET /features/geojson`, `PATCH /features/{id}` and
//! `POST /features/bulk_update`. The [`FeatureStore`] trait is the seam the
//! persistence bridge writes through.

use std::time::Duration;

use async_trait::async_trait;
use canvas::convert::StoreFeatureCollection;
use canvas::doc::AttributeEdit;
use canvas::engine::GeometryUpdate;
use canvas::geom::Point;
use serde::{Deserialize, Serialize};

use crate::config::{EditorConfig, StoreTimeouts};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("feature store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Outcome of `POST /features/bulk_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    pub updated_count: usize,
    #[serde(default)]
    pub failed_ids: Vec<i64>,
}

#[async_trait]
pub trait FeatureStore: Send + Sync {
    async fn load_geojson(&self) -> Result<StoreFeatureCollection, StoreError>;
    async fn patch_geometry(&self, update: &GeometryUpdate) -> Result<(), StoreError>;
    async fn patch_field(&self, remote_id: i64, edit: &AttributeEdit) -> Result<(), StoreError>;
    async fn bulk_update(&self, updates: &[GeometryUpdate]) -> Result<BulkUpdateResult, StoreError>;
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct GeometryPatch<'a> {
    coordinates: &'a [Point],
    x_coord: f64,
    y_coord: f64,
}

#[derive(Serialize)]
struct BulkRequest<'a> {
    features: &'a [GeometryUpdate],
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpFeatureStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpFeatureStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeouts: StoreTimeouts) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| StoreError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &EditorConfig) -> Result<Self, StoreError> {
        Self::new(config.api_base.clone(), config.timeouts)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let response = request.send().await.map_err(|e| StoreError::Request(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| StoreError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Status { status: status.as_u16(), body: text });
        }
        Ok(text)
    }
}

#[async_trait]
impl FeatureStore for HttpFeatureStore {
    async fn load_geojson(&self) -> Result<StoreFeatureCollection, StoreError> {
        let text = self.send(self.http.get(self.url("/features/geojson"))).await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn patch_geometry(&self, update: &GeometryUpdate) -> Result<(), StoreError> {
        let body = GeometryPatch { coordinates: &update.coordinates, x_coord: update.x_coord, y_coord: update.y_coord };
        let url = self.url(&format!("/features/{}", update.remote_id));
        self.send(self.http.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn patch_field(&self, remote_id: i64, edit: &AttributeEdit) -> Result<(), StoreError> {
        let url = self.url(&format!("/features/{remote_id}"));
        self.send(self.http.patch(url).json(&edit.to_patch_body())).await?;
        Ok(())
    }

    async fn bulk_update(&self, updates: &[GeometryUpdate]) -> Result<BulkUpdateResult, StoreError> {
        let body = BulkRequest { features: updates };
        let text = self.send(self.http.post(self.url("/features/bulk_update")).json(&body)).await?;
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
