//! API module
//!
//! HTTP handlers and router construction for both services.

pub mod feed;
pub mod images;

use crate::services::{FeedService, ImageBatchService};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health indicator
    pub status: String,
    /// Crate version
    pub version: String,
    /// Which service answered
    pub service: String,
}

/// Routes of the feed service
pub fn feed_router(service: Arc<FeedService>) -> Router {
    Router::new()
        .route("/health", get(|| health_check("feed")))
        .route("/upload", post(feed::upload_catalog))
        .route("/fetch", post(feed::fetch_catalog))
        .route("/download/:filename", get(feed::download_feed))
        .with_state(service)
}

/// Routes of the image service
pub fn image_router(service: Arc<ImageBatchService>) -> Router {
    Router::new()
        .route("/health", get(|| health_check("images")))
        .route("/upload", post(images::upload_images))
        .route("/download", get(images::download_latest))
        .route("/download/:batch", get(images::download_batch))
        .with_state(service)
}

async fn health_check(service: &'static str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: service.to_string(),
    })
}
