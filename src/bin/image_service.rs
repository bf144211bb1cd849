//! Image service
//!
//! Recompresses uploaded image batches to JPEG and serves them as one zip.

use catalog_services::api;
use catalog_services::config::Config;
use catalog_services::images::Quality;
use catalog_services::server;
use catalog_services::services::{ImageBatchService, WorkingStorage};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    // Load configuration
    let config = Config::from_env(8081);
    info!("Configuration loaded: {:?}", config);

    let images_dir = config.storage.data_dir.join("images");
    let storage = WorkingStorage::new(images_dir.join("inbound"), images_dir.join("outbound"));
    storage.bootstrap().await?;

    let quality = Quality::new(config.images.default_quality)?;
    let service = Arc::new(
        ImageBatchService::new(storage, quality).with_retention(config.storage.retention),
    );

    let app = server::with_layers(api::image_router(service), config.server.max_upload_bytes);
    server::serve(app, &config.server_addr(), "Image service").await
}
