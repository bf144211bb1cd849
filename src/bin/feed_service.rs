//! Feed service
//!
//! Converts uploaded or fetched product-catalog XML into a merchant RSS feed.

use catalog_services::api;
use catalog_services::config::Config;
use catalog_services::server;
use catalog_services::services::{FeedService, SourceAcquirer, WorkingStorage};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    // Load configuration
    let config = Config::from_env(8080);
    info!("Configuration loaded: {:?}", config);

    let storage = WorkingStorage::new(
        config.storage.data_dir.join("uploads"),
        config.storage.data_dir.join("transformed"),
    );
    storage.bootstrap().await?;

    let acquirer = SourceAcquirer::new(&config.fetch)?;
    let service = Arc::new(
        FeedService::new(config.feed.clone(), storage, acquirer)
            .with_retention(config.storage.retention),
    );

    let app = server::with_layers(api::feed_router(service), config.server.max_upload_bytes);
    server::serve(app, &config.server_addr(), "Feed service").await
}
