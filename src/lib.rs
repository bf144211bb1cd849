//! Catalog Services Library
//!
//! Two small HTTP services built on shared modules:
//! - the feed service turns product-catalog XML into a merchant RSS feed;
//! - the image service recompresses image batches into a downloadable zip.
//!
//! The binaries live in `src/bin/`.

pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod images;
pub mod server;
pub mod services;
