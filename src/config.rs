//! Service configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Both binaries load the same structure; each one
//! only reads the sections it needs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default namespace URI for the `g:` merchant-feed prefix
pub const DEFAULT_NAMESPACE: &str = "http://base.google.com/ns/1.0";

/// Default JPEG quality when neither the request nor the environment sets one
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

/// Default number of scopes each service keeps in working storage
pub const DEFAULT_RETENTION: usize = 8;

/// Default request body limit (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Working-storage configuration
    pub storage: StorageConfig,
    /// Feed metadata and item defaults
    pub feed: FeedConfig,
    /// Remote fetch policy
    pub fetch: FetchConfig,
    /// Image recompression settings
    pub images: ImageConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
    /// Maximum accepted request body, in bytes
    pub max_upload_bytes: usize,
}

/// Working-storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base directory under which inbound/outbound areas are created
    pub data_dir: PathBuf,
    /// How many request scopes are kept before the oldest is removed
    pub retention: usize,
}

/// Feed metadata and per-item defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Namespace URI bound to the `g` prefix
    pub namespace: String,
    /// Channel title
    pub title: String,
    /// Channel link
    pub link: String,
    /// Channel description
    pub description: String,
    /// Description used for items whose own description is absent or empty
    pub default_item_description: String,
}

/// Remote fetch policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Extra attempts after the first failure (0 = no retry)
    pub retries: u32,
}

/// Image recompression settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    /// JPEG quality used when a request does not specify one
    pub default_quality: u8,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            title: "Product feed".to_string(),
            link: "#".to_string(),
            description: "Product feed".to_string(),
            default_item_description: "Опис товару відсутній".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 0,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// # Arguments
    /// * `default_port` - Port used when `PORT` is unset or unparsable
    pub fn from_env(default_port: u16) -> Self {
        let feed_defaults = FeedConfig::default();
        let fetch_defaults = FetchConfig::default();

        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(default_port),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
            storage: StorageConfig {
                data_dir: env::var_os("DATA_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
                retention: env::var("STORAGE_RETENTION")
                    .ok()
                    .and_then(|r| r.parse().ok())
                    .filter(|r| *r > 0)
                    .unwrap_or(DEFAULT_RETENTION),
            },
            feed: FeedConfig {
                namespace: env::var("NS").unwrap_or(feed_defaults.namespace),
                title: env::var("META_TITLE").unwrap_or(feed_defaults.title),
                link: env::var("META_LINK").unwrap_or(feed_defaults.link),
                description: env::var("META_DESC").unwrap_or(feed_defaults.description),
                default_item_description: env::var("DEFAULT_ITEM_DESCRIPTION")
                    .ok()
                    .filter(|d| !d.is_empty())
                    .unwrap_or(feed_defaults.default_item_description),
            },
            fetch: FetchConfig {
                timeout: env::var("FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(fetch_defaults.timeout),
                retries: env::var("FETCH_RETRIES")
                    .ok()
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(fetch_defaults.retries),
            },
            images: ImageConfig {
                default_quality: env::var("JPEG_QUALITY")
                    .ok()
                    .and_then(|q| q.parse::<u8>().ok())
                    .filter(|q| *q <= 100)
                    .unwrap_or(DEFAULT_JPEG_QUALITY),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
