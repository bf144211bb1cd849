//! Feed builder
//!
//! Assembles a feed document from a raw document: feed metadata plus every
//! record mapped through the field mapper, in document order.

use super::mapper::{CanonicalItem, FieldMapper};
use super::record::RawDocument;
use crate::config::FeedConfig;
use serde::Serialize;
use tracing::{debug, warn};

/// Channel-level metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    /// Namespace URI bound to the `g` prefix
    pub namespace: String,
    /// Channel title
    pub title: String,
    /// Channel link
    pub link: String,
    /// Channel description
    pub description: String,
}

impl From<&FeedConfig> for FeedMeta {
    fn from(config: &FeedConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            title: config.title.clone(),
            link: config.link.clone(),
            description: config.description.clone(),
        }
    }
}

/// Metadata plus ordered canonical items; the unit of serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    meta: FeedMeta,
    items: Vec<CanonicalItem>,
}

impl FeedDocument {
    /// Create a document
    pub fn new(meta: FeedMeta, items: Vec<CanonicalItem>) -> Self {
        Self { meta, items }
    }

    /// Channel metadata
    pub fn meta(&self) -> &FeedMeta {
        &self.meta
    }

    /// Items in document order
    pub fn items(&self) -> &[CanonicalItem] {
        &self.items
    }
}

/// A record left out of the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// 1-based position of the record in document order
    pub position: usize,
    /// Why it was skipped
    pub reason: String,
}

/// Result of building a feed: the document plus skipped records
#[derive(Debug, Clone)]
pub struct FeedBuild {
    /// The assembled feed
    pub document: FeedDocument,
    /// Records that could not be mapped
    pub skipped: Vec<SkippedRecord>,
}

/// Build a feed document from a raw document
pub fn build_feed(raw: &RawDocument, config: &FeedConfig) -> FeedBuild {
    let mapper = FieldMapper::new(&config.default_item_description);
    let mut items = Vec::with_capacity(raw.records().len());
    let mut skipped = Vec::new();

    for (index, record) in raw.records().iter().enumerate() {
        match mapper.map(record) {
            Ok(item) => items.push(item),
            Err(defect) => {
                warn!(
                    position = index + 1,
                    reason = %defect.reason,
                    "Skipping unreadable catalog record"
                );
                skipped.push(SkippedRecord {
                    position: index + 1,
                    reason: defect.reason,
                });
            }
        }
    }

    debug!(
        items = items.len(),
        skipped = skipped.len(),
        "Built feed document"
    );

    FeedBuild {
        document: FeedDocument::new(FeedMeta::from(config), items),
        skipped,
    }
}
