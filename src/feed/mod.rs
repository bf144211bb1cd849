//! Catalog-to-feed transformation
//!
//! Pure pipeline from catalog XML to merchant-feed XML:
//! raw records → canonical items → feed document → rendered bytes.

pub mod builder;
pub mod mapper;
pub mod record;
pub mod serializer;

pub use builder::{build_feed, FeedBuild, FeedDocument, FeedMeta, SkippedRecord};
pub use mapper::{CanonicalItem, EmptyValuePolicy, FieldMapper, EMPTY_VALUE_POLICY};
pub use record::{RawDocument, RawRecord};
