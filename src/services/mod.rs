//! Service layer for business logic
//!
//! This module contains the services behind the HTTP handlers, keeping
//! request parsing separate from transformation and storage lifecycle.

pub mod batch;
pub mod feed;
pub mod source;
pub mod storage;

pub use batch::ImageBatchService;
pub use feed::FeedService;
pub use source::{SourceAcquirer, UploadedFile};
pub use storage::WorkingStorage;
