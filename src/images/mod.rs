//! Image batch processing
//!
//! Recompression of single images and packaging of a batch into one archive.

pub mod archiver;
pub mod compressor;

pub use compressor::{compress, CompressedImage, Quality};
