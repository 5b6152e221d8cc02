//! MP4 (ISOBMFF) container parsing.
//!
//! This crate reads the metadata tree of an MP4 file (`moov` and its
//! children) and produces per-track sample tables: byte offsets, sizes,
//! decode/presentation timestamps and key-frame flags. Sample payloads
//! (`mdat`) are never loaded; a parsed [`Movie`] is enough to locate any
//! sample in the source file later.

mod boxes;
pub mod error;
mod movie;
mod parser;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::Mp4Error;
pub use movie::{Movie, Sample, Track};

/// Result type for MP4 parsing operations
pub type Result<T> = std::result::Result<T, Mp4Error>;
