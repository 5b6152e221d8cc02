//! Fragmentation of parsed MP4 movies into fixed-duration playback
//! fragments, plus the persisted binary index that lets later requests
//! serve those fragments without re-parsing the container.

mod builder;
pub mod error;
pub mod index;
mod list;
pub mod reader;

pub use builder::FragmentListBuilder;
pub use error::{IndexError, ReadError};
pub use list::{Fragment, FragmentList, FragmentSample, TrackInfo};
