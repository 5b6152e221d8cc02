//! HLS (HTTP Live Streaming) output.
//!
//! Renders master/media playlists from a fragment list and packages
//! individual fragments into self-contained MPEG-TS segments.

mod codec;
pub mod packetizer;
pub mod playlist;

pub use packetizer::HlsPacketizer;
pub use playlist::{render_master, render_media};
