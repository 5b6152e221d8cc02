//! MPEG-2 Transport Stream (TS) muxing.
//!
//! This crate assembles self-contained TS buffers from elementary-stream
//! access units: PAT/PMT program tables (with MPEG-2 CRC-32), PES wrapping
//! with 33-bit PTS/DTS, 188-byte packetization with adaptation-field
//! stuffing, per-PID continuity counters and PCR insertion.

pub mod crc32;
pub mod error;
pub mod muxer;
pub mod packet;
pub mod pes;
pub mod psi;

pub use crc32::{mpeg2_crc32, validate_section_crc32};
pub use error::TsError;
pub use muxer::TsMuxer;
pub use packet::TsPacketHeader;
pub use psi::PmtStream;

/// Size of a transport stream packet in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// PAT PID (always 0x0000)
pub const PID_PAT: u16 = 0x0000;

/// PID carrying the single program's PMT.
pub const PID_PMT: u16 = 0x1000;

/// Elementary PID for the video stream.
pub const PID_VIDEO: u16 = 0x0100;

/// Elementary PID for the audio stream.
pub const PID_AUDIO: u16 = 0x0101;

/// PMT stream_type for H.264 (AVC) video.
pub const STREAM_TYPE_H264: u8 = 0x1B;

/// PMT stream_type for H.265 (HEVC) video.
pub const STREAM_TYPE_H265: u8 = 0x24;

/// PMT stream_type for AAC audio in ADTS framing.
pub const STREAM_TYPE_AAC_ADTS: u8 = 0x0F;

/// PES stream_id for the first video stream.
pub const STREAM_ID_VIDEO: u8 = 0xE0;

/// PES stream_id for the first audio stream.
pub const STREAM_ID_AUDIO: u8 = 0xC0;

/// Result type for TS muxing operations
pub type Result<T> = std::result::Result<T, TsError>;
