//! Fragment list model.
//!
//! A [`FragmentList`] is built once per asset (by the builder or by decoding
//! a persisted index) and is read-only afterwards. It carries everything a
//! request needs to serve playlists and segments: fragment timing, sample
//! byte ranges and per-track packaging info.

use bytes::Bytes;
use media_types::{Codec, Resolution, TrackKind};

/// One sample's worth of metadata inside a fragment.
///
/// `track` indexes [`FragmentList::tracks`]; timestamps are in that track's
/// native timescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentSample {
    pub track: u8,
    pub offset: u64,
    pub size: u32,
    pub pts: u64,
    pub dts: u64,
    pub keyframe: bool,
}

/// A contiguous, key-frame-aligned slice of the asset timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// 1-based position in the list, stable once assigned.
    pub sequence: u32,
    /// Start time in `timescale` units.
    pub timestamp: u64,
    /// Length in `timescale` units.
    pub duration: u64,
    pub timescale: u32,
    /// Member samples in presentation order.
    pub samples: Vec<FragmentSample>,
}

impl Fragment {
    pub fn relative_duration(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }

    pub fn relative_timestamp(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.timestamp as f64 / self.timescale as f64
    }
}

/// Per-track packaging info carried alongside the fragments so segments can
/// be muxed without the original `moov` tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub kind: TrackKind,
    pub codec: Codec,
    pub timescale: u32,
    pub nal_length_size: u8,
    pub channels: u8,
    pub sample_rate: u32,
    /// `avcC`/`hvcC` payload for video, AudioSpecificConfig for AAC.
    pub codec_private: Bytes,
}

/// Ordered fragments plus asset-level metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentList {
    pub timescale: u32,
    /// Total asset duration in `timescale` units.
    pub duration: u64,
    /// Configured target fragment duration in seconds.
    pub fragment_duration: f64,
    pub resolution: Option<Resolution>,
    pub tracks: Vec<TrackInfo>,
    pub fragments: Vec<Fragment>,
}

impl FragmentList {
    pub fn count(&self) -> usize {
        self.fragments.len()
    }

    /// Fragment by zero-based position.
    pub fn get(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    pub fn relative_duration(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }

    /// First video track, if the asset has one.
    pub fn video_track(&self) -> Option<(usize, &TrackInfo)> {
        self.tracks
            .iter()
            .enumerate()
            .find(|(_, t)| t.kind == TrackKind::Video)
    }
}
