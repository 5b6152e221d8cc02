//! Parsed movie, track and sample metadata.

use bytes::Bytes;
use media_types::{Codec, Resolution, TrackKind};

/// A single encoded sample: where it lives in the source file and when it
/// plays. Timestamps are in the owning track's native timescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub offset: u64,
    pub size: u32,
    pub dts: u64,
    pub pts: u64,
    pub keyframe: bool,
}

/// Track metadata plus its full sample table. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u32,
    pub kind: TrackKind,
    pub codec: Codec,
    pub timescale: u32,
    /// Track duration in native timescale units.
    pub duration: u64,
    pub width: u16,
    pub height: u16,
    pub channels: u8,
    pub sample_rate: u32,
    /// Length-prefix size of NAL units in video sample payloads (1, 2 or 4).
    pub nal_length_size: u8,
    /// Codec configuration needed to repackage samples: the `avcC`/`hvcC`
    /// payload for video, the AudioSpecificConfig for AAC.
    pub codec_private: Bytes,
    pub samples: Vec<Sample>,
}

impl Track {
    pub fn relative_duration(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }
}

/// A parsed MP4 movie: asset-level timing plus its tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    /// Movie timescale from `mvhd`.
    pub timescale: u32,
    /// Movie duration in `mvhd` units.
    pub duration: u64,
    pub tracks: Vec<Track>,
}

impl Movie {
    pub fn relative_duration(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.duration as f64 / self.timescale as f64
    }

    /// The primary video track: first `vide` track in `moov` order.
    pub fn video_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.video_track()
            .map(|t| Resolution::new(t.width as u32, t.height as u32))
    }
}
