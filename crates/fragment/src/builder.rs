//! Fragment list construction from a parsed movie.

use media_types::{TrackKind, rescale};
use mp4::Movie;
use tracing::debug;

use crate::{Fragment, FragmentList, FragmentSample, TrackInfo};

/// Builds a [`FragmentList`] by walking samples in presentation order and
/// closing fragments at key-frame boundaries on the primary video track.
///
/// The walk is fully deterministic: timestamps are rescaled with integer
/// math and ties are broken by track order, so rebuilding the index for an
/// unchanged asset always yields an identical list.
pub struct FragmentListBuilder;

struct MergedSample {
    /// Presentation time rescaled to the fragment list timescale.
    pts_scaled: u64,
    sample: FragmentSample,
    /// May this sample start a new fragment?
    boundary: bool,
}

impl FragmentListBuilder {
    /// Build a fragment list targeting `fragment_duration` seconds per
    /// fragment. The target must be positive.
    pub fn build(movie: &Movie, fragment_duration: f64) -> FragmentList {
        debug_assert!(fragment_duration > 0.0);

        let primary_video = movie
            .tracks
            .iter()
            .position(|t| t.kind == TrackKind::Video);
        let timescale = primary_video
            .map(|i| movie.tracks[i].timescale)
            .unwrap_or_else(|| movie.tracks.first().map(|t| t.timescale).unwrap_or(1));

        let tracks: Vec<TrackInfo> = movie
            .tracks
            .iter()
            .map(|t| TrackInfo {
                kind: t.kind,
                codec: t.codec,
                timescale: t.timescale,
                nal_length_size: t.nal_length_size,
                channels: t.channels,
                sample_rate: t.sample_rate,
                codec_private: t.codec_private.clone(),
            })
            .collect();

        // Merge all tracks' samples into one presentation-ordered walk.
        let mut merged: Vec<MergedSample> = Vec::new();
        for (idx, track) in movie.tracks.iter().enumerate() {
            // Fragments close at key frames of the primary video track; with
            // no video track present the constraint is waived entirely.
            let boundary_track = match primary_video {
                Some(video) => idx == video,
                None => true,
            };
            for sample in &track.samples {
                merged.push(MergedSample {
                    pts_scaled: rescale(sample.pts, track.timescale, timescale),
                    sample: FragmentSample {
                        track: idx as u8,
                        offset: sample.offset,
                        size: sample.size,
                        pts: sample.pts,
                        dts: sample.dts,
                        keyframe: sample.keyframe,
                    },
                    boundary: boundary_track && sample.keyframe,
                });
            }
        }
        // Stable sort: equal timestamps keep track order, then sample order.
        merged.sort_by_key(|m| m.pts_scaled);

        let mut duration = movie
            .tracks
            .iter()
            .map(|t| rescale(t.duration, t.timescale, timescale))
            .max()
            .unwrap_or(0);
        if let Some(last) = merged.last() {
            duration = duration.max(last.pts_scaled);
        }

        let target_units = (fragment_duration * timescale as f64) as u64;
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut current: Vec<FragmentSample> = Vec::new();
        let mut start = merged.first().map(|m| m.pts_scaled).unwrap_or(0);

        for m in merged {
            if m.boundary && !current.is_empty() && m.pts_scaled >= start + target_units {
                fragments.push(Fragment {
                    sequence: fragments.len() as u32 + 1,
                    timestamp: start,
                    duration: m.pts_scaled - start,
                    timescale,
                    samples: std::mem::take(&mut current),
                });
                start = m.pts_scaled;
            }
            current.push(m.sample);
        }
        if !current.is_empty() {
            fragments.push(Fragment {
                sequence: fragments.len() as u32 + 1,
                timestamp: start,
                duration: duration.saturating_sub(start),
                timescale,
                samples: current,
            });
        }

        debug!(
            "built {} fragments over {:.3}s (target {:.1}s)",
            fragments.len(),
            duration as f64 / timescale as f64,
            fragment_duration
        );

        FragmentList {
            timescale,
            duration,
            fragment_duration,
            resolution: movie.resolution(),
            tracks,
            fragments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use media_types::Codec;
    use mp4::{Sample, Track};

    fn video_track(timescale: u32, samples: Vec<Sample>) -> Track {
        let duration = samples.last().map(|s| s.dts + 60).unwrap_or(0);
        Track {
            id: 1,
            kind: TrackKind::Video,
            codec: Codec::H264,
            timescale,
            duration,
            width: 1280,
            height: 720,
            channels: 0,
            sample_rate: 0,
            nal_length_size: 4,
            codec_private: Bytes::from_static(&[1, 0x64, 0, 0x1F, 0xFF, 0xE0, 0, 0, 1, 0, 0]),
            samples,
        }
    }

    /// 30 seconds of video at 600 units/s: one key frame every second,
    /// 10 frames per second.
    fn thirty_second_movie() -> Movie {
        let mut samples = Vec::new();
        let mut offset = 0u64;
        for i in 0..300u64 {
            let dts = i * 60;
            samples.push(Sample {
                offset,
                size: 100,
                dts,
                pts: dts,
                keyframe: i % 10 == 0,
            });
            offset += 100;
        }
        Movie {
            timescale: 1000,
            duration: 30_000,
            tracks: vec![video_track(600, samples)],
        }
    }

    #[test]
    fn test_thirty_seconds_in_ten_second_fragments() {
        let movie = thirty_second_movie();
        let list = FragmentListBuilder::build(&movie, 10.0);
        assert_eq!(list.count(), 3);
        assert_eq!(list.timescale, 600);
        assert_eq!(list.duration, 300 * 60);
        for (i, f) in list.fragments.iter().enumerate() {
            assert_eq!(f.sequence, i as u32 + 1);
            assert_eq!(f.duration, 6000);
            assert_eq!(f.samples.len(), 100);
        }
    }

    #[test]
    fn test_fragments_partition_timeline() {
        let movie = thirty_second_movie();
        let list = FragmentListBuilder::build(&movie, 7.0);
        // No gaps, no overlaps.
        let mut expected_start = list.fragments[0].timestamp;
        for f in &list.fragments {
            assert_eq!(f.timestamp, expected_start);
            expected_start += f.duration;
        }
        // Durations sum to the asset duration.
        let total: u64 = list.fragments.iter().map(|f| f.duration).sum();
        assert_eq!(total, list.duration);
        // Every sample is assigned exactly once, in order.
        let count: usize = list.fragments.iter().map(|f| f.samples.len()).sum();
        assert_eq!(count, 300);
    }

    #[test]
    fn test_builder_is_deterministic() {
        let movie = thirty_second_movie();
        let a = FragmentListBuilder::build(&movie, 10.0);
        let b = FragmentListBuilder::build(&movie, 10.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_asset_yields_single_fragment() {
        let mut movie = thirty_second_movie();
        movie.tracks[0].samples.truncate(30); // 3 seconds
        movie.tracks[0].duration = 30 * 60;
        let list = FragmentListBuilder::build(&movie, 10.0);
        assert_eq!(list.count(), 1);
        assert_eq!(list.fragments[0].samples.len(), 30);
        assert_eq!(list.fragments[0].duration, 30 * 60);
    }

    #[test]
    fn test_fragment_extends_to_next_keyframe() {
        // Key frames only every 15 seconds: a 10 s target cannot be honored,
        // so fragments stretch to the next key frame instead of splitting a
        // GOP.
        let mut samples = Vec::new();
        for i in 0..300u64 {
            let dts = i * 60;
            samples.push(Sample {
                offset: i * 100,
                size: 100,
                dts,
                pts: dts,
                keyframe: i % 150 == 0,
            });
        }
        let movie = Movie {
            timescale: 1000,
            duration: 30_000,
            tracks: vec![video_track(600, samples)],
        };
        let list = FragmentListBuilder::build(&movie, 10.0);
        assert_eq!(list.count(), 2);
        assert_eq!(list.fragments[0].duration, 150 * 60);
        assert!(
            list.fragments[0]
                .samples
                .iter()
                .skip(1)
                .all(|s| !s.keyframe)
        );
    }

    #[test]
    fn test_audio_only_splits_on_duration() {
        // 48 kHz AAC, 1024-sample frames, ~21.3 ms each; 30 seconds total.
        let frames = 30 * 48_000 / 1024;
        let samples: Vec<Sample> = (0..frames)
            .map(|i| Sample {
                offset: i * 200,
                size: 200,
                dts: i * 1024,
                pts: i * 1024,
                keyframe: true,
            })
            .collect();
        let movie = Movie {
            timescale: 1000,
            duration: 30_000,
            tracks: vec![Track {
                id: 1,
                kind: TrackKind::Audio,
                codec: Codec::Aac,
                timescale: 48_000,
                duration: frames * 1024,
                width: 0,
                height: 0,
                channels: 2,
                sample_rate: 48_000,
                nal_length_size: 0,
                codec_private: Bytes::from_static(&[0x11, 0x90]),
                samples,
            }],
        };
        let list = FragmentListBuilder::build(&movie, 10.0);
        assert_eq!(list.count(), 3);
        assert!(list.resolution.is_none());
        // Each fragment is within one frame of the 10 s target.
        for f in &list.fragments[..2] {
            let dur = f.relative_duration();
            assert!((dur - 10.0).abs() < 1024.0 / 48_000.0, "duration {dur}");
        }
    }

    #[test]
    fn test_interleaved_audio_follows_video_boundaries() {
        let movie = {
            let mut m = thirty_second_movie();
            let frames = 30 * 48_000 / 1024;
            let samples: Vec<Sample> = (0..frames)
                .map(|i| Sample {
                    offset: 1_000_000 + i * 200,
                    size: 200,
                    dts: i * 1024,
                    pts: i * 1024,
                    keyframe: true,
                })
                .collect();
            m.tracks.push(Track {
                id: 2,
                kind: TrackKind::Audio,
                codec: Codec::Aac,
                timescale: 48_000,
                duration: frames * 1024,
                width: 0,
                height: 0,
                channels: 2,
                sample_rate: 48_000,
                nal_length_size: 0,
                codec_private: Bytes::from_static(&[0x11, 0x90]),
                samples,
            });
            m
        };
        let list = FragmentListBuilder::build(&movie, 10.0);
        // Audio key frames never open a fragment: boundaries stay on video.
        assert_eq!(list.count(), 3);
        for f in &list.fragments {
            let first_video = f.samples.iter().find(|s| s.track == 0).unwrap();
            assert!(first_video.keyframe);
        }
        // Samples within a fragment are presentation-ordered.
        for f in &list.fragments {
            let mut last = 0u64;
            for s in &f.samples {
                let scaled = rescale(s.pts, list.tracks[s.track as usize].timescale, 600);
                assert!(scaled >= last);
                last = scaled;
            }
        }
    }
}
