//! Fragment-to-segment packaging.
//!
//! Turns one fragment plus its raw sample payloads into a single MPEG-TS
//! buffer that a standard HLS client can decode with no knowledge of
//! neighboring segments: PAT/PMT up front, parameter sets re-injected at
//! key frames, ADTS framing for audio, timestamps rescaled to 90 kHz.

use bytes::Bytes;
use fragment::{Fragment, FragmentList, TrackInfo};
use media_types::{Codec, TrackKind, rescale};
use tracing::trace;
use ts::{
    PID_VIDEO, Result, STREAM_ID_AUDIO, STREAM_ID_VIDEO, STREAM_TYPE_AAC_ADTS, STREAM_TYPE_H264,
    STREAM_TYPE_H265, TsError, TsMuxer, psi::PmtStream,
};

use crate::codec::{AUD_H264, AUD_H265, AdtsContext, annexb_prelude, append_annexb, parse_avcc,
    parse_hvcc};

const PCR_TIMESCALE: u32 = 90_000;

enum StreamState {
    Video {
        /// Annex-B prelude (start-coded parameter sets) for key frames.
        prelude: Vec<u8>,
        aud: &'static [u8],
        nal_length_size: u8,
    },
    Audio {
        adts: AdtsContext,
    },
}

struct Stream {
    pid: u16,
    stream_id: u8,
    timescale: u32,
    state: StreamState,
}

pub struct HlsPacketizer;

impl HlsPacketizer {
    /// Mux `fragment` into one self-contained TS segment.
    ///
    /// `samples` are the raw payloads returned by the sample reader, in
    /// the fragment's stored order.
    pub fn packetize(
        list: &FragmentList,
        fragment: &Fragment,
        samples: &[Bytes],
    ) -> Result<Bytes> {
        if fragment.samples.is_empty() {
            return Err(TsError::EmptyFragment);
        }
        if samples.len() != fragment.samples.len() {
            return Err(TsError::invalid_sample(format!(
                "{} payloads for {} samples",
                samples.len(),
                fragment.samples.len()
            )));
        }

        let streams = build_streams(&list.tracks)?;
        let pcr_pid = streams
            .iter()
            .find(|s| matches!(s.state, StreamState::Video { .. }))
            .map(|s| s.pid)
            .unwrap_or_else(|| streams[0].pid);

        let mut muxer = TsMuxer::new();
        muxer.write_pat();
        let pmt_streams: Vec<PmtStream> = list
            .tracks
            .iter()
            .zip(&streams)
            .map(|(track, stream)| PmtStream {
                pid: stream.pid,
                stream_type: stream_type_for(track.codec),
            })
            .collect();
        muxer.write_pmt(pcr_pid, &pmt_streams);

        for (sample, payload) in fragment.samples.iter().zip(samples) {
            let stream = streams
                .get(sample.track as usize)
                .ok_or_else(|| {
                    TsError::invalid_sample(format!("sample references track {}", sample.track))
                })?;

            let pts = rescale(sample.pts, stream.timescale, PCR_TIMESCALE);
            let dts = rescale(sample.dts, stream.timescale, PCR_TIMESCALE);

            match &stream.state {
                StreamState::Video {
                    prelude,
                    aud,
                    nal_length_size,
                } => {
                    let mut es = Vec::with_capacity(payload.len() + 64);
                    es.extend_from_slice(aud);
                    if sample.keyframe {
                        es.extend_from_slice(prelude);
                    }
                    append_annexb(&mut es, payload, *nal_length_size)?;

                    let pcr = (stream.pid == pcr_pid).then_some(dts);
                    muxer.write_access_unit(
                        stream.pid,
                        stream.stream_id,
                        pts,
                        Some(dts),
                        sample.keyframe,
                        pcr,
                        &es,
                    );
                }
                StreamState::Audio { adts } => {
                    let header = adts.header(payload.len())?;
                    let mut es = Vec::with_capacity(payload.len() + 7);
                    es.extend_from_slice(&header);
                    es.extend_from_slice(payload);

                    let pcr = (stream.pid == pcr_pid).then_some(dts);
                    muxer.write_access_unit(
                        stream.pid,
                        stream.stream_id,
                        pts,
                        None,
                        sample.keyframe,
                        pcr,
                        &es,
                    );
                }
            }
        }

        let out = muxer.finish();
        trace!(
            "packetized fragment {}: {} samples, {} bytes",
            fragment.sequence,
            samples.len(),
            out.len()
        );
        Ok(out)
    }
}

fn build_streams(tracks: &[TrackInfo]) -> Result<Vec<Stream>> {
    if tracks.is_empty() {
        return Err(TsError::invalid_sample("fragment list carries no tracks"));
    }
    tracks
        .iter()
        .enumerate()
        .map(|(idx, track)| {
            let pid = PID_VIDEO + idx as u16;
            let (stream_id, state) = match track.kind {
                TrackKind::Video => {
                    let (sets, aud) = match track.codec {
                        Codec::H264 => (parse_avcc(&track.codec_private)?, AUD_H264),
                        Codec::H265 => (parse_hvcc(&track.codec_private)?, AUD_H265),
                        Codec::Aac => {
                            return Err(TsError::codec_config("AAC sample entry on a video track"));
                        }
                    };
                    (
                        STREAM_ID_VIDEO,
                        StreamState::Video {
                            prelude: annexb_prelude(&sets),
                            aud,
                            nal_length_size: track.nal_length_size,
                        },
                    )
                }
                TrackKind::Audio => (
                    STREAM_ID_AUDIO,
                    StreamState::Audio {
                        adts: AdtsContext::from_asc(&track.codec_private)?,
                    },
                ),
            };
            Ok(Stream {
                pid,
                stream_id,
                timescale: track.timescale,
                state,
            })
        })
        .collect()
}

fn stream_type_for(codec: Codec) -> u8 {
    match codec {
        Codec::H264 => STREAM_TYPE_H264,
        Codec::H265 => STREAM_TYPE_H265,
        Codec::Aac => STREAM_TYPE_AAC_ADTS,
    }
}
