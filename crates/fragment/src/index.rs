//! Persisted fragment index codec.
//!
//! The index is a deterministic binary encoding of a [`FragmentList`],
//! including enough per-fragment sample metadata to serve segment requests
//! without re-parsing the source container. The format is versioned: a
//! magic/version mismatch or any truncation decodes to [`IndexError`] and
//! callers treat the asset as having no index at all.

use bytes::{BufMut, Bytes, BytesMut};
use media_types::{Codec, Resolution, TrackKind};

use crate::{Fragment, FragmentList, FragmentSample, IndexError, TrackInfo};

const MAGIC: [u8; 4] = *b"FGIX";
const VERSION: u16 = 1;

/// Serialize a fragment list. `read_index(&write_index(x)) == x` holds
/// attribute-for-attribute.
pub fn write_index(list: &FragmentList) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(&MAGIC);
    buf.put_u16(VERSION);

    buf.put_u32(list.timescale);
    buf.put_u64(list.duration);
    buf.put_f64(list.fragment_duration);
    match &list.resolution {
        Some(r) => {
            buf.put_u8(1);
            buf.put_u32(r.width);
            buf.put_u32(r.height);
        }
        None => buf.put_u8(0),
    }

    buf.put_u8(list.tracks.len() as u8);
    for track in &list.tracks {
        buf.put_u8(match track.kind {
            TrackKind::Video => 0,
            TrackKind::Audio => 1,
        });
        buf.put_u8(match track.codec {
            Codec::H264 => 0,
            Codec::H265 => 1,
            Codec::Aac => 2,
        });
        buf.put_u32(track.timescale);
        buf.put_u8(track.nal_length_size);
        buf.put_u8(track.channels);
        buf.put_u32(track.sample_rate);
        buf.put_u16(track.codec_private.len() as u16);
        buf.put_slice(&track.codec_private);
    }

    buf.put_u32(list.fragments.len() as u32);
    for fragment in &list.fragments {
        buf.put_u64(fragment.timestamp);
        buf.put_u64(fragment.duration);
        buf.put_u32(fragment.samples.len() as u32);
        for s in &fragment.samples {
            buf.put_u8(s.track);
            buf.put_u64(s.offset);
            buf.put_u32(s.size);
            buf.put_u64(s.pts);
            buf.put_u64(s.dts);
            buf.put_u8(s.keyframe as u8);
        }
    }

    buf.freeze()
}

/// Decode a persisted index back into a fragment list.
pub fn read_index(data: &[u8]) -> Result<FragmentList, IndexError> {
    let mut r = IndexReader::new(data);

    let magic = r.bytes(4)?;
    if magic != MAGIC {
        return Err(IndexError::Magic);
    }
    let version = r.u16()?;
    if version != VERSION {
        return Err(IndexError::Version(version));
    }

    let timescale = r.u32()?;
    let duration = r.u64()?;
    let fragment_duration = r.f64()?;
    if !fragment_duration.is_finite() {
        return Err(IndexError::invalid("non-finite fragment duration"));
    }
    let resolution = match r.u8()? {
        0 => None,
        1 => Some(Resolution::new(r.u32()?, r.u32()?)),
        v => return Err(IndexError::invalid(format!("resolution flag {v}"))),
    };

    let track_count = r.u8()? as usize;
    let mut tracks = Vec::with_capacity(track_count);
    for _ in 0..track_count {
        let kind = match r.u8()? {
            0 => TrackKind::Video,
            1 => TrackKind::Audio,
            v => return Err(IndexError::invalid(format!("track kind tag {v}"))),
        };
        let codec = match r.u8()? {
            0 => Codec::H264,
            1 => Codec::H265,
            2 => Codec::Aac,
            v => return Err(IndexError::invalid(format!("codec tag {v}"))),
        };
        let timescale = r.u32()?;
        let nal_length_size = r.u8()?;
        let channels = r.u8()?;
        let sample_rate = r.u32()?;
        let private_len = r.u16()? as usize;
        let codec_private = Bytes::copy_from_slice(r.bytes(private_len)?);
        tracks.push(TrackInfo {
            kind,
            codec,
            timescale,
            nal_length_size,
            channels,
            sample_rate,
            codec_private,
        });
    }

    let fragment_count = r.u32()? as usize;
    let mut fragments = Vec::with_capacity(fragment_count.min(4096));
    for i in 0..fragment_count {
        let timestamp = r.u64()?;
        let duration = r.u64()?;
        let sample_count = r.u32()? as usize;
        let mut samples = Vec::with_capacity(sample_count.min(4096));
        for _ in 0..sample_count {
            let track = r.u8()?;
            if track as usize >= track_count {
                return Err(IndexError::invalid(format!(
                    "sample references track {track} of {track_count}"
                )));
            }
            samples.push(FragmentSample {
                track,
                offset: r.u64()?,
                size: r.u32()?,
                pts: r.u64()?,
                dts: r.u64()?,
                keyframe: r.u8()? != 0,
            });
        }
        fragments.push(Fragment {
            sequence: i as u32 + 1,
            timestamp,
            duration,
            timescale,
            samples,
        });
    }

    if r.remaining() != 0 {
        return Err(IndexError::invalid(format!(
            "{} trailing bytes after fragment data",
            r.remaining()
        )));
    }

    Ok(FragmentList {
        timescale,
        duration,
        fragment_duration,
        resolution,
        tracks,
        fragments,
    })
}

/// Bounds-checked big-endian reader over the raw index bytes.
struct IndexReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> IndexReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8], IndexError> {
        if self.pos + n > self.data.len() {
            return Err(IndexError::Truncated {
                expected: n,
                actual: self.data.len() - self.pos,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, IndexError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, IndexError> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, IndexError> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, IndexError> {
        let b = self.bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn f64(&mut self) -> Result<f64, IndexError> {
        Ok(f64::from_bits(self.u64()?))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
