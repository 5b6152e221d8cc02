//! Movie parsing: top-level box scan plus `moov` tree extraction.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use bytes::Bytes;
use media_types::{Codec, TrackKind};
use tracing::debug;

use crate::boxes::{BoxIter, BoxView, FieldReader, expect_box, find_box, fourcc_display};
use crate::{Movie, Mp4Error, Result, Sample, Track};

/// Bytes in a visual sample entry body before child boxes begin
/// (ISO 14496-12 VisualSampleEntry, minus the 8-byte box header).
const VISUAL_SAMPLE_ENTRY_HEADER: usize = 70;

/// Bytes in an audio sample entry body before child boxes begin.
const AUDIO_SAMPLE_ENTRY_HEADER: usize = 28;

impl Movie {
    /// Parse an MP4 file from a readable, seekable source.
    ///
    /// Only metadata tables are read eagerly: the top-level box list is
    /// scanned and the `moov` body is loaded, but `mdat` payload bytes are
    /// never touched. Works for arbitrarily large files.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Movie> {
        let moov = read_moov(reader)?;
        parse_moov(&moov)
    }
}

/// Scan top-level boxes, seeking past everything except `moov`.
fn read_moov<R: Read + Seek>(reader: &mut R) -> Result<Bytes> {
    reader.seek(SeekFrom::Start(0))?;

    loop {
        let mut header = [0u8; 16];
        match reader.read_exact(&mut header[..8]) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Mp4Error::MissingBox { fourcc: "moov" });
            }
            Err(e) => return Err(e.into()),
        }

        let size32 = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let fourcc: [u8; 4] = [header[4], header[5], header[6], header[7]];
        let is_moov = fourcc == *b"moov";

        let body_size = match size32 {
            0 => {
                // Box extends to end of file.
                if is_moov {
                    let mut body = Vec::new();
                    reader.read_to_end(&mut body)?;
                    return Ok(Bytes::from(body));
                }
                return Err(Mp4Error::MissingBox { fourcc: "moov" });
            }
            1 => {
                reader.read_exact(&mut header[8..16])?;
                let ext = u64::from_be_bytes([
                    header[8], header[9], header[10], header[11], header[12], header[13],
                    header[14], header[15],
                ]);
                if ext < 16 {
                    return Err(Mp4Error::malformed(format!(
                        "box `{}` has invalid extended size {ext}",
                        fourcc_display(&fourcc)
                    )));
                }
                ext - 16
            }
            s if s < 8 => {
                return Err(Mp4Error::malformed(format!(
                    "box `{}` has invalid size {s}",
                    fourcc_display(&fourcc)
                )));
            }
            s => s as u64 - 8,
        };

        if is_moov {
            let mut body = vec![0u8; body_size as usize];
            reader.read_exact(&mut body)?;
            return Ok(Bytes::from(body));
        }

        debug!(
            "skipping top-level box `{}` ({} bytes)",
            fourcc_display(&fourcc),
            body_size
        );
        reader.seek(SeekFrom::Current(body_size as i64))?;
    }
}

fn parse_moov(data: &Bytes) -> Result<Movie> {
    let mvhd = expect_box(data, 0, data.len(), b"mvhd")?;
    let (timescale, duration) = parse_timing(&data[mvhd.body_start..mvhd.body_end])?;
    if timescale == 0 {
        return Err(Mp4Error::malformed("mvhd timescale is zero"));
    }

    let mut tracks = Vec::new();
    for child in BoxIter::new(data, 0, data.len()) {
        let child = child?;
        if child.fourcc == *b"trak"
            && let Some(track) = parse_trak(data, &child)?
        {
            tracks.push(track);
        }
    }

    if tracks.is_empty() {
        return Err(Mp4Error::malformed("no audio or video tracks"));
    }

    Ok(Movie {
        timescale,
        duration,
        tracks,
    })
}

/// Parse `mvhd`/`mdhd`-shaped timing: `(timescale, duration)`.
fn parse_timing(body: &[u8]) -> Result<(u32, u64)> {
    let mut r = FieldReader::new(body);
    let version = r.u8()?;
    r.skip(3)?; // flags
    match version {
        0 => {
            r.skip(8)?; // creation + modification
            let timescale = r.u32()?;
            let duration = r.u32()? as u64;
            Ok((timescale, duration))
        }
        1 => {
            r.skip(16)?;
            let timescale = r.u32()?;
            let duration = r.u64()?;
            Ok((timescale, duration))
        }
        v => Err(Mp4Error::malformed(format!("unknown header version {v}"))),
    }
}

fn parse_tkhd_track_id(body: &[u8]) -> Result<u32> {
    let mut r = FieldReader::new(body);
    let version = r.u8()?;
    r.skip(3)?;
    match version {
        0 => r.skip(8)?,
        1 => r.skip(16)?,
        v => {
            return Err(Mp4Error::malformed(format!("unknown tkhd version {v}")));
        }
    }
    r.u32()
}

fn parse_trak(data: &Bytes, trak: &BoxView) -> Result<Option<Track>> {
    let tkhd = expect_box(data, trak.body_start, trak.body_end, b"tkhd")?;
    let id = parse_tkhd_track_id(&data[tkhd.body_start..tkhd.body_end])?;

    let mdia = expect_box(data, trak.body_start, trak.body_end, b"mdia")?;
    let mdhd = expect_box(data, mdia.body_start, mdia.body_end, b"mdhd")?;
    let (timescale, duration) = parse_timing(&data[mdhd.body_start..mdhd.body_end])?;
    if timescale == 0 {
        return Err(Mp4Error::malformed(format!(
            "track {id} has zero timescale"
        )));
    }

    let hdlr = expect_box(data, mdia.body_start, mdia.body_end, b"hdlr")?;
    let handler = parse_handler(&data[hdlr.body_start..hdlr.body_end])?;
    let kind = match &handler {
        b"vide" => TrackKind::Video,
        b"soun" => TrackKind::Audio,
        other => {
            debug!(
                "skipping track {id} with handler `{}`",
                fourcc_display(other)
            );
            return Ok(None);
        }
    };

    let minf = expect_box(data, mdia.body_start, mdia.body_end, b"minf")?;
    let stbl = expect_box(data, minf.body_start, minf.body_end, b"stbl")?;
    let stsd = expect_box(data, stbl.body_start, stbl.body_end, b"stsd")?;

    let info = parse_stsd(data, &stsd)?;
    if info.codec.kind() != kind {
        return Err(Mp4Error::malformed(format!(
            "track {id}: `{}` sample entry under a {kind} handler",
            info.codec
        )));
    }

    let samples = parse_sample_table(data, &stbl)?;
    if samples.is_empty() {
        debug!("skipping track {id}: empty sample table");
        return Ok(None);
    }

    Ok(Some(Track {
        id,
        kind,
        codec: info.codec,
        timescale,
        duration,
        width: info.width,
        height: info.height,
        channels: info.channels,
        sample_rate: info.sample_rate,
        nal_length_size: info.nal_length_size,
        codec_private: info.codec_private,
        samples,
    }))
}

fn parse_handler(body: &[u8]) -> Result<[u8; 4]> {
    let mut r = FieldReader::new(body);
    r.skip(4)?; // version + flags
    r.skip(4)?; // pre_defined
    Ok([r.u8()?, r.u8()?, r.u8()?, r.u8()?])
}

struct CodecInfo {
    codec: Codec,
    width: u16,
    height: u16,
    channels: u8,
    sample_rate: u32,
    nal_length_size: u8,
    codec_private: Bytes,
}

fn parse_stsd(data: &Bytes, stsd: &BoxView) -> Result<CodecInfo> {
    let body = &data[stsd.body_start..stsd.body_end];
    let mut r = FieldReader::new(body);
    r.skip(4)?; // version + flags
    let entry_count = r.u32()?;
    if entry_count == 0 {
        return Err(Mp4Error::malformed("stsd has no sample entries"));
    }

    let entry = crate::boxes::box_at(data, stsd.body_start + 8, stsd.body_end)?
        .ok_or_else(|| Mp4Error::malformed("stsd entry truncated"))?;

    match &entry.fourcc {
        b"avc1" | b"avc3" => parse_visual_entry(data, &entry, Codec::H264, b"avcC"),
        b"hvc1" | b"hev1" => parse_visual_entry(data, &entry, Codec::H265, b"hvcC"),
        b"mp4a" => parse_audio_entry(data, &entry),
        other => Err(Mp4Error::UnsupportedCodec {
            fourcc: fourcc_display(other),
        }),
    }
}

fn parse_visual_entry(
    data: &Bytes,
    entry: &BoxView,
    codec: Codec,
    config_fourcc: &'static [u8; 4],
) -> Result<CodecInfo> {
    let body = &data[entry.body_start..entry.body_end];
    let mut r = FieldReader::new(body);
    r.skip(24)?; // reserved, data_ref_index, pre_defined
    let width = r.u16()?;
    let height = r.u16()?;

    let children_start = entry.body_start + VISUAL_SAMPLE_ENTRY_HEADER;
    if children_start > entry.body_end {
        return Err(Mp4Error::malformed("visual sample entry truncated"));
    }

    let config = find_box(data, children_start, entry.body_end, *config_fourcc)?.ok_or_else(
        || {
            Mp4Error::malformed(format!(
                "`{}` sample entry without `{}`",
                fourcc_display(&entry.fourcc),
                fourcc_display(config_fourcc)
            ))
        },
    )?;
    let codec_private = data.slice(config.body_start..config.body_end);

    let nal_length_size = match codec {
        // avcC: lengthSizeMinusOne in byte 4
        Codec::H264 if codec_private.len() >= 7 => (codec_private[4] & 0x03) + 1,
        // hvcC: lengthSizeMinusOne in byte 21
        Codec::H265 if codec_private.len() >= 23 => (codec_private[21] & 0x03) + 1,
        _ => {
            return Err(Mp4Error::malformed(format!(
                "truncated `{}` configuration",
                fourcc_display(config_fourcc)
            )));
        }
    };

    Ok(CodecInfo {
        codec,
        width,
        height,
        channels: 0,
        sample_rate: 0,
        nal_length_size,
        codec_private,
    })
}

fn parse_audio_entry(data: &Bytes, entry: &BoxView) -> Result<CodecInfo> {
    let body = &data[entry.body_start..entry.body_end];
    let mut r = FieldReader::new(body);
    r.skip(16)?; // reserved, data_ref_index, version, revision, vendor
    let channels = r.u16()?;
    r.skip(2)?; // sample size
    r.skip(4)?; // pre_defined + reserved
    let sample_rate = r.u32()? >> 16; // 16.16 fixed point

    let children_start = entry.body_start + AUDIO_SAMPLE_ENTRY_HEADER;
    if children_start > entry.body_end {
        return Err(Mp4Error::malformed("audio sample entry truncated"));
    }

    let esds = find_box(data, children_start, entry.body_end, *b"esds")?
        .ok_or_else(|| Mp4Error::malformed("mp4a sample entry without `esds`"))?;
    let codec_private = parse_esds(&data[esds.body_start..esds.body_end])?;

    Ok(CodecInfo {
        codec: Codec::Aac,
        width: 0,
        height: 0,
        channels: channels.min(u8::MAX as u16) as u8,
        sample_rate,
        nal_length_size: 0,
        codec_private,
    })
}

/// Walk the `esds` descriptor chain down to the DecoderSpecificInfo, which
/// holds the AudioSpecificConfig needed for ADTS repackaging.
fn parse_esds(body: &[u8]) -> Result<Bytes> {
    let mut r = FieldReader::new(body);
    r.skip(4)?; // version + flags

    let (tag, _) = read_descriptor_header(&mut r)?;
    if tag != 0x03 {
        return Err(Mp4Error::malformed(format!(
            "esds: expected ES descriptor, found tag {tag:#04x}"
        )));
    }
    r.skip(2)?; // ES_ID
    let es_flags = r.u8()?;
    if es_flags & 0x80 != 0 {
        r.skip(2)?; // dependsOn_ES_ID
    }
    if es_flags & 0x40 != 0 {
        let url_len = r.u8()? as usize;
        r.skip(url_len)?;
    }
    if es_flags & 0x20 != 0 {
        r.skip(2)?; // OCR_ES_ID
    }

    let (tag, _) = read_descriptor_header(&mut r)?;
    if tag != 0x04 {
        return Err(Mp4Error::malformed(format!(
            "esds: expected DecoderConfig descriptor, found tag {tag:#04x}"
        )));
    }
    let object_type = r.u8()?;
    // MPEG-4 AAC plus the MPEG-2 AAC profiles
    if object_type != 0x40 && !(0x66..=0x68).contains(&object_type) {
        return Err(Mp4Error::UnsupportedCodec {
            fourcc: format!("mp4a/{object_type:#04x}"),
        });
    }
    r.skip(12)?; // streamType, bufferSizeDB, maxBitrate, avgBitrate

    let (tag, size) = read_descriptor_header(&mut r)?;
    if tag != 0x05 {
        return Err(Mp4Error::malformed(
            "esds: missing DecoderSpecificInfo descriptor",
        ));
    }
    if size == 0 || size > r.remaining() {
        return Err(Mp4Error::malformed("esds: truncated AudioSpecificConfig"));
    }

    let mut asc = vec![0u8; size];
    for byte in asc.iter_mut() {
        *byte = r.u8()?;
    }
    Ok(Bytes::from(asc))
}

/// Descriptor header: tag byte plus a 7-bits-per-byte expandable size.
fn read_descriptor_header(r: &mut FieldReader) -> Result<(u8, usize)> {
    let tag = r.u8()?;
    let mut size = 0usize;
    for _ in 0..4 {
        let b = r.u8()?;
        size = (size << 7) | (b & 0x7F) as usize;
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok((tag, size))
}

struct StscEntry {
    first_chunk: u32,
    samples_per_chunk: u32,
}

fn parse_sample_table(data: &Bytes, stbl: &BoxView) -> Result<Vec<Sample>> {
    // stts: decode deltas
    let stts = expect_box(data, stbl.body_start, stbl.body_end, b"stts")?;
    let mut r = FieldReader::new(&data[stts.body_start..stts.body_end]);
    r.skip(4)?;
    let stts_count = r.u32()?;
    let mut dts_values = Vec::new();
    let mut dts = 0u64;
    for _ in 0..stts_count {
        let sample_count = r.u32()?;
        let delta = r.u32()?;
        for _ in 0..sample_count {
            dts_values.push(dts);
            dts += delta as u64;
        }
    }

    // stsz: sizes
    let stsz = expect_box(data, stbl.body_start, stbl.body_end, b"stsz")?;
    let mut r = FieldReader::new(&data[stsz.body_start..stsz.body_end]);
    r.skip(4)?;
    let uniform_size = r.u32()?;
    let sample_count = r.u32()? as usize;
    let sizes: Vec<u32> = if uniform_size != 0 {
        vec![uniform_size; sample_count]
    } else {
        let mut sizes = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            sizes.push(r.u32()?);
        }
        sizes
    };

    if dts_values.len() != sample_count {
        return Err(Mp4Error::malformed(format!(
            "stts covers {} samples, stsz declares {sample_count}",
            dts_values.len()
        )));
    }

    // ctts: composition offsets (optional)
    let mut comp_offsets = vec![0i64; sample_count];
    if let Some(ctts) = find_box(data, stbl.body_start, stbl.body_end, *b"ctts")? {
        let mut r = FieldReader::new(&data[ctts.body_start..ctts.body_end]);
        r.skip(4)?;
        let entry_count = r.u32()?;
        let mut idx = 0usize;
        for _ in 0..entry_count {
            let run = r.u32()?;
            let offset = r.i32()? as i64;
            for _ in 0..run {
                if idx >= sample_count {
                    return Err(Mp4Error::malformed("ctts covers more samples than stsz"));
                }
                comp_offsets[idx] = offset;
                idx += 1;
            }
        }
    }

    // stss: sync samples (optional; absence means every sample is a key frame)
    let sync: Option<Vec<u32>> =
        match find_box(data, stbl.body_start, stbl.body_end, *b"stss")? {
            Some(stss) => {
                let mut r = FieldReader::new(&data[stss.body_start..stss.body_end]);
                r.skip(4)?;
                let count = r.u32()?;
                let mut numbers = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    numbers.push(r.u32()?);
                }
                Some(numbers)
            }
            None => None,
        };

    // stsc: sample-to-chunk runs
    let stsc = expect_box(data, stbl.body_start, stbl.body_end, b"stsc")?;
    let mut r = FieldReader::new(&data[stsc.body_start..stsc.body_end]);
    r.skip(4)?;
    let stsc_count = r.u32()?;
    let mut runs = Vec::with_capacity(stsc_count as usize);
    for _ in 0..stsc_count {
        let first_chunk = r.u32()?;
        let samples_per_chunk = r.u32()?;
        r.skip(4)?; // sample_description_index
        runs.push(StscEntry {
            first_chunk,
            samples_per_chunk,
        });
    }

    // stco / co64: chunk offsets
    let chunk_offsets: Vec<u64> =
        match find_box(data, stbl.body_start, stbl.body_end, *b"stco")? {
            Some(stco) => {
                let mut r = FieldReader::new(&data[stco.body_start..stco.body_end]);
                r.skip(4)?;
                let count = r.u32()?;
                let mut offsets = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    offsets.push(r.u32()? as u64);
                }
                offsets
            }
            None => {
                let co64 = expect_box(data, stbl.body_start, stbl.body_end, b"co64")?;
                let mut r = FieldReader::new(&data[co64.body_start..co64.body_end]);
                r.skip(4)?;
                let count = r.u32()?;
                let mut offsets = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    offsets.push(r.u64()?);
                }
                offsets
            }
        };

    // Flatten chunk runs into per-sample file offsets.
    let mut samples = Vec::with_capacity(sample_count);
    let mut sample_idx = 0usize;
    let mut next_sync = 0usize;
    'runs: for (i, run) in runs.iter().enumerate() {
        let first = run.first_chunk as usize;
        let last = if i + 1 < runs.len() {
            runs[i + 1].first_chunk as usize
        } else {
            chunk_offsets.len() + 1
        };
        if first == 0 || first > last {
            return Err(Mp4Error::malformed("stsc chunk runs out of order"));
        }

        for chunk in first..last {
            if sample_idx == sample_count {
                break 'runs;
            }
            let Some(&chunk_offset) = chunk_offsets.get(chunk - 1) else {
                return Err(Mp4Error::malformed(
                    "stsc references a chunk beyond the chunk offset table",
                ));
            };

            let mut offset = chunk_offset;
            for _ in 0..run.samples_per_chunk {
                if sample_idx == sample_count {
                    break;
                }
                let size = sizes[sample_idx];
                let dts = dts_values[sample_idx];
                let pts = (dts as i64 + comp_offsets[sample_idx]).max(0) as u64;
                let keyframe = match &sync {
                    Some(numbers) => {
                        // stss numbers are 1-based and sorted
                        if next_sync < numbers.len()
                            && numbers[next_sync] as usize == sample_idx + 1
                        {
                            next_sync += 1;
                            true
                        } else {
                            false
                        }
                    }
                    None => true,
                };
                samples.push(Sample {
                    offset,
                    size,
                    dts,
                    pts,
                    keyframe,
                });
                offset += size as u64;
                sample_idx += 1;
            }
        }
    }

    if sample_idx != sample_count {
        return Err(Mp4Error::malformed(format!(
            "chunk tables cover {sample_idx} of {sample_count} samples"
        )));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_video_audio_movie() {
        let video = TestTrack::video(600, &[(1500, 60, true), (800, 60, false), (900, 60, false)]);
        let audio = TestTrack::audio(48_000, &[(300, 1024), (310, 1024)]);
        let file = build_movie_file(1000, &[video, audio]);

        let movie = Movie::parse(&mut Cursor::new(&file)).unwrap();
        assert_eq!(movie.timescale, 1000);
        assert_eq!(movie.tracks.len(), 2);

        let v = &movie.tracks[0];
        assert_eq!(v.kind, media_types::TrackKind::Video);
        assert_eq!(v.codec, media_types::Codec::H264);
        assert_eq!(v.timescale, 600);
        assert_eq!(v.width, 1280);
        assert_eq!(v.height, 720);
        assert_eq!(v.nal_length_size, 4);
        assert_eq!(v.samples.len(), 3);
        assert!(v.samples[0].keyframe);
        assert!(!v.samples[1].keyframe);
        assert_eq!(v.samples[0].dts, 0);
        assert_eq!(v.samples[1].dts, 60);
        assert_eq!(v.samples[2].dts, 120);
        assert_eq!(v.samples[0].size, 1500);

        let a = &movie.tracks[1];
        assert_eq!(a.kind, media_types::TrackKind::Audio);
        assert_eq!(a.codec, media_types::Codec::Aac);
        assert_eq!(a.channels, 2);
        assert_eq!(a.sample_rate, 48_000);
        assert!(a.samples.iter().all(|s| s.keyframe));
        assert_eq!(a.samples[1].dts, 1024);
    }

    #[test]
    fn test_sample_offsets_point_into_mdat() {
        let video = TestTrack::video(600, &[(100, 60, true), (200, 60, false)]);
        let file = build_movie_file(1000, &[video]);
        let movie = Movie::parse(&mut Cursor::new(&file)).unwrap();

        let samples = &movie.tracks[0].samples;
        // Samples are laid out back to back inside mdat.
        assert_eq!(samples[1].offset, samples[0].offset + 100);
        // The payload at the recorded offset is the synthesized sample.
        let expected = video_sample_payload(100, true);
        let start = samples[0].offset as usize;
        assert_eq!(&file[start..start + 100], &expected[..]);
    }

    #[test]
    fn test_missing_moov() {
        let mut file = Vec::new();
        file.extend_from_slice(&make_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso2"));
        file.extend_from_slice(&make_box(b"mdat", &[0u8; 32]));
        let err = Movie::parse(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err, Mp4Error::MissingBox { fourcc: "moov" }));
    }

    #[test]
    fn test_missing_sample_tables() {
        // A trak whose stbl lacks stts.
        let stbl = make_box(b"stbl", &make_stsd(&make_avc_entry(640, 480)));
        let minf = make_box(b"minf", &stbl);
        let mut mdia = Vec::new();
        mdia.extend_from_slice(&make_mdhd(600, 600));
        mdia.extend_from_slice(&make_hdlr(b"vide"));
        mdia.extend_from_slice(&minf);
        let mut trak = Vec::new();
        trak.extend_from_slice(&make_tkhd(1));
        trak.extend_from_slice(&make_box(b"mdia", &mdia));
        let mut moov = Vec::new();
        moov.extend_from_slice(&make_mvhd(1000, 1000));
        moov.extend_from_slice(&make_box(b"trak", &trak));
        let file = make_box(b"moov", &moov);

        let err = Movie::parse(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err, Mp4Error::MissingBox { fourcc: "stts" }));
    }

    #[test]
    fn test_unsupported_codec() {
        let mut track = TestTrack::video(600, &[(100, 60, true)]);
        track.entry_fourcc = *b"vp09";
        let file = build_movie_file(1000, &[track]);
        let err = Movie::parse(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err, Mp4Error::UnsupportedCodec { .. }));
    }

    #[test]
    fn test_stts_stsz_mismatch() {
        let mut track = TestTrack::video(600, &[(100, 60, true), (100, 60, false)]);
        track.extra_stsz_entries = 1;
        let file = build_movie_file(1000, &[track]);
        let err = Movie::parse(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err, Mp4Error::Malformed { .. }));
    }

    #[test]
    fn test_non_av_tracks_are_skipped() {
        let video = TestTrack::video(600, &[(100, 60, true)]);
        let mut text = TestTrack::video(600, &[(10, 60, true)]);
        text.handler = *b"text";
        let file = build_movie_file(1000, &[video, text]);
        let movie = Movie::parse(&mut Cursor::new(&file)).unwrap();
        assert_eq!(movie.tracks.len(), 1);
    }

    #[test]
    fn test_parse_timing_version1() {
        let mut payload = Vec::new();
        payload.push(1u8); // version
        payload.extend_from_slice(&[0u8; 3]); // flags
        payload.extend_from_slice(&[0u8; 16]); // creation + modification (64-bit)
        payload.extend_from_slice(&90_000u32.to_be_bytes());
        payload.extend_from_slice(&(u32::MAX as u64 + 5).to_be_bytes());
        let (timescale, duration) = parse_timing(&payload).unwrap();
        assert_eq!(timescale, 90_000);
        assert_eq!(duration, u32::MAX as u64 + 5);
    }

    #[test]
    fn test_esds_rejects_non_aac_object_type() {
        // 0x6B is MP3 in the objectTypeIndication table.
        let esds = make_esds_with_object_type(&[0x11, 0x90], 0x6B);
        let err = parse_esds(&esds[8..]).unwrap_err();
        assert!(matches!(err, Mp4Error::UnsupportedCodec { .. }));
    }

    #[test]
    fn test_ctts_shifts_pts() {
        let mut track = TestTrack::video(600, &[(100, 60, true), (100, 60, false)]);
        track.composition_offsets = Some(vec![120, 0]);
        let file = build_movie_file(1000, &[track]);
        let movie = Movie::parse(&mut Cursor::new(&file)).unwrap();
        let samples = &movie.tracks[0].samples;
        assert_eq!(samples[0].dts, 0);
        assert_eq!(samples[0].pts, 120);
        assert_eq!(samples[1].pts, 60);
    }
}
