//! Synthetic MP4 builders for tests.
//!
//! Available to local tests and, behind the `test-utils` feature, to
//! downstream crates that need complete parseable movie files without
//! shipping binary fixtures.

/// Default SPS emitted into synthetic `avcC` boxes.
pub const TEST_SPS: &[u8] = &[0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40];
/// Default PPS emitted into synthetic `avcC` boxes.
pub const TEST_PPS: &[u8] = &[0x68, 0xEB, 0xE3, 0xCB];
/// AudioSpecificConfig: AAC-LC, 48 kHz (index 3), stereo.
pub const TEST_ASC: &[u8] = &[0x11, 0x90];

/// Bytes in a visual sample entry body before child boxes begin.
const VISUAL_SAMPLE_ENTRY_HEADER: usize = 70;

/// Bytes in an audio sample entry body before child boxes begin.
const AUDIO_SAMPLE_ENTRY_HEADER: usize = 28;

pub fn make_box(fourcc: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let size = (8 + body.len()) as u32;
    let mut out = Vec::with_capacity(size as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(fourcc);
    out.extend_from_slice(body);
    out
}

pub fn make_full_box(fourcc: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.push(version);
    body.push(((flags >> 16) & 0xFF) as u8);
    body.push(((flags >> 8) & 0xFF) as u8);
    body.push((flags & 0xFF) as u8);
    body.extend_from_slice(payload);
    make_box(fourcc, &body)
}

pub fn make_mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes()); // creation
    payload.extend_from_slice(&0u32.to_be_bytes()); // modification
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    payload.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    payload.extend_from_slice(&[0u8; 10]); // reserved
    payload.extend_from_slice(&identity_matrix());
    payload.extend_from_slice(&[0u8; 24]); // pre_defined
    payload.extend_from_slice(&2u32.to_be_bytes()); // next_track_ID
    make_full_box(b"mvhd", 0, 0, &payload)
}

pub fn make_tkhd(track_id: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes()); // creation
    payload.extend_from_slice(&0u32.to_be_bytes()); // modification
    payload.extend_from_slice(&track_id.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes()); // reserved
    payload.extend_from_slice(&0u32.to_be_bytes()); // duration
    payload.extend_from_slice(&[0u8; 8]); // reserved
    payload.extend_from_slice(&[0u8; 8]); // layer, alternate_group, volume, reserved
    payload.extend_from_slice(&identity_matrix());
    payload.extend_from_slice(&0u32.to_be_bytes()); // width (16.16)
    payload.extend_from_slice(&0u32.to_be_bytes()); // height (16.16)
    make_full_box(b"tkhd", 0, 0x000007, &payload)
}

pub fn make_mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.extend_from_slice(&0x55C4u16.to_be_bytes()); // language "und"
    payload.extend_from_slice(&0u16.to_be_bytes()); // pre_defined
    make_full_box(b"mdhd", 0, 0, &payload)
}

pub fn make_hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes()); // pre_defined
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0u8; 12]); // reserved
    payload.push(0); // empty name
    make_full_box(b"hdlr", 0, 0, &payload)
}

pub fn make_stsd(entry: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&1u32.to_be_bytes());
    payload.extend_from_slice(entry);
    make_full_box(b"stsd", 0, 0, &payload)
}

pub fn make_stts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (count, delta) in entries {
        payload.extend_from_slice(&count.to_be_bytes());
        payload.extend_from_slice(&delta.to_be_bytes());
    }
    make_full_box(b"stts", 0, 0, &payload)
}

pub fn make_ctts(entries: &[(u32, i32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (count, offset) in entries {
        payload.extend_from_slice(&count.to_be_bytes());
        payload.extend_from_slice(&offset.to_be_bytes());
    }
    make_full_box(b"ctts", 1, 0, &payload)
}

pub fn make_stss(sample_numbers: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(sample_numbers.len() as u32).to_be_bytes());
    for n in sample_numbers {
        payload.extend_from_slice(&n.to_be_bytes());
    }
    make_full_box(b"stss", 0, 0, &payload)
}

pub fn make_stsz(sizes: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0u32.to_be_bytes()); // per-sample sizes follow
    payload.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
    for size in sizes {
        payload.extend_from_slice(&size.to_be_bytes());
    }
    make_full_box(b"stsz", 0, 0, &payload)
}

pub fn make_stsc(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (first_chunk, samples_per_chunk) in entries {
        payload.extend_from_slice(&first_chunk.to_be_bytes());
        payload.extend_from_slice(&samples_per_chunk.to_be_bytes());
        payload.extend_from_slice(&1u32.to_be_bytes()); // sample_description_index
    }
    make_full_box(b"stsc", 0, 0, &payload)
}

pub fn make_stco(offsets: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for offset in offsets {
        payload.extend_from_slice(&offset.to_be_bytes());
    }
    make_full_box(b"stco", 0, 0, &payload)
}

pub fn make_avcc(sps: &[u8], pps: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.push(1); // configurationVersion
    payload.push(sps.get(1).copied().unwrap_or(0x64)); // profile
    payload.push(sps.get(2).copied().unwrap_or(0x00)); // compatibility
    payload.push(sps.get(3).copied().unwrap_or(0x1F)); // level
    payload.push(0xFF); // lengthSizeMinusOne = 3 (4-byte prefixes)
    payload.push(0xE1); // one SPS
    payload.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    payload.extend_from_slice(sps);
    payload.push(1); // one PPS
    payload.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    payload.extend_from_slice(pps);
    make_box(b"avcC", &payload)
}

pub fn make_visual_entry(fourcc: &[u8; 4], width: u16, height: u16, children: &[u8]) -> Vec<u8> {
    let body_len = VISUAL_SAMPLE_ENTRY_HEADER + children.len();
    let total = 8 + body_len;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(fourcc);
    let mut header = [0u8; VISUAL_SAMPLE_ENTRY_HEADER];
    header[24..26].copy_from_slice(&width.to_be_bytes());
    header[26..28].copy_from_slice(&height.to_be_bytes());
    header[41] = 0x18; // depth
    out.extend_from_slice(&header);
    out.extend_from_slice(children);
    out
}

pub fn make_avc_entry(width: u16, height: u16) -> Vec<u8> {
    make_visual_entry(b"avc1", width, height, &make_avcc(TEST_SPS, TEST_PPS))
}

pub fn make_esds(asc: &[u8]) -> Vec<u8> {
    make_esds_with_object_type(asc, 0x40)
}

pub fn make_esds_with_object_type(asc: &[u8], object_type: u8) -> Vec<u8> {
    let dsi_len = asc.len();
    let dcd_len = 13 + 2 + dsi_len; // fixed fields + DSI header
    let esd_len = 3 + 2 + dcd_len; // ES fields + DCD header

    let mut payload = Vec::new();
    payload.push(0x03); // ES_Descriptor
    payload.push(esd_len as u8);
    payload.extend_from_slice(&1u16.to_be_bytes()); // ES_ID
    payload.push(0); // no optional fields
    payload.push(0x04); // DecoderConfigDescriptor
    payload.push(dcd_len as u8);
    payload.push(object_type);
    payload.push(0x15); // streamType audio
    payload.extend_from_slice(&[0, 0, 0]); // bufferSizeDB
    payload.extend_from_slice(&0u32.to_be_bytes()); // maxBitrate
    payload.extend_from_slice(&0u32.to_be_bytes()); // avgBitrate
    payload.push(0x05); // DecoderSpecificInfo
    payload.push(dsi_len as u8);
    payload.extend_from_slice(asc);
    make_full_box(b"esds", 0, 0, &payload)
}

pub fn make_audio_entry(channels: u16, sample_rate: u32, asc: &[u8]) -> Vec<u8> {
    let children = make_esds(asc);
    let body_len = AUDIO_SAMPLE_ENTRY_HEADER + children.len();
    let total = 8 + body_len;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(b"mp4a");
    let mut header = [0u8; AUDIO_SAMPLE_ENTRY_HEADER];
    header[16..18].copy_from_slice(&channels.to_be_bytes());
    header[18..20].copy_from_slice(&16u16.to_be_bytes()); // sample size
    header[24..28].copy_from_slice(&(sample_rate << 16).to_be_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&children);
    out
}

fn identity_matrix() -> [u8; 36] {
    let mut m = [0u8; 36];
    m[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    m[16..20].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    m[32..36].copy_from_slice(&0x4000_0000u32.to_be_bytes());
    m
}

/// Deterministic payload for a synthetic video sample: one length-prefixed
/// NAL unit (IDR for key frames) padded with a fixed filler byte.
pub fn video_sample_payload(size: u32, keyframe: bool) -> Vec<u8> {
    let size = size as usize;
    assert!(size >= 5, "video samples need room for a NAL header");
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(&((size - 4) as u32).to_be_bytes());
    out.push(if keyframe { 0x65 } else { 0x41 });
    out.resize(size, 0xAA);
    out
}

/// Deterministic payload for a synthetic AAC sample.
pub fn audio_sample_payload(size: u32) -> Vec<u8> {
    vec![0xBB; size as usize]
}

/// Specification of one synthetic track for [`build_movie_file`].
pub struct TestTrack {
    pub entry_fourcc: [u8; 4],
    pub handler: [u8; 4],
    pub timescale: u32,
    /// (size, duration) per sample; key-frame flags for video.
    pub sample_sizes: Vec<u32>,
    pub sample_durations: Vec<u32>,
    pub keyframes: Vec<bool>,
    pub composition_offsets: Option<Vec<i32>>,
    /// Pad stsz with this many phantom entries (for mismatch tests).
    pub extra_stsz_entries: usize,
}

impl TestTrack {
    /// Video track: `(size, duration, keyframe)` per sample.
    pub fn video(timescale: u32, samples: &[(u32, u32, bool)]) -> Self {
        Self {
            entry_fourcc: *b"avc1",
            handler: *b"vide",
            timescale,
            sample_sizes: samples.iter().map(|s| s.0).collect(),
            sample_durations: samples.iter().map(|s| s.1).collect(),
            keyframes: samples.iter().map(|s| s.2).collect(),
            composition_offsets: None,
            extra_stsz_entries: 0,
        }
    }

    /// Audio track: `(size, duration)` per sample.
    pub fn audio(timescale: u32, samples: &[(u32, u32)]) -> Self {
        Self {
            entry_fourcc: *b"mp4a",
            handler: *b"soun",
            timescale,
            sample_sizes: samples.iter().map(|s| s.0).collect(),
            sample_durations: samples.iter().map(|s| s.1).collect(),
            keyframes: vec![true; samples.len()],
            composition_offsets: None,
            extra_stsz_entries: 0,
        }
    }

    fn is_video(&self) -> bool {
        self.handler == *b"vide"
    }

    fn total_duration(&self) -> u32 {
        self.sample_durations.iter().sum()
    }

    fn payloads(&self) -> Vec<Vec<u8>> {
        self.sample_sizes
            .iter()
            .zip(&self.keyframes)
            .map(|(&size, &key)| {
                if self.is_video() {
                    video_sample_payload(size, key)
                } else {
                    audio_sample_payload(size)
                }
            })
            .collect()
    }
}

/// Assemble a complete MP4 file (`ftyp` + `moov` + `mdat`) whose sample
/// tables reference real byte ranges inside the generated `mdat`.
pub fn build_movie_file(movie_timescale: u32, tracks: &[TestTrack]) -> Vec<u8> {
    let ftyp = make_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso2avc1mp41");

    // Pass one with zeroed chunk offsets to learn the moov size.
    let placeholder: Vec<Vec<u32>> = tracks
        .iter()
        .map(|t| vec![0u32; t.sample_sizes.len()])
        .collect();
    let moov_size = build_moov(movie_timescale, tracks, &placeholder).len();

    // Real offsets: samples laid out back to back, one chunk per sample.
    let mdat_body_start = (ftyp.len() + moov_size + 8) as u32;
    let mut cursor = mdat_body_start;
    let mut offsets = Vec::with_capacity(tracks.len());
    let mut mdat_body = Vec::new();
    for track in tracks {
        let mut track_offsets = Vec::with_capacity(track.sample_sizes.len());
        for payload in track.payloads() {
            track_offsets.push(cursor);
            cursor += payload.len() as u32;
            mdat_body.extend_from_slice(&payload);
        }
        offsets.push(track_offsets);
    }

    let moov = build_moov(movie_timescale, tracks, &offsets);
    assert_eq!(moov.len(), moov_size);

    let mut file = ftyp;
    file.extend_from_slice(&moov);
    file.extend_from_slice(&make_box(b"mdat", &mdat_body));
    file
}

fn build_moov(movie_timescale: u32, tracks: &[TestTrack], offsets: &[Vec<u32>]) -> Vec<u8> {
    let max_relative = tracks
        .iter()
        .map(|t| {
            if t.timescale == 0 {
                0
            } else {
                t.total_duration() as u64 * movie_timescale as u64 / t.timescale as u64
            }
        })
        .max()
        .unwrap_or(0) as u32;

    let mut moov_body = make_mvhd(movie_timescale, max_relative);
    for (i, track) in tracks.iter().enumerate() {
        moov_body.extend_from_slice(&build_trak(track, (i + 1) as u32, &offsets[i]));
    }
    make_box(b"moov", &moov_body)
}

fn build_trak(track: &TestTrack, track_id: u32, chunk_offsets: &[u32]) -> Vec<u8> {
    let entry = if track.is_video() {
        make_visual_entry(&track.entry_fourcc, 1280, 720, &make_avcc(TEST_SPS, TEST_PPS))
    } else {
        make_audio_entry(2, 48_000, TEST_ASC)
    };

    let mut stbl = make_stsd(&entry);

    // Run-length compress equal durations into stts entries.
    let mut stts_entries: Vec<(u32, u32)> = Vec::new();
    for &d in &track.sample_durations {
        match stts_entries.last_mut() {
            Some((count, delta)) if *delta == d => *count += 1,
            _ => stts_entries.push((1, d)),
        }
    }
    stbl.extend_from_slice(&make_stts(&stts_entries));

    if let Some(comp) = &track.composition_offsets {
        let entries: Vec<(u32, i32)> = comp.iter().map(|&o| (1, o)).collect();
        stbl.extend_from_slice(&make_ctts(&entries));
    }

    if track.is_video() {
        let sync: Vec<u32> = track
            .keyframes
            .iter()
            .enumerate()
            .filter(|(_, &k)| k)
            .map(|(i, _)| (i + 1) as u32)
            .collect();
        stbl.extend_from_slice(&make_stss(&sync));
    }

    let mut sizes = track.sample_sizes.clone();
    sizes.extend(std::iter::repeat_n(0, track.extra_stsz_entries));
    stbl.extend_from_slice(&make_stsz(&sizes));
    stbl.extend_from_slice(&make_stsc(&[(1, 1)]));
    stbl.extend_from_slice(&make_stco(chunk_offsets));

    let minf = make_box(b"minf", &make_box(b"stbl", &stbl));

    let mut mdia = make_mdhd(track.timescale, track.total_duration());
    mdia.extend_from_slice(&make_hdlr(&track.handler));
    mdia.extend_from_slice(&minf);

    let mut trak = make_tkhd(track_id);
    trak.extend_from_slice(&make_box(b"mdia", &mdia));
    make_box(b"trak", &trak)
}
