//! PES (Packetized Elementary Stream) wrapping.

use bytes::{BufMut, BytesMut};

/// Mask for 33-bit PTS/DTS values.
const TIMESTAMP_MASK: u64 = 0x1_FFFF_FFFF;

/// Build a complete PES packet (header plus elementary-stream payload).
///
/// `pes_packet_length` is set to the real size when it fits the 16-bit
/// field and to 0 (unbounded) otherwise; unbounded lengths are only legal
/// for video streams, which is also the only place they occur here.
pub fn build_pes(stream_id: u8, pts: u64, dts: Option<u64>, payload: &[u8]) -> BytesMut {
    let header_data_length: u8 = if dts.is_some() { 10 } else { 5 };
    let after_length = 3 + header_data_length as usize + payload.len();

    let mut buf = BytesMut::with_capacity(6 + after_length);
    buf.put_slice(&[0x00, 0x00, 0x01]);
    buf.put_u8(stream_id);
    buf.put_u16(if after_length > u16::MAX as usize {
        0
    } else {
        after_length as u16
    });
    buf.put_u8(0x80); // marker bits, no scrambling
    buf.put_u8(if dts.is_some() { 0xC0 } else { 0x80 }); // PTS[/DTS] flags
    buf.put_u8(header_data_length);

    match dts {
        Some(dts) => {
            put_timestamp(&mut buf, 0b0011, pts);
            put_timestamp(&mut buf, 0b0001, dts);
        }
        None => put_timestamp(&mut buf, 0b0010, pts),
    }

    buf.put_slice(payload);
    buf
}

/// Encode a 33-bit timestamp into the 5-byte marker-bit layout:
/// `[prefix(4) | ts32..30 | 1 | ts29..15 | 1 | ts14..0 | 1]`.
fn put_timestamp(buf: &mut BytesMut, prefix: u8, ts: u64) {
    let ts = ts & TIMESTAMP_MASK;
    buf.put_u8((prefix << 4) | (((ts >> 30) as u8 & 0x07) << 1) | 0x01);
    buf.put_u8((ts >> 22) as u8);
    buf.put_u8((((ts >> 15) as u8 & 0x7F) << 1) | 0x01);
    buf.put_u8((ts >> 7) as u8);
    buf.put_u8((((ts as u8) & 0x7F) << 1) | 0x01);
}

/// Decode a 33-bit PTS or DTS from its 5-byte encoding.
pub fn parse_timestamp(data: &[u8]) -> Option<u64> {
    if data.len() < 5 {
        return None;
    }
    let ts = (((data[0] as u64 >> 1) & 0x07) << 30)
        | ((data[1] as u64) << 22)
        | (((data[2] as u64 >> 1) & 0x7F) << 15)
        | ((data[3] as u64) << 7)
        | ((data[4] as u64 >> 1) & 0x7F);
    Some(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pes_pts_only() {
        let pes = build_pes(0xC0, 90_000, None, &[0xAA, 0xBB]);
        assert_eq!(&pes[0..3], &[0x00, 0x00, 0x01]);
        assert_eq!(pes[3], 0xC0);
        // length = 3 + 5 + 2
        assert_eq!(u16::from_be_bytes([pes[4], pes[5]]), 10);
        assert_eq!(pes[6], 0x80);
        assert_eq!(pes[7], 0x80); // PTS only
        assert_eq!(pes[8], 5);
        assert_eq!(parse_timestamp(&pes[9..14]), Some(90_000));
        assert_eq!(&pes[14..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_pes_pts_and_dts() {
        let pes = build_pes(0xE0, 180_000, Some(90_000), &[0x00]);
        assert_eq!(pes[7], 0xC0);
        assert_eq!(pes[8], 10);
        assert_eq!(pes[9] >> 4, 0b0011);
        assert_eq!(parse_timestamp(&pes[9..14]), Some(180_000));
        assert_eq!(pes[14] >> 4, 0b0001);
        assert_eq!(parse_timestamp(&pes[14..19]), Some(90_000));
    }

    #[test]
    fn test_pes_marker_bits_set() {
        let pes = build_pes(0xE0, 0x1_FFFF_FFFF, Some(0), &[]);
        for idx in [9, 11, 13, 14, 16, 18] {
            assert_eq!(pes[idx] & 0x01, 0x01, "marker missing at {idx}");
        }
    }

    #[test]
    fn test_pes_max_and_zero_timestamps() {
        let pes = build_pes(0xE0, 0x1_FFFF_FFFF, Some(0), &[]);
        assert_eq!(parse_timestamp(&pes[9..14]), Some(0x1_FFFF_FFFF));
        assert_eq!(parse_timestamp(&pes[14..19]), Some(0));
    }

    #[test]
    fn test_pes_timestamp_wraps_beyond_33_bits() {
        let pes = build_pes(0xE0, 0x2_0000_0001, None, &[]);
        assert_eq!(parse_timestamp(&pes[9..14]), Some(1));
    }

    #[test]
    fn test_pes_unbounded_length_for_large_payload() {
        let payload = vec![0u8; 70_000];
        let pes = build_pes(0xE0, 0, None, &payload);
        assert_eq!(u16::from_be_bytes([pes[4], pes[5]]), 0);
        assert_eq!(pes.len(), 9 + 5 + 70_000);
    }
}
