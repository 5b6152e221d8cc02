//! PSI (Program Specific Information) section writers: PAT and PMT.

use bytes::{BufMut, BytesMut};

use crate::crc32::mpeg2_crc32;
use crate::{PID_PMT, TS_PACKET_SIZE};

const TABLE_ID_PAT: u8 = 0x00;
const TABLE_ID_PMT: u8 = 0x02;
const PROGRAM_NUMBER: u16 = 0x0001;
const TRANSPORT_STREAM_ID: u16 = 0x0001;

/// One elementary stream entry for the PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmtStream {
    pub pid: u16,
    pub stream_type: u8,
}

/// Build a PAT section (table_id through CRC, no pointer field) announcing
/// the single program and its PMT PID.
pub fn build_pat_section() -> BytesMut {
    let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
    buf.put_u8(TABLE_ID_PAT);
    // section_syntax_indicator + reserved bits + 12-bit section_length:
    // 5 fixed bytes + 4 per program + 4 CRC
    buf.put_u16(0xB000 | (5 + 4 + 4));
    buf.put_u16(TRANSPORT_STREAM_ID);
    buf.put_u8(0xC1); // version 0, current_next = 1
    buf.put_u8(0x00); // section_number
    buf.put_u8(0x00); // last_section_number
    buf.put_u16(PROGRAM_NUMBER);
    buf.put_u16(0xE000 | PID_PMT);

    let crc = mpeg2_crc32(&buf);
    buf.put_u32(crc);
    buf
}

/// Build a PMT section for the single program.
pub fn build_pmt_section(pcr_pid: u16, streams: &[PmtStream]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
    buf.put_u8(TABLE_ID_PMT);
    // 9 fixed bytes + 5 per stream + 4 CRC
    let section_length = 9 + 5 * streams.len() as u16 + 4;
    buf.put_u16(0xB000 | section_length);
    buf.put_u16(PROGRAM_NUMBER);
    buf.put_u8(0xC1);
    buf.put_u8(0x00);
    buf.put_u8(0x00);
    buf.put_u16(0xE000 | pcr_pid);
    buf.put_u16(0xF000); // program_info_length = 0

    for stream in streams {
        buf.put_u8(stream.stream_type);
        buf.put_u16(0xE000 | stream.pid);
        buf.put_u16(0xF000); // ES_info_length = 0
    }

    let crc = mpeg2_crc32(&buf);
    buf.put_u32(crc);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32::validate_section_crc32;
    use crate::{PID_AUDIO, PID_VIDEO, STREAM_TYPE_AAC_ADTS, STREAM_TYPE_H264};

    #[test]
    fn test_pat_section_layout() {
        let pat = build_pat_section();
        assert_eq!(pat[0], TABLE_ID_PAT);
        let section_length = (u16::from_be_bytes([pat[1], pat[2]]) & 0x0FFF) as usize;
        // total = 3 header bytes + section_length
        assert_eq!(pat.len(), 3 + section_length);
        // The announced PMT PID
        let pmt_pid = u16::from_be_bytes([pat[10], pat[11]]) & 0x1FFF;
        assert_eq!(pmt_pid, PID_PMT);
        assert!(validate_section_crc32(&pat));
    }

    #[test]
    fn test_pmt_section_layout() {
        let streams = [
            PmtStream {
                pid: PID_VIDEO,
                stream_type: STREAM_TYPE_H264,
            },
            PmtStream {
                pid: PID_AUDIO,
                stream_type: STREAM_TYPE_AAC_ADTS,
            },
        ];
        let pmt = build_pmt_section(PID_VIDEO, &streams);
        assert_eq!(pmt[0], TABLE_ID_PMT);
        let section_length = (u16::from_be_bytes([pmt[1], pmt[2]]) & 0x0FFF) as usize;
        assert_eq!(pmt.len(), 3 + section_length);

        let pcr_pid = u16::from_be_bytes([pmt[8], pmt[9]]) & 0x1FFF;
        assert_eq!(pcr_pid, PID_VIDEO);

        // First stream entry begins after the 12-byte fixed part.
        assert_eq!(pmt[12], STREAM_TYPE_H264);
        assert_eq!(u16::from_be_bytes([pmt[13], pmt[14]]) & 0x1FFF, PID_VIDEO);
        assert_eq!(pmt[17], STREAM_TYPE_AAC_ADTS);
        assert_eq!(u16::from_be_bytes([pmt[18], pmt[19]]) & 0x1FFF, PID_AUDIO);
        assert!(validate_section_crc32(&pmt));
    }

    #[test]
    fn test_sections_fit_one_packet() {
        let streams = [
            PmtStream {
                pid: PID_VIDEO,
                stream_type: STREAM_TYPE_H264,
            },
            PmtStream {
                pid: PID_AUDIO,
                stream_type: STREAM_TYPE_AAC_ADTS,
            },
        ];
        // 1 pointer byte + section must fit the 184-byte packet payload.
        assert!(1 + build_pat_section().len() <= 184);
        assert!(1 + build_pmt_section(PID_VIDEO, &streams).len() <= 184);
    }
}
