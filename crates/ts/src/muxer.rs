//! Transport stream assembly.
//!
//! A [`TsMuxer`] accumulates 188-byte packets for one self-contained
//! segment: program tables first, then PES-wrapped access units. Each PID
//! keeps its own continuity counter; the counter only advances on packets
//! that carry payload, which is every packet this muxer emits.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use tracing::trace;

use crate::packet::put_packet_header;
use crate::pes::build_pes;
use crate::psi::{PmtStream, build_pat_section, build_pmt_section};
use crate::{PID_PAT, PID_PMT, TS_PACKET_SIZE};

/// Usable payload bytes per packet after the 4-byte header.
const PACKET_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - 4;

#[derive(Debug, Default)]
pub struct TsMuxer {
    out: BytesMut,
    continuity: HashMap<u16, u8>,
}

impl TsMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the PAT announcing the single program.
    pub fn write_pat(&mut self) {
        let section = build_pat_section();
        self.write_section(PID_PAT, &section);
    }

    /// Write the PMT for the program's elementary streams.
    pub fn write_pmt(&mut self, pcr_pid: u16, streams: &[PmtStream]) {
        let section = build_pmt_section(pcr_pid, streams);
        self.write_section(PID_PMT, &section);
    }

    /// Wrap one access unit in a PES packet and emit it across as many TS
    /// packets as needed.
    ///
    /// `keyframe` sets the random-access indicator on the first packet;
    /// `pcr` (90 kHz base) is inserted into the first packet's adaptation
    /// field when given.
    pub fn write_access_unit(
        &mut self,
        pid: u16,
        stream_id: u8,
        pts: u64,
        dts: Option<u64>,
        keyframe: bool,
        pcr: Option<u64>,
        payload: &[u8],
    ) {
        let pes = build_pes(stream_id, pts, dts, payload);
        trace!(
            "muxing access unit: pid={pid:#06x} pts={pts} pes_len={}",
            pes.len()
        );

        let mut remaining: &[u8] = &pes;
        let mut first = true;
        while first || !remaining.is_empty() {
            let mut af = if first && (keyframe || pcr.is_some()) {
                build_adaptation(keyframe, pcr)
            } else {
                Vec::new()
            };

            let mut chunk = PACKET_PAYLOAD_SIZE - af.len();
            if remaining.len() < chunk {
                let shortfall = chunk - remaining.len();
                if af.is_empty() {
                    af = stuffing_adaptation(shortfall);
                } else {
                    pad_adaptation(&mut af, shortfall);
                }
                chunk = remaining.len();
            }

            let cc = self.next_continuity(pid);
            let afc = if af.is_empty() { 0b01 } else { 0b11 };
            put_packet_header(&mut self.out, pid, first, afc, cc);
            self.out.put_slice(&af);
            self.out.put_slice(&remaining[..chunk]);

            remaining = &remaining[chunk..];
            first = false;
        }
    }

    /// Finish the segment and hand back the packet buffer.
    pub fn finish(self) -> Bytes {
        debug_assert_eq!(self.out.len() % TS_PACKET_SIZE, 0);
        self.out.freeze()
    }

    /// A PSI section in a single packet: pointer field, section bytes,
    /// 0xFF stuffing to the packet boundary.
    fn write_section(&mut self, pid: u16, section: &[u8]) {
        debug_assert!(1 + section.len() <= PACKET_PAYLOAD_SIZE);
        let cc = self.next_continuity(pid);
        put_packet_header(&mut self.out, pid, true, 0b01, cc);
        self.out.put_u8(0x00); // pointer field
        self.out.put_slice(section);
        let padding = PACKET_PAYLOAD_SIZE - 1 - section.len();
        self.out.put_bytes(0xFF, padding);
    }

    fn next_continuity(&mut self, pid: u16) -> u8 {
        let counter = self.continuity.entry(pid).or_insert(0);
        let current = *counter;
        *counter = (current + 1) & 0x0F;
        current
    }
}

/// Adaptation field with flags (and optionally a PCR), no stuffing yet.
fn build_adaptation(random_access: bool, pcr: Option<u64>) -> Vec<u8> {
    let mut af = vec![0u8, 0u8]; // length placeholder, flags
    if random_access {
        af[1] |= 0x40;
    }
    if let Some(base) = pcr {
        af[1] |= 0x10;
        let base = base & 0x1_FFFF_FFFF;
        af.push((base >> 25) as u8);
        af.push((base >> 17) as u8);
        af.push((base >> 9) as u8);
        af.push((base >> 1) as u8);
        af.push((((base & 1) as u8) << 7) | 0x7E); // 6 reserved bits + ext high
        af.push(0x00); // PCR extension low
    }
    af[0] = (af.len() - 1) as u8;
    af
}

/// Stuffing-only adaptation field occupying exactly `len` bytes.
fn stuffing_adaptation(len: usize) -> Vec<u8> {
    debug_assert!(len >= 1);
    let mut af = vec![(len - 1) as u8];
    if len >= 2 {
        af.push(0x00); // no flags
        af.resize(len, 0xFF);
    }
    af
}

/// Grow an existing adaptation field by `extra` stuffing bytes.
fn pad_adaptation(af: &mut Vec<u8>, extra: usize) {
    let new_len = af.len() + extra;
    af.resize(new_len, 0xFF);
    af[0] = (af.len() - 1) as u8;
}
