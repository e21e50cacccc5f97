//! VSTRM packet: fixed 16-byte header followed by the payload.
//!
//! ## Wire format
//!
//! ```text
//! byte 0:     magic (4, = 0xF) | packet type (2) | seq id bits 9..8 (2)
//! byte 1:     seq id bits 7..0
//! byte 2:     init | frame begin | chunk end | frame end | has timestamp | len bits 10..8 (3)
//! byte 3:     len bits 7..0
//! bytes 4-7:  timestamp (u32, big-endian)
//! bytes 8-15: extension options (see [`super::options`])
//! bytes 16..: payload (`len` bytes)
//! ```
//!
//! Every field is read and written through explicit bit operations on the
//! backing buffer; there is no separate decode pass for received packets.

use std::fmt;

use crate::error::DrcError;
use crate::vstrm::options::{
    EXT_OPTIONS_SIZE, ExtOptions, OPT_FORCE_DECODING, OPT_FRAME_RATE, OPT_IDR,
    OPT_MB_ROWS_PER_CHUNK,
};

// ── Constants ────────────────────────────────────────────────────

/// Size of the fixed header.
pub const VSTRM_HEADER_SIZE: usize = 16;

/// Largest payload a single packet may carry.
pub const MAX_VSTRM_PAYLOAD_SIZE: usize = 1400;

/// Largest on-wire packet.
pub const MAX_VSTRM_PACKET_SIZE: usize = VSTRM_HEADER_SIZE + MAX_VSTRM_PAYLOAD_SIZE;

/// Sequence ids are 10 bits wide.
pub const MAX_SEQ_ID: u16 = 0x3FF;

/// Macroblock rows per chunk: 6 rows * 5 chunks * 16 px = 480 lines.
pub const MB_ROWS_PER_CHUNK: u8 = 6;

const OPTIONS_OFFSET: usize = 8;

// Byte 0 default: magic 0xF, packet type 0, seq id high bits 0.
const DEFAULT_BYTE0: u8 = 0xF0;

// Byte 2 bit positions.
const INIT_BIT: u32 = 7;
const FRAME_BEGIN_BIT: u32 = 6;
const CHUNK_END_BIT: u32 = 5;
const FRAME_END_BIT: u32 = 4;
const HAS_TIMESTAMP_BIT: u32 = 3;

// ── Bit helpers ──────────────────────────────────────────────────

/// Mask covering bits `b..e` (end exclusive).
const fn bit_mask(b: u32, e: u32) -> u8 {
    (((1u16 << e) - 1) ^ ((1u16 << b) - 1)) as u8
}

fn insert_bits(v: u8, to_insert: u8, b: u32, e: u32) -> u8 {
    let mask = bit_mask(b, e);
    (v & !mask) | ((to_insert << b) & mask)
}

fn extract_bits(v: u8, b: u32, e: u32) -> u8 {
    (v & bit_mask(b, e)) >> b
}

// ── FrameRate ────────────────────────────────────────────────────

/// Frame rate carried in the `0x82` extension option.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRate {
    Fps59_94 = 0,
    Fps50 = 1,
    Fps29_97 = 2,
    Fps25 = 3,
}

impl TryFrom<u8> for FrameRate {
    type Error = DrcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameRate::Fps59_94),
            1 => Ok(FrameRate::Fps50),
            2 => Ok(FrameRate::Fps29_97),
            3 => Ok(FrameRate::Fps25),
            _ => Err(DrcError::Other(format!("unknown frame rate {value:#x}"))),
        }
    }
}

// ── VstrmPacket ──────────────────────────────────────────────────

/// A single VSTRM packet backed by a fixed-size buffer.
///
/// Not shared between threads: whoever assembles a packet owns it until
/// it has been sent.
#[derive(Clone, PartialEq, Eq)]
pub struct VstrmPacket {
    buf: Box<[u8; MAX_VSTRM_PACKET_SIZE]>,
}

impl VstrmPacket {
    /// A ready-to-send packet with default header and fixed options.
    pub fn new() -> Self {
        let mut pkt = Self {
            buf: Box::new([0u8; MAX_VSTRM_PACKET_SIZE]),
        };
        pkt.reset();
        pkt
    }

    /// Wrap a received datagram.
    ///
    /// The bytes are copied verbatim; the accessors interpret them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DrcError> {
        if bytes.len() < VSTRM_HEADER_SIZE {
            return Err(DrcError::InvalidPacketLength {
                expected: VSTRM_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes.len() > MAX_VSTRM_PACKET_SIZE {
            return Err(DrcError::InvalidPacketLength {
                expected: MAX_VSTRM_PACKET_SIZE,
                actual: bytes.len(),
            });
        }
        let mut buf = Box::new([0u8; MAX_VSTRM_PACKET_SIZE]);
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { buf })
    }

    /// Zero the buffer and install the default header and fixed options.
    ///
    /// Result: seq id 0, timestamp flag set, empty payload, no IDR flag,
    /// unknown frame rate, force-decoding and macroblock-rows options present.
    pub fn reset(&mut self) {
        self.buf.fill(0);
        self.buf[0] = DEFAULT_BYTE0;
        self.buf[2] = 1 << HAS_TIMESTAMP_BIT;

        let mut opts = ExtOptions::new();
        // Three bytes into an empty eight-byte region cannot fail.
        let _ = opts.set(OPT_FORCE_DECODING, None);
        let _ = opts.set(OPT_MB_ROWS_PER_CHUNK, Some(MB_ROWS_PER_CHUNK));
        self.write_ext_options(&opts);
    }

    // ── Header fields ────────────────────────────────────────────

    pub fn magic(&self) -> u8 {
        extract_bits(self.buf[0], 4, 8)
    }

    pub fn packet_type(&self) -> u8 {
        extract_bits(self.buf[0], 2, 4)
    }

    pub fn seq_id(&self) -> u16 {
        (u16::from(self.buf[0] & 0x3) << 8) | u16::from(self.buf[1])
    }

    /// Store the low 10 bits of `seq_id`.
    pub fn set_seq_id(&mut self, seq_id: u16) {
        let seq_id = seq_id & MAX_SEQ_ID;
        self.buf[0] = insert_bits(self.buf[0], (seq_id >> 8) as u8, 0, 2);
        self.buf[1] = (seq_id & 0xFF) as u8;
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]])
    }

    pub fn set_timestamp(&mut self, ts: u32) {
        self.buf[4..8].copy_from_slice(&ts.to_be_bytes());
    }

    pub fn has_timestamp(&self) -> bool {
        self.flag(HAS_TIMESTAMP_BIT)
    }

    pub fn init_flag(&self) -> bool {
        self.flag(INIT_BIT)
    }

    pub fn set_init_flag(&mut self, on: bool) {
        self.set_flag(INIT_BIT, on);
    }

    pub fn frame_begin_flag(&self) -> bool {
        self.flag(FRAME_BEGIN_BIT)
    }

    pub fn set_frame_begin_flag(&mut self, on: bool) {
        self.set_flag(FRAME_BEGIN_BIT, on);
    }

    pub fn chunk_end_flag(&self) -> bool {
        self.flag(CHUNK_END_BIT)
    }

    pub fn set_chunk_end_flag(&mut self, on: bool) {
        self.set_flag(CHUNK_END_BIT, on);
    }

    pub fn frame_end_flag(&self) -> bool {
        self.flag(FRAME_END_BIT)
    }

    pub fn set_frame_end_flag(&mut self, on: bool) {
        self.set_flag(FRAME_END_BIT, on);
    }

    fn flag(&self, bit: u32) -> bool {
        extract_bits(self.buf[2], bit, bit + 1) != 0
    }

    fn set_flag(&mut self, bit: u32, on: bool) {
        self.buf[2] = insert_bits(self.buf[2], u8::from(on), bit, bit + 1);
    }

    // ── Payload ──────────────────────────────────────────────────

    /// Declared payload length (11-bit header field).
    pub fn payload_size(&self) -> usize {
        (usize::from(self.buf[2] & 0x7) << 8) | usize::from(self.buf[3])
    }

    /// Payload bytes, capped at [`MAX_VSTRM_PAYLOAD_SIZE`].
    pub fn payload(&self) -> &[u8] {
        let len = self.payload_size().min(MAX_VSTRM_PAYLOAD_SIZE);
        &self.buf[VSTRM_HEADER_SIZE..VSTRM_HEADER_SIZE + len]
    }

    /// Copy `payload` in and update the length field.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), DrcError> {
        let size = payload.len();
        if size > MAX_VSTRM_PAYLOAD_SIZE {
            return Err(DrcError::PayloadTooLarge {
                size,
                max: MAX_VSTRM_PAYLOAD_SIZE,
            });
        }
        self.buf[VSTRM_HEADER_SIZE..VSTRM_HEADER_SIZE + size].copy_from_slice(payload);
        self.buf[2] = insert_bits(self.buf[2], (size >> 8) as u8, 0, 3);
        self.buf[3] = (size & 0xFF) as u8;
        Ok(())
    }

    /// Header plus declared payload: the datagram to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..VSTRM_HEADER_SIZE + self.payload().len()]
    }

    // ── Extension options ────────────────────────────────────────

    /// Materialise the option region.
    pub fn ext_options(&self) -> ExtOptions {
        let mut region = [0u8; EXT_OPTIONS_SIZE];
        region.copy_from_slice(&self.buf[OPTIONS_OFFSET..OPTIONS_OFFSET + EXT_OPTIONS_SIZE]);
        ExtOptions::decode(&region)
    }

    fn write_ext_options(&mut self, opts: &ExtOptions) {
        self.buf[OPTIONS_OFFSET..OPTIONS_OFFSET + EXT_OPTIONS_SIZE].copy_from_slice(&opts.encode());
    }

    pub fn has_ext_option(&self, tag: u8) -> bool {
        self.ext_options().contains(tag)
    }

    pub fn ext_option_value(&self, tag: u8) -> Option<u8> {
        self.ext_options().value(tag)
    }

    /// Insert or update an option; the buffer is untouched on error.
    pub fn set_ext_option(&mut self, tag: u8, value: Option<u8>) -> Result<(), DrcError> {
        let mut opts = self.ext_options();
        opts.set(tag, value)?;
        self.write_ext_options(&opts);
        Ok(())
    }

    /// Remove an option and compact the region.
    pub fn clear_ext_option(&mut self, tag: u8) -> bool {
        let mut opts = self.ext_options();
        let removed = opts.remove(tag);
        if removed {
            self.write_ext_options(&opts);
        }
        removed
    }

    pub fn idr_flag(&self) -> bool {
        self.has_ext_option(OPT_IDR)
    }

    pub fn set_idr_flag(&mut self, on: bool) -> Result<(), DrcError> {
        if on {
            self.set_ext_option(OPT_IDR, None)
        } else {
            self.clear_ext_option(OPT_IDR);
            Ok(())
        }
    }

    /// `None` when the option is absent or holds an unknown value.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.ext_option_value(OPT_FRAME_RATE)
            .and_then(|v| FrameRate::try_from(v).ok())
    }

    /// `None` removes the option.
    pub fn set_frame_rate(&mut self, rate: Option<FrameRate>) -> Result<(), DrcError> {
        match rate {
            Some(rate) => self.set_ext_option(OPT_FRAME_RATE, Some(rate as u8)),
            None => {
                self.clear_ext_option(OPT_FRAME_RATE);
                Ok(())
            }
        }
    }
}

impl Default for VstrmPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VstrmPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VstrmPacket")
            .field("seq_id", &self.seq_id())
            .field("timestamp", &self.timestamp())
            .field("init", &self.init_flag())
            .field("frame_begin", &self.frame_begin_flag())
            .field("chunk_end", &self.chunk_end_flag())
            .field("frame_end", &self.frame_end_flag())
            .field("ext_options", &self.ext_options())
            .field("payload_size", &self.payload_size())
            .finish()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_packet_has_default_header() {
        let pkt = VstrmPacket::new();
        let bytes = pkt.as_bytes();

        assert_eq!(bytes.len(), VSTRM_HEADER_SIZE);
        assert_eq!(bytes[0], 0xF0);
        assert_eq!(bytes[2], 0x08);
        assert_eq!(&bytes[8..11], &[0x83, 0x85, 6]);
        assert_eq!(&bytes[11..16], &[0; 5]);
        assert_eq!(pkt.magic(), 0xF);
        assert_eq!(pkt.packet_type(), 0);
        assert!(pkt.has_timestamp());
    }

    #[test]
    fn seq_id_spans_bytes_zero_and_one() {
        let mut pkt = VstrmPacket::new();
        for id in [0u16, 1, 0xFF, 0x100, 0x2AB, MAX_SEQ_ID] {
            pkt.set_seq_id(id);
            assert_eq!(pkt.seq_id(), id);
            assert_eq!(pkt.as_bytes()[0] & 0xFC, 0xF0);
        }
    }

    #[test]
    fn seq_id_is_masked_to_ten_bits() {
        let mut pkt = VstrmPacket::new();
        pkt.set_seq_id(0xFFFF);
        assert_eq!(pkt.seq_id(), MAX_SEQ_ID);
        assert_eq!(pkt.magic(), 0xF);
        assert_eq!(pkt.packet_type(), 0);

        pkt.set_seq_id(0x400 | 5);
        assert_eq!(pkt.seq_id(), 5);
    }

    #[test]
    fn timestamp_is_big_endian() {
        let mut pkt = VstrmPacket::new();
        pkt.set_timestamp(0xDEADBEEF);
        assert_eq!(&pkt.as_bytes()[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(pkt.timestamp(), 0xDEADBEEF);
    }

    #[test]
    fn flags_do_not_disturb_each_other_or_length() {
        let mut pkt = VstrmPacket::new();
        pkt.set_payload(&[0x11; 0x5A3]).unwrap_err();
        pkt.set_payload(&[0x11; 0x4A3]).unwrap();

        let setters: [fn(&mut VstrmPacket, bool); 4] = [
            VstrmPacket::set_init_flag,
            VstrmPacket::set_frame_begin_flag,
            VstrmPacket::set_chunk_end_flag,
            VstrmPacket::set_frame_end_flag,
        ];

        for (i, set) in setters.iter().enumerate() {
            set(&mut pkt, true);
            let state = [
                pkt.init_flag(),
                pkt.frame_begin_flag(),
                pkt.chunk_end_flag(),
                pkt.frame_end_flag(),
            ];
            for (j, on) in state.iter().enumerate() {
                assert_eq!(*on, j <= i, "flag {j} after setting {i}");
            }
            assert_eq!(pkt.payload_size(), 0x4A3);
            assert!(pkt.has_timestamp());
        }

        pkt.set_frame_begin_flag(false);
        assert!(pkt.init_flag());
        assert!(!pkt.frame_begin_flag());
        assert!(pkt.chunk_end_flag());
        assert!(pkt.frame_end_flag());
        assert_eq!(pkt.payload_size(), 0x4A3);
    }

    #[test]
    fn payload_sizes_up_to_capacity() {
        let mut pkt = VstrmPacket::new();
        for n in [0usize, 1, 255, 256, 1024, MAX_VSTRM_PAYLOAD_SIZE] {
            let data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
            pkt.set_payload(&data).unwrap();
            assert_eq!(pkt.payload_size(), n);
            assert_eq!(pkt.payload(), &data[..]);
            assert_eq!(pkt.as_bytes().len(), VSTRM_HEADER_SIZE + n);
        }
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut pkt = VstrmPacket::new();
        pkt.set_payload(&[1, 2, 3]).unwrap();

        let err = pkt.set_payload(&vec![0; MAX_VSTRM_PAYLOAD_SIZE + 1]).unwrap_err();
        assert!(matches!(err, DrcError::PayloadTooLarge { .. }));
        assert_eq!(pkt.payload(), &[1, 2, 3]);
    }

    #[test]
    fn frame_rate_option_roundtrip_and_removal() {
        let mut pkt = VstrmPacket::new();
        pkt.set_idr_flag(true).unwrap();
        pkt.set_frame_rate(Some(FrameRate::Fps29_97)).unwrap();
        assert_eq!(pkt.frame_rate(), Some(FrameRate::Fps29_97));

        pkt.set_frame_rate(None).unwrap();
        assert_eq!(pkt.frame_rate(), None);
        assert_eq!(&pkt.as_bytes()[8..16], &[0x83, 0x85, 6, 0x80, 0, 0, 0, 0]);
    }

    #[test]
    fn idr_flag_toggles() {
        let mut pkt = VstrmPacket::new();
        assert!(!pkt.idr_flag());
        pkt.set_idr_flag(true).unwrap();
        pkt.set_idr_flag(true).unwrap();
        assert!(pkt.idr_flag());
        assert_eq!(pkt.ext_options().len(), 3);
        pkt.set_idr_flag(false).unwrap();
        assert!(!pkt.idr_flag());
        assert_eq!(&pkt.as_bytes()[8..16], &[0x83, 0x85, 6, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn unknown_frame_rate_value_reads_as_none() {
        let mut pkt = VstrmPacket::new();
        pkt.set_ext_option(OPT_FRAME_RATE, Some(0x7F)).unwrap();
        assert_eq!(pkt.frame_rate(), None);
    }

    #[test]
    fn mismatched_option_value_leaves_region_unchanged() {
        let mut pkt = VstrmPacket::new();
        let before = pkt.clone();

        assert!(pkt.set_ext_option(OPT_IDR, Some(1)).is_err());
        assert!(pkt.set_ext_option(OPT_FRAME_RATE, None).is_err());

        assert_eq!(pkt, before);
        assert!(!pkt.has_ext_option(OPT_IDR));
        assert!(!pkt.has_ext_option(0x01));
        assert_eq!(pkt.ext_option_value(OPT_FRAME_RATE), None);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut pkt = VstrmPacket::new();
        pkt.set_seq_id(77);
        pkt.set_timestamp(12345);
        pkt.set_payload(&[9; 64]).unwrap();
        pkt.set_idr_flag(true).unwrap();
        pkt.set_frame_rate(Some(FrameRate::Fps50)).unwrap();
        pkt.set_init_flag(true);

        pkt.reset();
        let once = pkt.clone();
        pkt.reset();
        assert_eq!(pkt, once);
        assert_eq!(pkt, VstrmPacket::new());

        assert_eq!(pkt.seq_id(), 0);
        assert_eq!(pkt.payload_size(), 0);
        assert!(!pkt.idr_flag());
        assert_eq!(pkt.frame_rate(), None);
        assert!(pkt.has_ext_option(OPT_FORCE_DECODING));
        assert_eq!(pkt.ext_option_value(OPT_MB_ROWS_PER_CHUNK), Some(MB_ROWS_PER_CHUNK));
    }

    #[test]
    fn from_bytes_reads_fields_in_place() {
        let mut sent = VstrmPacket::new();
        sent.set_seq_id(3);
        sent.set_timestamp(0x01020304);
        sent.set_payload(&[0xAB; 10]).unwrap();
        sent.set_idr_flag(true).unwrap();
        sent.set_frame_rate(Some(FrameRate::Fps59_94)).unwrap();

        let wire = sent.as_bytes().to_vec();
        assert_eq!(((u16::from(wire[0]) & 3) << 8) | u16::from(wire[1]), 3);
        assert_eq!(u32::from_be_bytes([wire[4], wire[5], wire[6], wire[7]]), 0x01020304);

        let recv = VstrmPacket::from_bytes(&wire).unwrap();
        assert_eq!(recv.seq_id(), 3);
        assert_eq!(recv.timestamp(), 0x01020304);
        assert_eq!(recv.payload_size(), 10);
        assert_eq!(recv.payload(), &[0xAB; 10]);
        assert!(recv.idr_flag());
        assert_eq!(recv.frame_rate(), Some(FrameRate::Fps59_94));
    }

    #[test]
    fn from_bytes_rejects_bad_lengths() {
        assert!(VstrmPacket::from_bytes(&[0xF0; 8]).is_err());
        assert!(VstrmPacket::from_bytes(&vec![0; MAX_VSTRM_PACKET_SIZE + 1]).is_err());
    }

    #[test]
    fn declared_length_beyond_capacity_is_capped() {
        let mut wire = VstrmPacket::new().as_bytes().to_vec();
        wire[2] |= 0x7;
        wire[3] = 0xFF;
        let pkt = VstrmPacket::from_bytes(&wire).unwrap();
        assert_eq!(pkt.payload_size(), 0x7FF);
        assert_eq!(pkt.payload().len(), MAX_VSTRM_PAYLOAD_SIZE);
    }
}
