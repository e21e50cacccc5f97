//! Video path: conversion and encoding seams, and VSTRM packetization.
//!
//! Pixel conversion and H.264 encoding are provided by the host through
//! [`VideoConverter`] and [`VideoEncoder`]. This module only turns an
//! [`EncodedFrame`] into VSTRM packets.

use std::time::Instant;

use bytes::Bytes;

use crate::error::DrcError;
use crate::media::types::{FlipMode, PixelFormat};
use crate::vstrm::{FrameRate, MAX_VSTRM_PAYLOAD_SIZE, VstrmPacket};

/// Chunks per encoded frame (5 x 6 macroblock rows = 480 lines).
pub const CHUNKS_PER_FRAME: usize = 5;

// ── Collaborator traits ──────────────────────────────────────────

/// Converts arbitrary frames into native YUV420P at screen resolution.
pub trait VideoConverter: Send {
    fn convert(
        &mut self,
        frame: Vec<u8>,
        width: u16,
        height: u16,
        format: PixelFormat,
        flip: FlipMode,
    ) -> Result<Vec<u8>, DrcError>;
}

/// Encodes native frames into chunked H.264 slices.
pub trait VideoEncoder: Send {
    fn encode(&mut self, frame: &[u8]) -> Result<EncodedFrame, DrcError>;
}

// ── EncodedFrame ─────────────────────────────────────────────────

/// One encoded frame, already split into chunks.
#[derive(Debug, Clone, Default)]
pub struct EncodedFrame {
    /// Whether the frame can be decoded without earlier frames.
    pub idr: bool,
    /// Encoded chunks, normally [`CHUNKS_PER_FRAME`] of them.
    pub chunks: Vec<Bytes>,
}

// ── VideoPacketizer ──────────────────────────────────────────────

/// Splits encoded frames into VSTRM packets.
///
/// Packets come out without sequence ids; the transport assigns those
/// at send time. The first packet produced by a packetizer carries the
/// init flag.
#[derive(Debug)]
pub struct VideoPacketizer {
    epoch: Instant,
    frame_rate: FrameRate,
    init_sent: bool,
}

impl VideoPacketizer {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            epoch: Instant::now(),
            frame_rate,
            init_sent: false,
        }
    }

    /// Microseconds since the packetizer was created, wrapping at 32 bits.
    pub fn timestamp(&self) -> u32 {
        self.epoch.elapsed().as_micros() as u32
    }

    pub fn packetize(&mut self, frame: &EncodedFrame) -> Result<Vec<VstrmPacket>, DrcError> {
        self.packetize_at(frame, self.timestamp())
    }

    /// Packetize with an explicit timestamp.
    pub fn packetize_at(
        &mut self,
        frame: &EncodedFrame,
        timestamp: u32,
    ) -> Result<Vec<VstrmPacket>, DrcError> {
        if frame.chunks.is_empty() {
            return Err(DrcError::InvalidArgument("encoded frame has no chunks"));
        }

        let last_chunk = frame.chunks.len() - 1;
        let mut packets = Vec::new();

        for (ci, chunk) in frame.chunks.iter().enumerate() {
            // An empty chunk still needs one packet to mark its end.
            let pieces: Vec<&[u8]> = if chunk.is_empty() {
                vec![&chunk[..]]
            } else {
                chunk.chunks(MAX_VSTRM_PAYLOAD_SIZE).collect()
            };
            let last_piece = pieces.len() - 1;

            for (pi, piece) in pieces.into_iter().enumerate() {
                let first_of_frame = ci == 0 && pi == 0;

                let mut pkt = VstrmPacket::new();
                pkt.set_timestamp(timestamp);
                pkt.set_payload(piece)?;
                pkt.set_frame_begin_flag(first_of_frame);
                pkt.set_chunk_end_flag(pi == last_piece);
                pkt.set_frame_end_flag(ci == last_chunk && pi == last_piece);
                pkt.set_idr_flag(frame.idr)?;

                if first_of_frame {
                    if !self.init_sent {
                        pkt.set_init_flag(true);
                        self.init_sent = true;
                    }
                    pkt.set_frame_rate(Some(self.frame_rate))?;
                }

                packets.push(pkt);
            }
        }

        Ok(packets)
    }
}

impl Default for VideoPacketizer {
    fn default() -> Self {
        Self::new(FrameRate::Fps59_94)
    }
}

// ── Tests ────────────────────────────────────────────────────────
