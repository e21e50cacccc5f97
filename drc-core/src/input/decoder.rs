//! Input report decoding.
//!
//! ## Wire format (128 bytes)
//!
//! ```text
//! 0    u16 BE   report sequence number
//! 2    u16 BE   buttons (SYNC..A)
//! 4    u8       power status
//! 5    u8       battery charge
//! 6    4 x u16  LE stick axes LX, LY, RX, RY (12-bit, centre 0x800)
//! 14   u8       audio volume
//! 15   21 B     motion sensors (ignored)
//! 36   10 x     touch samples (x: u16 LE, y: u16 LE)
//! 76   u8       report marker (0x01)
//! 77   3 B      reserved
//! 80   u8       extra buttons (TV, R3, L3), shifted into bits 16..24
//! 81   47 B     reserved
//! ```
//!
//! Touch samples keep the coordinate in their low 12 bits. Bit 15 of the
//! first sample's x is the "pressed" flag, and bits 12..15 of the first two
//! samples' x and y carry a 12-bit pressure value, lowest group first.

use crate::error::DrcError;
use crate::input::calibration::CalibrationParams;
use crate::input::snapshot::{Buttons, InputSnapshot, PowerStatus, TouchState};

// ── Constants ────────────────────────────────────────────────────

/// Exact size of an input report datagram.
pub const INPUT_REPORT_SIZE: usize = 128;

/// Value of the marker byte in every input report.
pub const INPUT_REPORT_MARKER: u8 = 0x01;

/// Number of touch samples per report.
pub const TOUCH_SAMPLES: usize = 10;

const SEQ_OFFSET: usize = 0;
const BUTTONS_OFFSET: usize = 2;
const POWER_OFFSET: usize = 4;
const BATTERY_OFFSET: usize = 5;
const STICKS_OFFSET: usize = 6;
const VOLUME_OFFSET: usize = 14;
const TOUCH_OFFSET: usize = 36;
const MARKER_OFFSET: usize = 76;
const EXTRA_BUTTONS_OFFSET: usize = 80;

const STICK_CENTER: f32 = 2048.0;
const STICK_HALF_RANGE: f32 = 2048.0;

const COORD_MASK: u16 = 0x0FFF;
const TOUCH_PRESSED_BIT: u16 = 0x8000;
const PRESSURE_MAX: f32 = 4095.0;

// ── RawInputReport ───────────────────────────────────────────────

/// Field-level view of an input report, before scaling and calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawInputReport {
    pub seq: u16,
    pub buttons: u16,
    pub power_status: u8,
    pub battery_charge: u8,
    /// LX, LY, RX, RY.
    pub sticks: [u16; 4],
    pub audio_volume: u8,
    /// `(x, y)` per sample, including the pressed/pressure bits.
    pub touch: [(u16, u16); TOUCH_SAMPLES],
    pub extra_buttons: u8,
}

impl RawInputReport {
    /// Validate and split a datagram into fields.
    pub fn parse(data: &[u8]) -> Result<Self, DrcError> {
        if data.len() != INPUT_REPORT_SIZE {
            return Err(DrcError::MalformedReport("unexpected report length"));
        }
        if data[MARKER_OFFSET] != INPUT_REPORT_MARKER {
            return Err(DrcError::MalformedReport("bad report marker"));
        }

        let be16 = |off: usize| u16::from_be_bytes([data[off], data[off + 1]]);
        let le16 = |off: usize| u16::from_le_bytes([data[off], data[off + 1]]);

        let mut sticks = [0u16; 4];
        for (i, axis) in sticks.iter_mut().enumerate() {
            *axis = le16(STICKS_OFFSET + i * 2);
        }

        let mut touch = [(0u16, 0u16); TOUCH_SAMPLES];
        for (i, sample) in touch.iter_mut().enumerate() {
            let off = TOUCH_OFFSET + i * 4;
            *sample = (le16(off), le16(off + 2));
        }

        Ok(Self {
            seq: be16(SEQ_OFFSET),
            buttons: be16(BUTTONS_OFFSET),
            power_status: data[POWER_OFFSET],
            battery_charge: data[BATTERY_OFFSET],
            sticks,
            audio_volume: data[VOLUME_OFFSET],
            touch,
            extra_buttons: data[EXTRA_BUTTONS_OFFSET],
        })
    }

    /// Serialize back into a datagram. Motion and reserved bytes are zero.
    pub fn to_bytes(&self) -> [u8; INPUT_REPORT_SIZE] {
        let mut out = [0u8; INPUT_REPORT_SIZE];
        out[SEQ_OFFSET..SEQ_OFFSET + 2].copy_from_slice(&self.seq.to_be_bytes());
        out[BUTTONS_OFFSET..BUTTONS_OFFSET + 2].copy_from_slice(&self.buttons.to_be_bytes());
        out[POWER_OFFSET] = self.power_status;
        out[BATTERY_OFFSET] = self.battery_charge;
        for (i, axis) in self.sticks.iter().enumerate() {
            let off = STICKS_OFFSET + i * 2;
            out[off..off + 2].copy_from_slice(&axis.to_le_bytes());
        }
        out[VOLUME_OFFSET] = self.audio_volume;
        for (i, (x, y)) in self.touch.iter().enumerate() {
            let off = TOUCH_OFFSET + i * 4;
            out[off..off + 2].copy_from_slice(&x.to_le_bytes());
            out[off + 2..off + 4].copy_from_slice(&y.to_le_bytes());
        }
        out[MARKER_OFFSET] = INPUT_REPORT_MARKER;
        out[EXTRA_BUTTONS_OFFSET] = self.extra_buttons;
        out
    }

    pub fn touch_pressed(&self) -> bool {
        self.touch[0].0 & TOUCH_PRESSED_BIT != 0
    }

    /// 12-bit pressure assembled from the first two samples.
    pub fn touch_pressure(&self) -> u16 {
        let group = |v: u16| (v >> 12) & 0x7;
        let (x0, y0) = self.touch[0];
        let (x1, y1) = self.touch[1];
        group(x0) | (group(y0) << 3) | (group(x1) << 6) | (group(y1) << 9)
    }

    /// Mean raw coordinate over all samples.
    pub fn touch_position(&self) -> (f32, f32) {
        let (sx, sy) = self.touch.iter().fold((0u32, 0u32), |(sx, sy), (x, y)| {
            (sx + u32::from(x & COORD_MASK), sy + u32::from(y & COORD_MASK))
        });
        let n = TOUCH_SAMPLES as f32;
        (sx as f32 / n, sy as f32 / n)
    }

    /// Scale every field into a consumer-facing snapshot.
    pub fn to_snapshot(&self, calibration: &CalibrationParams) -> InputSnapshot {
        let buttons = u32::from(self.buttons) | (u32::from(self.extra_buttons) << 16);

        let touch = if self.touch_pressed() {
            let (raw_x, raw_y) = self.touch_position();
            let (x, y) = calibration.to_normalized(raw_x, raw_y);
            TouchState {
                pressed: true,
                x,
                y,
                pressure: f32::from(self.touch_pressure()) / PRESSURE_MAX,
            }
        } else {
            TouchState::default()
        };

        InputSnapshot {
            valid: true,
            seq: self.seq,
            buttons: Buttons::from_bits_truncate(buttons),
            left_stick_x: scale_stick(self.sticks[0]),
            left_stick_y: scale_stick(self.sticks[1]),
            right_stick_x: scale_stick(self.sticks[2]),
            right_stick_y: scale_stick(self.sticks[3]),
            touch,
            battery_charge: self.battery_charge,
            audio_volume: self.audio_volume,
            power_status: PowerStatus::from_bits_truncate(self.power_status),
        }
    }
}

/// Decode one datagram into a snapshot.
pub fn decode_report(data: &[u8], calibration: &CalibrationParams) -> Result<InputSnapshot, DrcError> {
    Ok(RawInputReport::parse(data)?.to_snapshot(calibration))
}

fn scale_stick(raw: u16) -> f32 {
    ((f32::from(raw & COORD_MASK) - STICK_CENTER) / STICK_HALF_RANGE).clamp(-1.0, 1.0)
}

// ── Tests ────────────────────────────────────────────────────────
