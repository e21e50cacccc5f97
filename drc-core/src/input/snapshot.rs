//! Controller state as seen by consumers.

use bitflags::bitflags;

bitflags! {
    /// Button mask. Bits 16..=20 are unused by the accessory.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const SYNC = 0x1;
        const HOME = 0x2;
        const MINUS = 0x4;
        const PLUS = 0x8;
        const R = 0x10;
        const L = 0x20;
        const ZR = 0x40;
        const ZL = 0x80;
        const DOWN = 0x100;
        const UP = 0x200;
        const RIGHT = 0x400;
        const LEFT = 0x800;
        const Y = 0x1000;
        const X = 0x2000;
        const B = 0x4000;
        const A = 0x8000;

        const TV = 0x20_0000;
        const R3 = 0x40_0000;
        const L3 = 0x80_0000;
    }
}

bitflags! {
    /// Power status reported with every input report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PowerStatus: u8 {
        const AC = 0x01;
        const BUTTON_PRESSED = 0x02;
        const CHARGING = 0x40;
        const USB = 0x80;
    }
}

/// Touchscreen state. Coordinates and pressure are in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TouchState {
    pub pressed: bool,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

/// One complete sample of controller input.
///
/// Snapshots are replaced whole, never edited in place. When `valid` is
/// false (no data yet, or the link timed out) the remaining fields carry
/// no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    pub valid: bool,
    /// Report sequence number assigned by the accessory.
    pub seq: u16,
    pub buttons: Buttons,
    /// Stick axes in `-1.0..=1.0`.
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,
    pub touch: TouchState,
    pub battery_charge: u8,
    pub audio_volume: u8,
    pub power_status: PowerStatus,
}

impl InputSnapshot {
    /// The "no data" snapshot.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Whether every button in `buttons` is held. Always false when invalid.
    pub fn is_pressed(&self, buttons: Buttons) -> bool {
        self.valid && self.buttons.contains(buttons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_snapshot_is_zeroed() {
        let s = InputSnapshot::invalid();
        assert!(!s.valid);
        assert!(s.buttons.is_empty());
        assert_eq!(s.touch, TouchState::default());
        assert!(!s.is_pressed(Buttons::empty()));
    }

    #[test]
    fn extra_buttons_sit_above_bit_sixteen() {
        assert_eq!(Buttons::from_bits_truncate(0x20 << 16), Buttons::TV);
        assert_eq!(Buttons::from_bits_truncate(0x1F_0000), Buttons::empty());
    }
}
