//! Touchscreen calibration.
//!
//! Raw digitizer coordinates map to screen pixels through an independent
//! linear function per axis: `px = (raw - origin) * scale`. Two
//! raw/reference point pairs determine both axes; rotation and skew are
//! not modelled.

use crate::error::DrcError;
use crate::screen::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Full span of the 12-bit digitizer.
pub const RAW_TOUCH_SPAN: f32 = 4096.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub origin_x: f32,
    pub origin_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for CalibrationParams {
    /// The whole digitizer span stretched over the screen.
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            scale_x: f32::from(SCREEN_WIDTH) / RAW_TOUCH_SPAN,
            scale_y: f32::from(SCREEN_HEIGHT) / RAW_TOUCH_SPAN,
        }
    }
}

impl CalibrationParams {
    /// Solve the mapping that sends `raw[i]` to `reference[i]` (screen pixels).
    pub fn from_points(raw: [(i32, i32); 2], reference: [(i32, i32); 2]) -> Result<Self, DrcError> {
        let (origin_x, scale_x) = solve_axis(raw[0].0, raw[1].0, reference[0].0, reference[1].0)?;
        let (origin_y, scale_y) = solve_axis(raw[0].1, raw[1].1, reference[0].1, reference[1].1)?;
        Ok(Self {
            origin_x,
            origin_y,
            scale_x,
            scale_y,
        })
    }

    /// Map raw digitizer coordinates to screen pixels.
    pub fn to_screen(self, raw_x: f32, raw_y: f32) -> (f32, f32) {
        (
            (raw_x - self.origin_x) * self.scale_x,
            (raw_y - self.origin_y) * self.scale_y,
        )
    }

    /// Map raw digitizer coordinates into `0.0..=1.0` screen space.
    pub fn to_normalized(self, raw_x: f32, raw_y: f32) -> (f32, f32) {
        let (px, py) = self.to_screen(raw_x, raw_y);
        (
            (px / f32::from(SCREEN_WIDTH)).clamp(0.0, 1.0),
            (py / f32::from(SCREEN_HEIGHT)).clamp(0.0, 1.0),
        )
    }
}

fn solve_axis(raw1: i32, raw2: i32, ref1: i32, ref2: i32) -> Result<(f32, f32), DrcError> {
    if raw1 == raw2 {
        return Err(DrcError::InvalidCalibration("raw points share a coordinate"));
    }
    if ref1 == ref2 {
        return Err(DrcError::InvalidCalibration("reference points share a coordinate"));
    }
    let scale = (f64::from(ref2) - f64::from(ref1)) / (f64::from(raw2) - f64::from(raw1));
    let origin = f64::from(raw1) - f64::from(ref1) / scale;
    Ok((origin as f32, scale as f32))
}
