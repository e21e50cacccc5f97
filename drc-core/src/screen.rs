//! Gamepad screen geometry.

use crate::media::PixelFormat;

pub const SCREEN_WIDTH: u16 = 854;
pub const SCREEN_HEIGHT: u16 = 480;

/// Bytes in one native (YUV420P, full screen) frame.
pub const NATIVE_FRAME_SIZE: usize = PixelFormat::Yuv420p.frame_len(SCREEN_WIDTH, SCREEN_HEIGHT);
