//! Frame types shared by the video path.

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of frames handed to the streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
    /// Planar 4:2:0: a full-size Y plane, then quarter-size U and V planes.
    /// The encoder's native format.
    Yuv420p,
}

impl PixelFormat {
    /// Bytes in a tightly packed `width` x `height` frame.
    pub const fn frame_len(self, width: u16, height: u16) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => w * h * 4,
            PixelFormat::Rgb8 => w * h * 3,
            PixelFormat::Yuv420p => w * h + 2 * (w.div_ceil(2) * h.div_ceil(2)),
        }
    }
}

// ── FlipMode ─────────────────────────────────────────────────────

/// Optional vertical flip applied during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlipMode {
    #[default]
    NoFlip,
    FlipVertically,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_lengths() {
        assert_eq!(PixelFormat::Rgba8.frame_len(2, 2), 16);
        assert_eq!(PixelFormat::Rgb8.frame_len(2, 2), 12);
        assert_eq!(PixelFormat::Yuv420p.frame_len(4, 4), 16 + 2 * 4);
        assert_eq!(PixelFormat::Yuv420p.frame_len(3, 3), 9 + 2 * 4);
    }
}
