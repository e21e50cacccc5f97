//! Audio path.
//!
//! The host supplies an [`AudioEncoder`] that packs PCM into the
//! accessory's audio datagrams; the streamer only validates the input
//! and sends what comes out.

use bytes::Bytes;

use crate::error::DrcError;

/// Sample rate the accessory plays back at.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Interleaved channels per sample frame.
pub const AUDIO_CHANNELS: usize = 2;

pub trait AudioEncoder: Send {
    /// Encode interleaved stereo 48 kHz samples into zero or more datagrams.
    fn encode(&mut self, samples: &[i16]) -> Result<Vec<Bytes>, DrcError>;
}

/// Reject buffers that do not hold whole stereo sample frames.
pub fn validate_samples(samples: &[i16]) -> Result<(), DrcError> {
    if samples.len() % AUDIO_CHANNELS != 0 {
        return Err(DrcError::InvalidArgument(
            "audio samples must be interleaved stereo",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_only() {
        assert!(validate_samples(&[]).is_ok());
        assert!(validate_samples(&[1, 2, 3, 4]).is_ok());
        assert!(validate_samples(&[1, 2, 3]).is_err());
    }
}
