//! Outbound media: video packetization and audio forwarding.

pub mod audio;
pub mod types;
pub mod video;

pub use audio::{AUDIO_SAMPLE_RATE, AudioEncoder};
pub use types::{FlipMode, PixelFormat};
pub use video::{CHUNKS_PER_FRAME, EncodedFrame, VideoConverter, VideoEncoder, VideoPacketizer};
