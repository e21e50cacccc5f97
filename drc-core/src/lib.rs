//! # drc-core
//!
//! Host-side protocol library for the DRC gamepad: streams video and
//! audio to the accessory, receives its input reports, and issues device
//! commands.
//!
//! This crate contains:
//! - **VSTRM**: `VstrmPacket` with its bit-packed header and `ExtOptions` TLV region
//! - **Input**: report decoding, touchscreen calibration, and `InputReceiver`
//! - **Media**: `VideoPacketizer` plus the converter/encoder collaborator traits
//! - **Transport**: `VstrmTransport`, UDP with a shared 10-bit sequence counter
//! - **Commands**: `CommandTransport` and the wait-or-callback `PendingReply`
//! - **Streamer**: `Streamer`, the orchestrator over all of the above
//! - **Error**: `DrcError`, a typed `thiserror`-based error enum

pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod media;
pub mod screen;
pub mod streamer;
pub mod transport;
pub mod vstrm;

mod task;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use command::{CommandTransport, DeviceCommand, MAX_BACKLIGHT_LEVEL, PendingReply};
pub use config::{Endpoints, StreamerConfig};
pub use error::DrcError;
pub use input::{Buttons, CalibrationParams, InputReceiver, InputSnapshot, PowerStatus, TouchState};
pub use media::{AudioEncoder, EncodedFrame, FlipMode, PixelFormat, VideoConverter, VideoEncoder};
pub use screen::{NATIVE_FRAME_SIZE, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use streamer::Streamer;
pub use transport::VstrmTransport;
pub use vstrm::{ExtOption, ExtOptions, FrameRate, VstrmPacket};
