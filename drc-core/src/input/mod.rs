//! Gamepad input: report decoding, touchscreen calibration, and the
//! receiver that keeps the latest snapshot.
//!
//! ```text
//! UDP datagram ─► RawInputReport::parse ─► to_snapshot (+ calibration)
//!                                              │
//!                                              ▼
//!                         watch channel ◄── publish ◄── link timeout
//!                              │
//!                              ▼
//!                      InputReceiver::poll
//! ```

pub mod calibration;
pub mod decoder;
pub mod receiver;
pub mod snapshot;

pub use calibration::CalibrationParams;
pub use decoder::{INPUT_REPORT_SIZE, RawInputReport, decode_report};
pub use receiver::{DEFAULT_INPUT_BIND, DEFAULT_INPUT_TIMEOUT, InputReceiver};
pub use snapshot::{Buttons, InputSnapshot, PowerStatus, TouchState};
