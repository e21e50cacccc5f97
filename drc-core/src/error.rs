//! Error types for the DRC protocol stack.
//!
//! All fallible operations return `Result<T, DrcError>`.
//! Malformed datagrams and link loss are absorbed by the receiver;
//! everything that reaches a caller is typed.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the DRC protocol stack.
#[derive(Debug, Error)]
pub enum DrcError {
    // ── Packet Errors ────────────────────────────────────────────
    /// The payload exceeds the VSTRM payload capacity.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The 8-byte extension-option region cannot hold another entry.
    #[error("no room for extension option {tag:#04x}: need {needed} bytes, {available} left")]
    OptionSpaceExhausted {
        tag: u8,
        needed: usize,
        available: usize,
    },

    /// A value was given for a presence-only tag, or omitted for a valued one.
    #[error("extension option {tag:#04x}: value byte expected: {expects_value}")]
    OptionValueMismatch { tag: u8, expects_value: bool },

    /// A raw buffer does not have a valid packet length.
    #[error("invalid packet length: expected {expected}, got {actual}")]
    InvalidPacketLength { expected: usize, actual: usize },

    /// A video frame buffer does not match its declared geometry.
    #[error("invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    // ── Input Errors ─────────────────────────────────────────────
    /// An input report failed length or marker validation.
    #[error("malformed input report: {0}")]
    MalformedReport(&'static str),

    /// Calibration points do not define an affine mapping.
    #[error("invalid calibration: {0}")]
    InvalidCalibration(&'static str),

    // ── Transport Errors ─────────────────────────────────────────
    /// The socket layer reported an error.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A socket could not be bound to its configured address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An endpoint string is not a valid `host:port` pair.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // ── Command Errors ───────────────────────────────────────────
    /// A command argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A waited operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The device rejected or failed a command.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The reply channel closed before a reply was delivered.
    #[error("reply channel closed")]
    ReplyDropped,

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// The component has not been started.
    #[error("not started")]
    NotStarted,

    /// The component is already running.
    #[error("already started")]
    AlreadyStarted,

    /// The operation needs a collaborator that was not configured.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for DrcError {
    fn from(s: String) -> Self {
        DrcError::Other(s)
    }
}

impl From<&str> for DrcError {
    fn from(s: &str) -> Self {
        DrcError::Other(s.to_string())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for DrcError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        DrcError::ReplyDropped
    }
}
