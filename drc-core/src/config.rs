//! Streamer endpoints and timing.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DrcError;

// ── Default endpoints ────────────────────────────────────────────

pub const DEFAULT_MSG_BIND: &str = "192.168.1.10:50010";
pub const DEFAULT_INPUT_BIND: &str = crate::input::DEFAULT_INPUT_BIND;
pub const DEFAULT_CMD_BIND: &str = "192.168.1.10:50023";
pub const DEFAULT_VIDEO_DEST: &str = "192.168.1.11:50120";
pub const DEFAULT_AUDIO_DEST: &str = "192.168.1.11:50121";
pub const DEFAULT_CMD_DEST: &str = "192.168.1.11:50123";

// ── StreamerConfig ───────────────────────────────────────────────

/// Addresses are `host:port` strings, resolved when the streamer starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Local address for device messages.
    pub msg_bind: String,
    /// Local address for input reports.
    pub input_bind: String,
    /// Local address for command replies.
    pub cmd_bind: String,
    pub video_dest: String,
    pub audio_dest: String,
    pub cmd_dest: String,
    /// Input link is reported lost after this long without a report.
    pub input_timeout_ms: u64,
    /// Ceiling for waited commands.
    pub command_timeout_ms: u64,
}

/// Resolved [`StreamerConfig`] endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub msg_bind: SocketAddr,
    pub input_bind: SocketAddr,
    pub cmd_bind: SocketAddr,
    pub video_dest: SocketAddr,
    pub audio_dest: SocketAddr,
    pub cmd_dest: SocketAddr,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            msg_bind: DEFAULT_MSG_BIND.into(),
            input_bind: DEFAULT_INPUT_BIND.into(),
            cmd_bind: DEFAULT_CMD_BIND.into(),
            video_dest: DEFAULT_VIDEO_DEST.into(),
            audio_dest: DEFAULT_AUDIO_DEST.into(),
            cmd_dest: DEFAULT_CMD_DEST.into(),
            input_timeout_ms: 1000,
            command_timeout_ms: 10_000,
        }
    }
}

impl StreamerConfig {
    /// All-loopback config on OS-assigned ports.
    pub fn loopback() -> Self {
        Self {
            msg_bind: "127.0.0.1:0".into(),
            input_bind: "127.0.0.1:0".into(),
            cmd_bind: "127.0.0.1:0".into(),
            video_dest: "127.0.0.1:50120".into(),
            audio_dest: "127.0.0.1:50121".into(),
            cmd_dest: "127.0.0.1:50123".into(),
            ..Self::default()
        }
    }

    pub fn resolve(&self) -> Result<Endpoints, DrcError> {
        Ok(Endpoints {
            msg_bind: parse_endpoint(&self.msg_bind)?,
            input_bind: parse_endpoint(&self.input_bind)?,
            cmd_bind: parse_endpoint(&self.cmd_bind)?,
            video_dest: parse_endpoint(&self.video_dest)?,
            audio_dest: parse_endpoint(&self.audio_dest)?,
            cmd_dest: parse_endpoint(&self.cmd_dest)?,
        })
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}

pub fn parse_endpoint(s: &str) -> Result<SocketAddr, DrcError> {
    s.trim()
        .parse()
        .map_err(|_| DrcError::InvalidEndpoint(s.to_string()))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let ep = StreamerConfig::default().resolve().unwrap();
        assert_eq!(ep.input_bind.port(), 50022);
        assert_eq!(ep.video_dest.to_string(), "192.168.1.11:50120");
        assert_eq!(ep.cmd_dest.port(), 50123);
    }

    #[test]
    fn bad_endpoint_is_named() {
        let cfg = StreamerConfig {
            audio_dest: "gamepad:audio".into(),
            ..StreamerConfig::default()
        };
        match cfg.resolve() {
            Err(DrcError::InvalidEndpoint(s)) => assert_eq!(s, "gamepad:audio"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timeouts_never_zero() {
        let cfg = StreamerConfig {
            input_timeout_ms: 0,
            ..StreamerConfig::default()
        };
        assert_eq!(cfg.input_timeout(), Duration::from_millis(1));
        assert_eq!(cfg.command_timeout(), Duration::from_secs(10));
    }
}
