//! Device commands and their replies.
//!
//! The command wire protocol belongs to the host's [`CommandTransport`];
//! this module only decides what to ask, how long to wait, and how the
//! reply reaches the caller. A [`PendingReply`] is consumed exactly once,
//! either by waiting on it or by handing it a callback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::DrcError;

// ── Constants ────────────────────────────────────────────────────

/// Highest LCD backlight level; levels are `0..=4`.
pub const MAX_BACKLIGHT_LEVEL: u8 = 4;

/// Upper bound on how long a waited command may block.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

// ── DeviceCommand ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Set the LCD backlight. Construct with [`DeviceCommand::lcd_backlight`].
    SetLcdBacklight(u8),
    /// Read back the UIC configuration block.
    GetUicConfig,
}

impl DeviceCommand {
    pub fn lcd_backlight(level: u8) -> Result<Self, DrcError> {
        if level > MAX_BACKLIGHT_LEVEL {
            return Err(DrcError::InvalidArgument("backlight level must be in 0..=4"));
        }
        Ok(Self::SetLcdBacklight(level))
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetLcdBacklight(level) => write!(f, "set-lcd-backlight({level})"),
            Self::GetUicConfig => f.write_str("get-uic-config"),
        }
    }
}

// ── CommandTransport ─────────────────────────────────────────────

/// Delivers a command to the device and resolves with its reply payload.
///
/// Implementations may deliver replies from any task; the caller bounds
/// the wait, so a request that never resolves is not an error here.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn request(&self, command: DeviceCommand) -> Result<Bytes, DrcError>;
}

// ── PendingReply ─────────────────────────────────────────────────

/// A command in flight.
///
/// The request runs on its own task with the timeout already applied, so
/// dropping a `PendingReply` does not cancel the command; it only
/// discards the answer.
#[must_use = "a pending reply does nothing unless waited on or given a callback"]
pub struct PendingReply {
    command: DeviceCommand,
    rx: oneshot::Receiver<Result<Bytes, DrcError>>,
    runtime: Handle,
}

impl PendingReply {
    /// Issue `command` on `runtime`, failing with `Timeout` after `ceiling`.
    pub fn spawn(
        runtime: &Handle,
        transport: Arc<dyn CommandTransport>,
        command: DeviceCommand,
        ceiling: Duration,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            let result = match tokio::time::timeout(ceiling, transport.request(command)).await {
                Ok(reply) => reply,
                Err(_) => Err(DrcError::Timeout(ceiling)),
            };
            debug!("{command} finished: ok={}", result.is_ok());
            // Receiver gone means nobody wants the answer.
            let _ = tx.send(result);
        });

        Self {
            command,
            rx,
            runtime: runtime.clone(),
        }
    }

    pub fn command(&self) -> DeviceCommand {
        self.command
    }

    /// Wait for the reply.
    pub async fn wait(self) -> Result<Bytes, DrcError> {
        self.rx.await?
    }

    /// Block the current thread until the reply arrives.
    ///
    /// For synchronous callers outside the runtime. Panics if called from
    /// within an async context, like any blocking receive.
    pub fn wait_blocking(self) -> Result<Bytes, DrcError> {
        self.rx.blocking_recv()?
    }

    /// Run `callback` once with the reply, on a runtime task.
    pub fn on_reply<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Bytes, DrcError>) + Send + 'static,
    {
        let rx = self.rx;
        self.runtime.spawn(async move {
            let result = match rx.await {
                Ok(reply) => reply,
                Err(e) => Err(e.into()),
            };
            callback(result);
        })
    }
}

impl fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with the encoded command after `delay`.
    struct EchoTransport {
        delay: Duration,
        seen: Mutex<Vec<DeviceCommand>>,
    }

    impl EchoTransport {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandTransport for EchoTransport {
        async fn request(&self, command: DeviceCommand) -> Result<Bytes, DrcError> {
            self.seen.lock().unwrap().push(command);
            tokio::time::sleep(self.delay).await;
            match command {
                DeviceCommand::SetLcdBacklight(level) => Ok(Bytes::from(vec![level])),
                DeviceCommand::GetUicConfig => Ok(Bytes::from_static(b"uic")),
            }
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl CommandTransport for FailingTransport {
        async fn request(&self, command: DeviceCommand) -> Result<Bytes, DrcError> {
            Err(DrcError::CommandFailed(format!("{command} rejected")))
        }
    }

    #[test]
    fn backlight_level_is_bounded() {
        assert_eq!(
            DeviceCommand::lcd_backlight(4).unwrap(),
            DeviceCommand::SetLcdBacklight(4)
        );
        assert!(DeviceCommand::lcd_backlight(5).is_err());
    }

    #[tokio::test]
    async fn wait_returns_reply() {
        let transport = EchoTransport::new(Duration::ZERO);
        let reply = PendingReply::spawn(
            &Handle::current(),
            transport.clone(),
            DeviceCommand::GetUicConfig,
            DEFAULT_COMMAND_TIMEOUT,
        );
        assert_eq!(reply.wait().await.unwrap(), Bytes::from_static(b"uic"));
        assert_eq!(*transport.seen.lock().unwrap(), [DeviceCommand::GetUicConfig]);
    }

    #[tokio::test]
    async fn wait_times_out_cleanly() {
        let transport = EchoTransport::new(Duration::from_secs(60));
        let ceiling = Duration::from_millis(20);
        let reply = PendingReply::spawn(
            &Handle::current(),
            transport,
            DeviceCommand::SetLcdBacklight(2),
            ceiling,
        );
        assert!(matches!(reply.wait().await, Err(DrcError::Timeout(d)) if d == ceiling));
    }

    #[tokio::test]
    async fn callback_runs_once_with_failure() {
        let reply = PendingReply::spawn(
            &Handle::current(),
            Arc::new(FailingTransport),
            DeviceCommand::GetUicConfig,
            DEFAULT_COMMAND_TIMEOUT,
        );

        let (tx, rx) = oneshot::channel();
        reply
            .on_reply(move |result| {
                let _ = tx.send(result);
            })
            .await
            .unwrap();

        assert!(matches!(rx.await.unwrap(), Err(DrcError::CommandFailed(_))));
    }

    #[test]
    fn blocking_wait_from_plain_thread() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let reply = PendingReply::spawn(
            rt.handle(),
            EchoTransport::new(Duration::from_millis(5)),
            DeviceCommand::SetLcdBacklight(3),
            DEFAULT_COMMAND_TIMEOUT,
        );
        assert_eq!(reply.wait_blocking().unwrap(), Bytes::from(vec![3]));
    }
}
