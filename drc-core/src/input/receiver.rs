//! Gamepad input receiver.
//!
//! Listens for input reports (nominally ~180 per second) and keeps the
//! latest [`InputSnapshot`] in a `tokio::sync::watch` channel. Callers
//! poll the current value without blocking; datagram arrival and link
//! timeout both publish through the same replace operation, so readers
//! only ever see whole snapshots.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use crate::error::DrcError;
use crate::input::calibration::CalibrationParams;
use crate::input::decoder::RawInputReport;
use crate::input::snapshot::InputSnapshot;
use crate::task::BackgroundTask;

// ── Constants ────────────────────────────────────────────────────

pub const DEFAULT_INPUT_BIND: &str = "192.168.1.10:50022";

/// Without a valid report for this long, the link is considered lost.
pub const DEFAULT_INPUT_TIMEOUT: Duration = Duration::from_millis(1000);

const RECV_BUFFER_SIZE: usize = 2048;

// ── SharedInput ──────────────────────────────────────────────────

/// State shared between the receive loop and callers.
struct SharedInput {
    current: watch::Sender<InputSnapshot>,
    calibration: RwLock<CalibrationParams>,
}

impl SharedInput {
    fn calibration(&self) -> CalibrationParams {
        *self
            .calibration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current snapshot, returning the previous one.
    fn publish(&self, snapshot: InputSnapshot) -> InputSnapshot {
        self.current.send_replace(snapshot)
    }

    fn ingest(&self, datagram: &[u8]) -> Result<InputSnapshot, DrcError> {
        let snapshot = RawInputReport::parse(datagram)?.to_snapshot(&self.calibration());
        if !self.publish(snapshot).valid {
            info!("input link up");
        }
        Ok(snapshot)
    }

    fn expire(&self, window: Duration) {
        if self.publish(InputSnapshot::invalid()).valid {
            warn!("input link lost: no report for {window:?}");
        }
    }
}

// ── InputReceiver ────────────────────────────────────────────────

/// Owns the input socket and the latest input snapshot.
pub struct InputReceiver {
    bind: String,
    timeout: Duration,
    shared: Arc<SharedInput>,
    task: Option<BackgroundTask>,
    local_addr: Option<SocketAddr>,
}

impl InputReceiver {
    /// Create a receiver that will listen on `bind` (`host:port`).
    pub fn new(bind: impl Into<String>) -> Self {
        let (current, _) = watch::channel(InputSnapshot::invalid());
        Self {
            bind: bind.into(),
            timeout: DEFAULT_INPUT_TIMEOUT,
            shared: Arc::new(SharedInput {
                current,
                calibration: RwLock::new(CalibrationParams::default()),
            }),
            task: None,
            local_addr: None,
        }
    }

    /// Override the link-loss window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bind the socket and start the receive loop.
    pub async fn start(&mut self) -> Result<(), DrcError> {
        if self.is_running() {
            return Err(DrcError::AlreadyStarted);
        }

        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| DrcError::InvalidEndpoint(self.bind.clone()))?;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DrcError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;

        let shared = Arc::clone(&self.shared);
        let window = self.timeout;
        self.task = Some(BackgroundTask::spawn(&Handle::current(), "input receive", move |cancel| {
            receive_loop(socket, shared, window, cancel)
        }));
        self.local_addr = Some(local_addr);

        info!("input receiver listening on {local_addr}");
        Ok(())
    }

    /// Stop updating and wait until the socket is released, so the same
    /// address can be bound again immediately. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.shutdown().await;
            info!("input receiver stopped");
        }
        self.local_addr = None;
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Address the socket is bound to, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The latest snapshot. Never waits for new data.
    pub fn poll(&self) -> InputSnapshot {
        *self.shared.current.borrow()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.shared.current.subscribe()
    }

    /// Decode and publish one datagram, exactly as the receive loop does.
    ///
    /// Malformed datagrams are rejected without touching the snapshot.
    pub fn ingest(&self, datagram: &[u8]) -> Result<InputSnapshot, DrcError> {
        self.shared.ingest(datagram)
    }

    /// Recalibrate the touchscreen from two raw/reference point pairs.
    ///
    /// Applies to reports decoded from now on; the current snapshot is
    /// left as is. On error the previous calibration stays in effect.
    pub fn calibrate_with_points(
        &self,
        raw: [(i32, i32); 2],
        reference: [(i32, i32); 2],
    ) -> Result<(), DrcError> {
        let params = CalibrationParams::from_points(raw, reference)?;
        *self
            .shared
            .calibration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = params;
        info!(?params, "touchscreen recalibrated");
        Ok(())
    }

    pub fn calibration(&self) -> CalibrationParams {
        self.shared.calibration()
    }
}

impl Default for InputReceiver {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_BIND)
    }
}

// ── Receive loop ─────────────────────────────────────────────────

async fn receive_loop(
    socket: UdpSocket,
    shared: Arc<SharedInput>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut deadline = Instant::now() + window;

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            r = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)) => r,
        };

        match received {
            Ok(Ok((len, peer))) => match shared.ingest(&buf[..len]) {
                Ok(_) => deadline = Instant::now() + window,
                Err(e) => trace!("discarded {len}-byte datagram from {peer}: {e}"),
            },
            Ok(Err(e)) => warn!("input socket error: {e}"),
            Err(_) => {
                shared.expire(window);
                deadline = Instant::now() + window;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
