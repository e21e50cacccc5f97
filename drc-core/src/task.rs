//! Cancellable background tasks.
//!
//! Each long-running loop (input receive, message drain) is spawned with
//! its own `CancellationToken`. [`BackgroundTask::shutdown`] cancels the
//! token and waits for the loop to return, so whatever the loop owns
//! (sockets in particular) is released before the caller continues.
//! Dropping without shutdown cancels and aborts, but resources are only
//! freed once the runtime gets around to the aborted task.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub(crate) struct BackgroundTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Spawns `f(token)` on `runtime`. The future should return once the
    /// token is cancelled.
    pub(crate) fn spawn<F, Fut>(runtime: &Handle, name: &'static str, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = runtime.spawn(f(cancel.clone()));
        debug!("{name} task started");
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel the task and wait until it has returned.
    pub(crate) async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!("{} task panicked", self.name);
                }
            }
        }
        debug!("{} task stopped", self.name);
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            handle.abort();
            debug!("{} task aborted", self.name);
        }
    }
}
