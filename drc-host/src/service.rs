//! Input monitor service.
//!
//! Starts the streamer, then samples the input snapshot on a fixed
//! interval and logs what changed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use drc_core::{Buttons, InputSnapshot, Streamer};
use tracing::{debug, error, info, warn};

use crate::config::HostConfig;

// ── InputMonitor ─────────────────────────────────────────────────

pub struct InputMonitor {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl InputMonitor {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the monitor from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until stopped. The running flag is cleared on every exit path.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);
        let result = self.monitor().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn monitor(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut streamer = Streamer::new(self.config.network.clone());
        if let Err(e) = streamer.start().await {
            error!("could not start streamer: {e}");
            return Err(e.into());
        }

        let interval = Duration::from_millis(self.config.device.poll_interval_ms.max(1));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut last = InputSnapshot::invalid();
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            let current = streamer.poll_input();
            log_changes(&last, &current);
            last = current;
        }

        streamer.stop().await;
        info!("input monitor stopped");
        Ok(())
    }

    /// Signal the monitor to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ── Change reporting ─────────────────────────────────────────────

/// What differs between two consecutive samples.
#[derive(Debug, Default, PartialEq)]
pub struct InputChange {
    pub link: Option<bool>,
    pub pressed: Buttons,
    pub released: Buttons,
    pub touch: Option<bool>,
}

impl InputChange {
    pub fn between(prev: &InputSnapshot, cur: &InputSnapshot) -> Self {
        let link = (prev.valid != cur.valid).then_some(cur.valid);
        let prev_buttons = if prev.valid { prev.buttons } else { Buttons::empty() };
        let cur_buttons = if cur.valid { cur.buttons } else { Buttons::empty() };
        let touch = (prev.touch.pressed != cur.touch.pressed).then_some(cur.touch.pressed);

        Self {
            link,
            pressed: cur_buttons.difference(prev_buttons),
            released: prev_buttons.difference(cur_buttons),
            touch,
        }
    }
}

fn log_changes(prev: &InputSnapshot, cur: &InputSnapshot) {
    let change = InputChange::between(prev, cur);

    match change.link {
        Some(true) => info!("gamepad link up (battery {})", cur.battery_charge),
        Some(false) => warn!("gamepad link lost"),
        None => {}
    }
    if !change.pressed.is_empty() {
        info!("pressed: {:?}", change.pressed);
    }
    if !change.released.is_empty() {
        info!("released: {:?}", change.released);
    }
    match change.touch {
        Some(true) => debug!("touch down at ({:.3}, {:.3})", cur.touch.x, cur.touch.y),
        Some(false) => debug!("touch up"),
        None => {}
    }
}

// ── Tests ────────────────────────────────────────────────────────
