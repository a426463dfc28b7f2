//! Periodic driver that feeds `tick()` to a shared engine.
//!
//! The period is armed when the engine starts or resumes, so the first tick
//! of a run always lands one full period later. The next period is only armed
//! after the previous tick has returned, so two ticks never overlap even when
//! a tick cascades into a step completion.

use crate::events::TimerEvent;
use crate::models::TimerSettings;
use crate::timer_engine::{AdvanceResult, TimerEngine};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

pub type SharedEngine = Arc<Mutex<TimerEngine>>;

#[derive(Debug)]
pub struct ClockDriver {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ClockDriver {
    /// Spawns the driver on the current tokio runtime.
    pub fn spawn(engine: SharedEngine, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let started = Arc::new(Notify::new());
        let subscription = match engine.lock() {
            Ok(mut engine) => {
                let started = Arc::clone(&started);
                Some(engine.subscribe(move |event| {
                    if matches!(event, TimerEvent::Started { .. }) {
                        started.notify_one();
                    }
                }))
            }
            Err(_) => None,
        };

        let handle = tokio::spawn(async move {
            loop {
                match is_running(&engine) {
                    None => break,
                    Some(false) => {
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            _ = started.notified() => continue,
                        }
                    }
                    Some(true) => {}
                }
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    // A resume inside the period re-arms it from now.
                    _ = started.notified() => continue,
                    _ = tokio::time::sleep(period) => {}
                }
                if !drive_tick(&engine) {
                    break;
                }
            }
            if let (Some(id), Ok(mut engine)) = (subscription, engine.lock()) {
                engine.unsubscribe(id);
            }
            debug!("clock driver stopped");
        });
        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    /// Spawns the driver with the period configured in `settings`. A zero
    /// interval falls back to [`DEFAULT_TICK_INTERVAL`].
    pub fn from_settings(engine: SharedEngine, settings: &TimerSettings) -> Self {
        Self::spawn(engine, tick_period(settings))
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            error!("clock driver task failed: {err}");
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.handle.abort();
        }
    }
}

fn tick_period(settings: &TimerSettings) -> Duration {
    if settings.tick_interval_ms == 0 {
        warn!("tick interval of 0ms configured, using default");
        return DEFAULT_TICK_INTERVAL;
    }
    Duration::from_millis(settings.tick_interval_ms)
}

fn is_running(engine: &Mutex<TimerEngine>) -> Option<bool> {
    match engine.lock() {
        Ok(engine) => Some(engine.is_running()),
        Err(_) => {
            error!("timer engine lock poisoned, stopping clock");
            None
        }
    }
}

/// Delivers one tick if the engine is running. Returns `false` when the
/// driver should stop.
fn drive_tick(engine: &Mutex<TimerEngine>) -> bool {
    let mut engine = match engine.lock() {
        Ok(engine) => engine,
        Err(_) => {
            error!("timer engine lock poisoned, stopping clock");
            return false;
        }
    };
    if !engine.is_running() {
        return true;
    }
    match engine.tick() {
        AdvanceResult::StepAdvanced { step_index } => {
            debug!(step_index, "clock advanced to next step");
        }
        AdvanceResult::SequenceCompleted => debug!("clock reached end of sequence"),
        _ => {}
    }
    true
}
