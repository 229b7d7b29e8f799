//! Time source and cooperative cancellation checkpoints for the strategy loops.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: `sleep` advances time instantly and is recorded.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Move virtual time forward without recording a sleep (simulates work taking time).
    pub fn advance(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }

    /// Virtual time since construction.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.state.lock();
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

/// Cancellation flag; `true` means stop at the next checkpoint.
pub type CancelReceiver = watch::Receiver<bool>;

pub fn is_cancelled(cancel: &CancelReceiver) -> bool {
    *cancel.borrow()
}

/// Sleep for `duration` unless cancellation arrives first. Returns `true` if cancelled.
///
/// A dropped sender means nobody can cancel any more; the full sleep is then served.
pub async fn sleep_or_cancelled(
    clock: &dyn Clock,
    duration: Duration,
    cancel: &mut CancelReceiver,
) -> bool {
    if is_cancelled(cancel) {
        return true;
    }
    if duration.is_zero() {
        return false;
    }

    let sleep = clock.sleep(duration);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return true,
                Ok(()) => continue,
                Err(_) => {
                    (&mut sleep).await;
                    return false;
                }
            },
            _ = &mut sleep => return false,
        }
    }
}
