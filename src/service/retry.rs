//! Reconnection backoff: counter, policy and a reschedulable one-shot timer.
//!
//! The counter starts at 1 and doubles on every retry decision, so the
//! periods run 2 s, 4 s, 8 s … up to `base × ceiling`.  Once the counter has
//! reached the ceiling no further retry is scheduled.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::RetryConfig;

// ---------------------------------------------------------------------------
// RetryCounter / RetryPolicy
// ---------------------------------------------------------------------------

/// Backoff multiplier.  Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter(u32);

impl RetryCounter {
    pub fn new() -> Self {
        Self(1)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 1;
    }

    /// Double the counter unless it has already reached `ceiling`.
    ///
    /// Returns the new value, or `None` when retries are exhausted.
    pub fn advance(&mut self, ceiling: u32) -> Option<u32> {
        if self.0 >= ceiling {
            return None;
        }
        self.0 = self.0.saturating_mul(2);
        Some(self.0)
    }
}

impl Default for RetryCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_period: Duration,
    pub ceiling: u32,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            base_period: Duration::from_millis(config.base_period_ms),
            ceiling: config.ceiling,
        }
    }

    /// Advance `counter` and return the next timer period, or `None` once
    /// the ceiling has been reached.
    pub fn next_period(&self, counter: &mut RetryCounter) -> Option<Duration> {
        counter
            .advance(self.ceiling)
            .map(|n| self.base_period.saturating_mul(n))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

// ---------------------------------------------------------------------------
// ReconnectTimer
// ---------------------------------------------------------------------------

/// A one-shot timer that can be re-armed with a new period at any time.
pub trait ReconnectTimer: Send + Sync {
    /// Cancel any pending fire, set `period` and arm the timer again.
    fn reschedule(&self, period: Duration);
    /// Cancel any pending fire.
    fn stop(&self);
}

struct TimerState {
    /// Bumped on every cancel so a fire that raced an abort is discarded.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

/// [`ReconnectTimer`] backed by a tokio task per arming.
pub struct RetryTimer {
    runtime: Handle,
    on_fire: Arc<dyn Fn() + Send + Sync>,
    state: Arc<Mutex<TimerState>>,
}

impl RetryTimer {
    /// Create a stopped timer that runs `on_fire` on `runtime` each time an
    /// armed period elapses.
    pub fn new(runtime: Handle, on_fire: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            runtime,
            on_fire: Arc::new(on_fire),
            state: Arc::new(Mutex::new(TimerState {
                generation: 0,
                pending: None,
            })),
        }
    }

    /// Returns `true` while a fire is scheduled.
    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(state: &mut TimerState) {
        state.generation = state.generation.wrapping_add(1);
        if let Some(task) = state.pending.take() {
            task.abort();
        }
    }
}

impl ReconnectTimer for RetryTimer {
    fn reschedule(&self, period: Duration) {
        let mut st = self.lock();
        Self::cancel(&mut st);

        let generation = st.generation;
        let shared = Arc::clone(&self.state);
        let on_fire = Arc::clone(&self.on_fire);
        st.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(period).await;
            {
                let mut st = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if st.generation != generation {
                    return;
                }
                // One-shot: disarm before firing.
                st.pending = None;
            }
            on_fire();
        }));
    }

    fn stop(&self) {
        Self::cancel(&mut self.lock());
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        Self::cancel(&mut self.lock());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
