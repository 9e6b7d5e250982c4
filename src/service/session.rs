//! Voice service session: connection state machine and retry policy.
//!
//! [`ServiceSession`] is the single owner of the connection state and the
//! retry counter.  Both sit behind one mutex, so state-change events from the
//! service subsystem and the retry-timer callback cannot interleave a
//! read-modify-write of the counter.
//!
//! # Transitions
//!
//! | Reported state | Effect |
//! |----------------|--------|
//! | `Idle`         | run the retry policy (below) |
//! | `Connected`    | reset the retry counter to 1 |
//! | `Connecting`, `Running`, `Stopped` | stored, no side effect |
//!
//! Retry policy on `Idle`:
//! 1. network link is provisioning → nothing to retry against, skip;
//! 2. counter below the ceiling → double it, re-arm the timer with
//!    `base × counter`;
//! 3. otherwise → log exhaustion, stop the timer for good.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use super::retry::{ReconnectTimer, RetryCounter, RetryPolicy};
use super::state::ConnectionState;
use crate::provisioning::NetworkLink;

// ---------------------------------------------------------------------------
// VoiceService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("voice service request failed: {0}")]
    Request(String),
}

/// Outward API of the cloud voice-service subsystem.
///
/// Each call is a request; the outcome comes back later as a
/// [`ConnectionState`] event.  `start` is idempotent at the service layer.
pub trait VoiceService: Send + Sync {
    fn connect(&self) -> Result<(), ServiceError>;
    fn start(&self) -> Result<(), ServiceError>;
    fn stop(&self) -> Result<(), ServiceError>;
}

// ---------------------------------------------------------------------------
// RetryDecision
// ---------------------------------------------------------------------------

/// What the session did in response to a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Non-idle state; nothing to decide.
    NotApplicable,
    /// Backoff counter cleared after a successful login.
    Reset,
    /// Network is being provisioned; no retry scheduled.
    Deferred,
    /// Reconnect armed after the given period.
    Scheduled(Duration),
    /// Ceiling reached; automatic retries have stopped.
    Exhausted,
}

// ---------------------------------------------------------------------------
// ServiceSession
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SessionState {
    connection: ConnectionState,
    retry: RetryCounter,
}

/// The process-lifetime voice service handle.
pub struct ServiceSession {
    service: Arc<dyn VoiceService>,
    timer: Arc<dyn ReconnectTimer>,
    link: Arc<dyn NetworkLink>,
    policy: RetryPolicy,
    state: Mutex<SessionState>,
}

impl ServiceSession {
    pub fn new(
        service: Arc<dyn VoiceService>,
        timer: Arc<dyn ReconnectTimer>,
        link: Arc<dyn NetworkLink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            service,
            timer,
            link,
            policy,
            state: Mutex::new(SessionState {
                connection: ConnectionState::Idle,
                retry: RetryCounter::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        self.lock().connection
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn retry_counter(&self) -> u32 {
        self.lock().retry.value()
    }

    // -----------------------------------------------------------------------
    // Outward requests
    // -----------------------------------------------------------------------

    pub fn connect(&self) {
        log::info!("service: connect requested");
        if let Err(e) = self.service.connect() {
            log::warn!("service: {e}");
        }
    }

    pub fn start(&self) {
        log::info!("service: start requested");
        if let Err(e) = self.service.start() {
            log::warn!("service: {e}");
        }
    }

    pub fn stop(&self) {
        log::info!("service: stop requested");
        if let Err(e) = self.service.stop() {
            log::warn!("service: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Apply a state reported by the service subsystem.
    pub fn on_state_change(&self, next: ConnectionState) -> RetryDecision {
        let mut st = self.lock();
        log::debug!("service: {} → {}", st.connection, next);
        st.connection = next;

        match next {
            ConnectionState::Idle => self.on_idle(&mut st),
            ConnectionState::Connected => {
                st.retry.reset();
                RetryDecision::Reset
            }
            ConnectionState::Connecting => RetryDecision::NotApplicable,
            ConnectionState::Running => RetryDecision::NotApplicable,
            ConnectionState::Stopped => RetryDecision::NotApplicable,
        }
    }

    fn on_idle(&self, st: &mut SessionState) -> RetryDecision {
        if self.link.is_provisioning() {
            log::info!("service: idle while network is provisioning, not retrying");
            return RetryDecision::Deferred;
        }

        match self.policy.next_period(&mut st.retry) {
            Some(period) => {
                log::info!(
                    "service: session idle, reconnecting in {} ms (retry {})",
                    period.as_millis(),
                    st.retry.value()
                );
                self.timer.reschedule(period);
                RetryDecision::Scheduled(period)
            }
            None => {
                log::error!(
                    "service: reconnect failed {} times, giving up",
                    st.retry.value()
                );
                self.timer.stop();
                RetryDecision::Exhausted
            }
        }
    }

    /// Consume state-change events until the sender side is dropped.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<ConnectionState>) {
        while let Some(state) = rx.recv().await {
            self.on_state_change(state);
        }
        log::info!("service: event channel closed, session loop exiting");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
