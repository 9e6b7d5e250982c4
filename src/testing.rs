//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::{AudioChunk, CaptureError, CaptureFormat, CaptureSource, StreamHandle};
use crate::indicator::{Indicator, IndicatorMode};
use crate::playback::Playback;
use crate::provisioning::{NetworkLink, ProvisioningError, ProvisioningMode};
use crate::recognition::{EngineSetup, RecognitionEngine};
use crate::service::{ReconnectTimer, ServiceError, VoiceService};

fn snapshot<T: Clone>(m: &Mutex<Vec<T>>) -> Vec<T> {
    m.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn push<T>(m: &Mutex<Vec<T>>, value: T) {
    m.lock().unwrap_or_else(PoisonError::into_inner).push(value);
}

// ---------------------------------------------------------------------------
// VoiceService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    Connect,
    Start,
    Stop,
}

/// Records every request; optionally fails the next one.
#[derive(Default)]
pub struct RecordingService {
    calls: Mutex<Vec<ServiceCall>>,
    fail_next: Mutex<Option<String>>,
}

impl RecordingService {
    pub fn calls(&self) -> Vec<ServiceCall> {
        snapshot(&self.calls)
    }

    pub fn count(&self, call: ServiceCall) -> usize {
        self.calls().into_iter().filter(|c| *c == call).count()
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    fn record(&self, call: ServiceCall) -> Result<(), ServiceError> {
        push(&self.calls, call);
        match self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(message) => Err(ServiceError::Request(message)),
            None => Ok(()),
        }
    }
}

impl VoiceService for RecordingService {
    fn connect(&self) -> Result<(), ServiceError> {
        self.record(ServiceCall::Connect)
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.record(ServiceCall::Start)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.record(ServiceCall::Stop)
    }
}

// ---------------------------------------------------------------------------
// ReconnectTimer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    Reschedule(Duration),
    Stop,
}

/// Records timer operations without ever firing.
#[derive(Default)]
pub struct RecordingTimer {
    ops: Mutex<Vec<TimerOp>>,
}

impl RecordingTimer {
    pub fn ops(&self) -> Vec<TimerOp> {
        snapshot(&self.ops)
    }

    pub fn scheduled(&self) -> Vec<Duration> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                TimerOp::Reschedule(period) => Some(period),
                TimerOp::Stop => None,
            })
            .collect()
    }

    /// `true` when the last operation armed the timer.
    pub fn is_pending(&self) -> bool {
        matches!(self.ops().last(), Some(TimerOp::Reschedule(_)))
    }
}

impl ReconnectTimer for RecordingTimer {
    fn reschedule(&self, period: Duration) {
        push(&self.ops, TimerOp::Reschedule(period));
    }

    fn stop(&self) {
        push(&self.ops, TimerOp::Stop);
    }
}

// ---------------------------------------------------------------------------
// NetworkLink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
enum Handshake {
    #[default]
    Succeed,
    Hang,
    Fail(String),
    SucceedAfter(Duration),
}

#[derive(Default)]
pub struct FakeLink {
    provisioning: AtomicBool,
    handshake: Handshake,
    modes: Mutex<Vec<ProvisioningMode>>,
}

impl FakeLink {
    fn with(handshake: Handshake) -> Arc<Self> {
        Arc::new(Self {
            handshake,
            ..Self::default()
        })
    }

    /// A link whose handshake never completes.
    pub fn hanging() -> Arc<Self> {
        Self::with(Handshake::Hang)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with(Handshake::Fail(message.into()))
    }

    pub fn completing_after(delay: Duration) -> Arc<Self> {
        Self::with(Handshake::SucceedAfter(delay))
    }

    pub fn set_provisioning(&self, on: bool) {
        self.provisioning.store(on, Ordering::SeqCst);
    }

    pub fn provision_calls(&self) -> usize {
        self.requested_modes().len()
    }

    pub fn requested_modes(&self) -> Vec<ProvisioningMode> {
        snapshot(&self.modes)
    }
}

#[async_trait]
impl NetworkLink for FakeLink {
    fn is_provisioning(&self) -> bool {
        self.provisioning.load(Ordering::SeqCst)
    }

    async fn provision(&self, mode: ProvisioningMode) -> Result<(), ProvisioningError> {
        push(&self.modes, mode);
        match &self.handshake {
            Handshake::Succeed => Ok(()),
            Handshake::Hang => std::future::pending().await,
            Handshake::Fail(message) => Err(ProvisioningError::Link(message.clone())),
            Handshake::SucceedAfter(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionEngine
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeEngine {
    wakeups: AtomicUsize,
    setup: Mutex<Option<EngineSetup>>,
}

impl FakeEngine {
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }

    /// The wiring handed over by the device, if any.
    pub fn received_setup(&self) -> Option<EngineSetup> {
        self.setup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecognitionEngine for FakeEngine {
    fn setup(&self, setup: EngineSetup) {
        *self.setup.lock().unwrap_or_else(PoisonError::into_inner) = Some(setup);
    }

    fn trigger_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// CaptureSource
// ---------------------------------------------------------------------------

/// Starts successfully and never delivers audio until closed.
pub struct SilentCapture;

impl CaptureSource for SilentCapture {
    fn start(
        &self,
        _format: CaptureFormat,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<StreamHandle, CaptureError> {
        Ok(StreamHandle::new(tx))
    }
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

pub struct FakePlayback {
    running: AtomicBool,
    volume: AtomicU8,
    pauses: AtomicUsize,
}

impl FakePlayback {
    pub fn new(volume: u8) -> Self {
        Self {
            running: AtomicBool::new(false),
            volume: AtomicU8::new(volume),
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn set_running(&self, on: bool) {
        self.running.store(on, Ordering::SeqCst);
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

impl Playback for FakePlayback {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn volume(&self) -> u8 {
        self.volume.load(Ordering::SeqCst)
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Indicator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingIndicator {
    modes: Mutex<Vec<IndicatorMode>>,
}

impl RecordingIndicator {
    pub fn modes(&self) -> Vec<IndicatorMode> {
        snapshot(&self.modes)
    }
}

impl Indicator for RecordingIndicator {
    fn set_mode(&self, mode: IndicatorMode) {
        push(&self.modes, mode);
    }
}
