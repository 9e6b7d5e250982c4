//! Device wiring: builds the orchestration components and runs their
//! mailboxes.
//!
//! [`Device`] owns one [`ServiceSession`], one [`RecognitionHandler`] and one
//! [`PeripheralDispatcher`] sharing that session.  [`Device::spawn`] moves
//! each component onto its own tokio task fed by an `mpsc` mailbox:
//!
//! ```text
//! peripheral subsystem ──RawPeripheralEvent──▶ PeripheralDispatcher ─┐
//! recognition engine ────RecognitionEvent────▶ RecognitionHandler ───┼─▶ ServiceSession
//! service subsystem ─────ConnectionState─────▶ ServiceSession::run ──┘       │
//!                                                       RetryTimer ◀─────────┘
//! ```
//!
//! Each mailbox preserves per-source ordering; the session's mutex
//! serializes the state it shares across tasks.  Spawning also hands the
//! recognition engine its [`EngineSetup`]: the recognition knobs, the
//! recorder pipeline and a weak sender for the recognition mailbox.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::RecorderPipeline;
use crate::config::{DeviceConfig, RecognitionConfig};
use crate::indicator::Indicator;
use crate::peripheral::{PeripheralDispatcher, RawPeripheralEvent};
use crate::playback::Playback;
use crate::provisioning::{NetworkLink, Provisioner};
use crate::recognition::{EngineSetup, RecognitionEngine, RecognitionEvent, RecognitionHandler};
use crate::service::{
    ConnectionState, ReconnectTimer, RetryPolicy, RetryTimer, ServiceSession, VoiceService,
};

/// Capacity of each component mailbox.
pub const MAILBOX_DEPTH: usize = 32;

/// External subsystems the core drives.
#[derive(Clone)]
pub struct Collaborators {
    pub service: Arc<dyn VoiceService>,
    pub link: Arc<dyn NetworkLink>,
    pub engine: Arc<dyn RecognitionEngine>,
    /// Capture graph the engine opens per wake-up session.
    pub recorder: Arc<RecorderPipeline>,
    pub playback: Arc<dyn Playback>,
    pub indicator: Arc<dyn Indicator>,
}

pub struct Device {
    session: Arc<ServiceSession>,
    recognition: RecognitionHandler,
    dispatcher: PeripheralDispatcher,
    engine: Arc<dyn RecognitionEngine>,
    engine_config: RecognitionConfig,
    recorder: Arc<RecorderPipeline>,
}

impl Device {
    /// Build the device with a tokio [`RetryTimer`] that requests a service
    /// reconnect each time a backoff period elapses.
    pub fn new(config: &DeviceConfig, parts: Collaborators, runtime: Handle) -> Self {
        let service = Arc::clone(&parts.service);
        let timer = RetryTimer::new(runtime.clone(), move || {
            log::info!("service: retry timer fired, reconnecting");
            if let Err(e) = service.connect() {
                log::warn!("service: {e}");
            }
        });
        Self::with_timer(config, parts, Arc::new(timer), runtime)
    }

    /// Build the device around an existing reconnect timer.
    pub fn with_timer(
        config: &DeviceConfig,
        parts: Collaborators,
        timer: Arc<dyn ReconnectTimer>,
        runtime: Handle,
    ) -> Self {
        let session = Arc::new(ServiceSession::new(
            parts.service,
            timer,
            Arc::clone(&parts.link),
            RetryPolicy::new(&config.retry),
        ));
        let provisioner = Arc::new(Provisioner::new(
            parts.link,
            config.provisioning.clone(),
            runtime,
        ));
        let recognition = RecognitionHandler::new(
            Arc::clone(&session),
            Arc::clone(&parts.playback),
            Arc::clone(&parts.indicator),
        );
        let dispatcher = PeripheralDispatcher::new(
            config,
            Arc::clone(&parts.engine),
            parts.playback,
            parts.indicator,
            Arc::clone(&session),
            provisioner,
        );
        log::info!(
            "device: ready (retry base {} ms, ceiling {}, provisioning {:?})",
            config.retry.base_period_ms,
            config.retry.ceiling,
            config.provisioning.mode
        );
        Self {
            session,
            recognition,
            dispatcher,
            engine: parts.engine,
            engine_config: config.recognition.clone(),
            recorder: parts.recorder,
        }
    }

    pub fn session(&self) -> &Arc<ServiceSession> {
        &self.session
    }

    pub fn recognition(&self) -> &RecognitionHandler {
        &self.recognition
    }

    pub fn dispatcher(&self) -> &PeripheralDispatcher {
        &self.dispatcher
    }

    /// Move every component onto its own task on `runtime`, then hand the
    /// recognition engine its setup.
    pub fn spawn(self, runtime: &Handle) -> DeviceHandle {
        let (peripheral_tx, peripheral_rx) = mpsc::channel(MAILBOX_DEPTH);
        let (recognition_tx, recognition_rx) = mpsc::channel(MAILBOX_DEPTH);
        let (service_tx, service_rx) = mpsc::channel(MAILBOX_DEPTH);

        log::info!(
            "device: recognition engine setup (vad off {:?}, wake-up timeout {:?})",
            self.engine_config.vad_off_delay(),
            self.engine_config.wakeup_timeout()
        );
        self.engine.setup(EngineSetup {
            config: self.engine_config,
            recorder: self.recorder,
            events: recognition_tx.downgrade(),
        });

        let provisioner = Arc::clone(self.dispatcher.provisioner());
        let tasks = vec![
            runtime.spawn(self.dispatcher.run(peripheral_rx)),
            runtime.spawn(self.recognition.run(recognition_rx)),
            runtime.spawn(Arc::clone(&self.session).run(service_rx)),
        ];

        DeviceHandle {
            peripherals: peripheral_tx,
            recognition: recognition_tx,
            service: service_tx,
            session: self.session,
            provisioner,
            tasks,
        }
    }
}

/// Mailbox senders for a spawned [`Device`].
pub struct DeviceHandle {
    pub peripherals: mpsc::Sender<RawPeripheralEvent>,
    pub recognition: mpsc::Sender<RecognitionEvent>,
    pub service: mpsc::Sender<ConnectionState>,
    session: Arc<ServiceSession>,
    provisioner: Arc<Provisioner>,
    tasks: Vec<JoinHandle<()>>,
}

impl DeviceHandle {
    pub fn session(&self) -> &Arc<ServiceSession> {
        &self.session
    }

    pub fn provisioner(&self) -> &Arc<Provisioner> {
        &self.provisioner
    }

    /// Close every mailbox and wait for the component loops to drain.
    pub async fn shutdown(self) {
        let Self {
            peripherals,
            recognition,
            service,
            tasks,
            ..
        } = self;
        drop((peripherals, recognition, service));

        for task in tasks {
            if let Err(e) = task.await {
                log::error!("device: component task failed: {e}");
            }
        }
        log::info!("device: shut down");
    }
}
