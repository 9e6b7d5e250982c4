//! Maps classified peripheral events to device actions.
//!
//! | Event | Action |
//! |-------|--------|
//! | record key pressed | trigger wake-up in the recognition engine |
//! | mode key released / long-released | reserved, no action |
//! | volume-down pressed | volume − step, clamped at 0 |
//! | volume-up pressed | volume + step, clamped at 100 |
//! | play pressed | reserved, no action |
//! | provisioning pressed | spawn the provisioning task, indicator → provisioning |
//! | network connecting | indicator → connecting |
//! | network connected | request service connect, indicator → connected |
//! | network disconnected | indicator → disconnected |
//! | anything else | ignored |

use std::sync::Arc;

use tokio::sync::mpsc;

use super::event::{
    ButtonKey, KeyAction, KeyMap, NetworkStatus, PeripheralEvent, RawPeripheralEvent, TouchPad,
};
use super::DispatchError;
use crate::config::DeviceConfig;
use crate::indicator::{Indicator, IndicatorMode};
use crate::playback::{step_volume, Playback};
use crate::provisioning::Provisioner;
use crate::recognition::RecognitionEngine;
use crate::service::ServiceSession;

pub struct PeripheralDispatcher {
    keymap: KeyMap,
    volume_step: u8,
    engine: Arc<dyn RecognitionEngine>,
    playback: Arc<dyn Playback>,
    indicator: Arc<dyn Indicator>,
    session: Arc<ServiceSession>,
    provisioner: Arc<Provisioner>,
}

impl PeripheralDispatcher {
    pub fn new(
        config: &DeviceConfig,
        engine: Arc<dyn RecognitionEngine>,
        playback: Arc<dyn Playback>,
        indicator: Arc<dyn Indicator>,
        session: Arc<ServiceSession>,
        provisioner: Arc<Provisioner>,
    ) -> Self {
        Self {
            keymap: KeyMap::from(&config.keys),
            volume_step: config.playback.volume_step,
            engine,
            playback,
            indicator,
            session,
            provisioner,
        }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn provisioner(&self) -> &Arc<Provisioner> {
        &self.provisioner
    }

    /// Classify `raw` with the board wiring and handle it.
    pub fn dispatch_raw(&self, raw: &RawPeripheralEvent) -> Result<(), DispatchError> {
        self.handle(self.keymap.classify(raw))
    }

    /// # Errors
    ///
    /// [`DispatchError::Provisioning`] when the provisioning pad is pressed
    /// while a provisioning task is already running.  Nothing else changes.
    pub fn handle(&self, event: PeripheralEvent) -> Result<(), DispatchError> {
        match event {
            PeripheralEvent::Button { key, action } => self.on_button(key, action),
            PeripheralEvent::Touch { pad, action } => self.on_touch(pad, action)?,
            PeripheralEvent::Network(status) => self.on_network(status),
            PeripheralEvent::Other => log::debug!("peripheral: ignoring unclassified event"),
        }
        Ok(())
    }

    fn on_button(&self, key: ButtonKey, action: KeyAction) {
        match (key, action) {
            (ButtonKey::Record, KeyAction::Pressed) => {
                log::info!("peripheral: record key pressed, triggering wake-up");
                self.engine.trigger_wakeup();
            }
            (ButtonKey::Mode, KeyAction::Released | KeyAction::LongReleased) => {
                log::debug!("peripheral: mode key {action:?} (reserved)");
            }
            _ => log::debug!("peripheral: {key:?} {action:?} ignored"),
        }
    }

    fn on_touch(&self, pad: TouchPad, action: KeyAction) -> Result<(), DispatchError> {
        if action != KeyAction::Pressed {
            log::debug!("peripheral: touch {pad:?} {action:?} ignored");
            return Ok(());
        }
        match pad {
            TouchPad::VolumeDown => self.adjust_volume(-i16::from(self.volume_step)),
            TouchPad::VolumeUp => self.adjust_volume(i16::from(self.volume_step)),
            TouchPad::Play => log::debug!("peripheral: play pad pressed (reserved)"),
            TouchPad::Provisioning => {
                log::info!("peripheral: provisioning pad pressed");
                self.provisioner.try_spawn()?;
                self.indicator.set_mode(IndicatorMode::Provisioning);
            }
        }
        Ok(())
    }

    fn adjust_volume(&self, delta: i16) {
        let current = self.playback.volume();
        let next = step_volume(current, delta);
        log::info!("peripheral: volume {current} → {next}");
        self.playback.set_volume(next);
    }

    fn on_network(&self, status: NetworkStatus) {
        match status {
            NetworkStatus::Connecting => {
                log::info!("peripheral: network connecting");
                self.indicator.set_mode(IndicatorMode::Connecting);
            }
            NetworkStatus::Connected => {
                log::info!("peripheral: network connected");
                self.session.connect();
                self.indicator.set_mode(IndicatorMode::Connected);
            }
            NetworkStatus::Disconnected => {
                log::info!("peripheral: network disconnected");
                self.indicator.set_mode(IndicatorMode::Disconnected);
            }
            other => log::debug!("peripheral: network {other:?} ignored"),
        }
    }

    /// Dispatch raw events until the sender side is dropped.  A rejected
    /// event is logged and does not affect the ones after it.
    pub async fn run(self, mut rx: mpsc::Receiver<RawPeripheralEvent>) {
        while let Some(raw) = rx.recv().await {
            if let Err(e) = self.dispatch_raw(&raw) {
                log::info!("peripheral: event rejected: {e}");
            }
        }
        log::info!("peripheral: event channel closed, dispatcher exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::runtime::Handle;

    use crate::config::ProvisioningConfig;
    use crate::provisioning::ProvisioningError;
    use crate::service::RetryPolicy;
    use crate::testing::{
        FakeEngine, FakeLink, FakePlayback, RecordingIndicator, RecordingService, RecordingTimer,
        ServiceCall,
    };

    struct Fixture {
        dispatcher: PeripheralDispatcher,
        engine: Arc<FakeEngine>,
        playback: Arc<FakePlayback>,
        indicator: Arc<RecordingIndicator>,
        service: Arc<RecordingService>,
        link: Arc<FakeLink>,
    }

    fn fixture_with(link: Arc<FakeLink>, volume: u8) -> Fixture {
        let config = DeviceConfig::default();
        let service = Arc::new(RecordingService::default());
        let session = Arc::new(ServiceSession::new(
            service.clone(),
            Arc::new(RecordingTimer::default()),
            link.clone(),
            RetryPolicy::default(),
        ));
        let provisioner = Arc::new(Provisioner::new(
            link.clone(),
            ProvisioningConfig::default(),
            Handle::current(),
        ));
        let engine = Arc::new(FakeEngine::default());
        let playback = Arc::new(FakePlayback::new(volume));
        let indicator = Arc::new(RecordingIndicator::default());
        let dispatcher = PeripheralDispatcher::new(
            &config,
            engine.clone(),
            playback.clone(),
            indicator.clone(),
            session,
            provisioner,
        );
        Fixture {
            dispatcher,
            engine,
            playback,
            indicator,
            service,
            link,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeLink::hanging(), 50)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    fn touch(f: &Fixture, pad: TouchPad) -> Result<(), DispatchError> {
        let code = f.dispatcher.keymap().pad_code(pad);
        f.dispatcher
            .dispatch_raw(&RawPeripheralEvent::touch(code, KeyAction::Pressed))
    }

    #[tokio::test]
    async fn record_key_triggers_wakeup_only_on_press() {
        let f = fixture();
        f.dispatcher
            .dispatch_raw(&RawPeripheralEvent::button(36, KeyAction::Pressed))
            .unwrap();
        f.dispatcher
            .dispatch_raw(&RawPeripheralEvent::button(36, KeyAction::Released))
            .unwrap();
        assert_eq!(f.engine.wakeups(), 1);
    }

    #[tokio::test]
    async fn reserved_inputs_have_no_effect() {
        let f = fixture();
        for action in [KeyAction::Released, KeyAction::LongReleased] {
            f.dispatcher
                .dispatch_raw(&RawPeripheralEvent::button(39, action))
                .unwrap();
        }
        touch(&f, TouchPad::Play).unwrap();
        f.dispatcher
            .dispatch_raw(&RawPeripheralEvent::touch(4, KeyAction::Released))
            .unwrap();

        assert_eq!(f.engine.wakeups(), 0);
        assert_eq!(f.playback.volume(), 50);
        assert!(f.indicator.modes().is_empty());
        assert!(f.service.calls().is_empty());
    }

    #[tokio::test]
    async fn volume_steps_are_clamped() {
        let f = fixture_with(FakeLink::hanging(), 15);
        touch(&f, TouchPad::VolumeDown).unwrap();
        assert_eq!(f.playback.volume(), 5);
        for _ in 0..3 {
            touch(&f, TouchPad::VolumeDown).unwrap();
        }
        assert_eq!(f.playback.volume(), 0);

        for _ in 0..12 {
            touch(&f, TouchPad::VolumeUp).unwrap();
        }
        assert_eq!(f.playback.volume(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn provisioning_pad_spawns_once_and_rejects_duplicates() {
        let f = fixture();
        touch(&f, TouchPad::Provisioning).unwrap();
        assert!(f.dispatcher.provisioner().is_running());
        assert_eq!(f.indicator.modes(), vec![IndicatorMode::Provisioning]);

        assert_eq!(
            touch(&f, TouchPad::Provisioning),
            Err(DispatchError::Provisioning(ProvisioningError::AlreadyRunning))
        );
        assert_eq!(f.indicator.modes(), vec![IndicatorMode::Provisioning]);

        // Handshake times out after 30 s and clears the slot.
        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert!(!f.dispatcher.provisioner().is_running());

        touch(&f, TouchPad::Provisioning).unwrap();
        settle().await;
        assert_eq!(f.link.provision_calls(), 2);
    }

    #[tokio::test]
    async fn network_status_drives_indicator_and_connect() {
        let f = fixture();
        for status in [
            NetworkStatus::Connecting,
            NetworkStatus::Connected,
            NetworkStatus::Disconnected,
            NetworkStatus::Setting,
        ] {
            f.dispatcher
                .dispatch_raw(&RawPeripheralEvent::network(status))
                .unwrap();
        }

        assert_eq!(f.service.calls(), vec![ServiceCall::Connect]);
        assert_eq!(
            f.indicator.modes(),
            vec![
                IndicatorMode::Connecting,
                IndicatorMode::Connected,
                IndicatorMode::Disconnected,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_keeps_going_after_a_rejected_event() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(8);

        tx.send(RawPeripheralEvent::touch(9, KeyAction::Pressed))
            .await
            .unwrap();
        tx.send(RawPeripheralEvent::touch(9, KeyAction::Pressed))
            .await
            .unwrap();
        tx.send(RawPeripheralEvent::touch(7, KeyAction::Pressed))
            .await
            .unwrap();
        drop(tx);
        f.dispatcher.run(rx).await;

        assert_eq!(f.playback.volume(), 60);
        assert_eq!(f.indicator.modes(), vec![IndicatorMode::Provisioning]);
    }
}
