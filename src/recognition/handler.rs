//! Reacts to recognition-engine lifecycle events.
//!
//! | Event | Action |
//! |-------|--------|
//! | `WakeupStart` | ignored while a session is `Running`; otherwise pause local playback if playing, indicator → listening |
//! | `VoiceActivityStart` | request service start |
//! | `VoiceActivityStop` | request service stop if `Running` |
//! | `WakeupEnd` | request service stop if `Running`; indicator → idle |
//! | other | ignored |

use std::sync::Arc;

use tokio::sync::mpsc;

use super::RecognitionEvent;
use crate::indicator::{Indicator, IndicatorMode};
use crate::playback::Playback;
use crate::service::ServiceSession;

pub struct RecognitionHandler {
    session: Arc<ServiceSession>,
    playback: Arc<dyn Playback>,
    indicator: Arc<dyn Indicator>,
}

impl RecognitionHandler {
    pub fn new(
        session: Arc<ServiceSession>,
        playback: Arc<dyn Playback>,
        indicator: Arc<dyn Indicator>,
    ) -> Self {
        Self {
            session,
            playback,
            indicator,
        }
    }

    pub fn handle(&self, event: RecognitionEvent) {
        log::info!("recognition: {event:?}");
        match event {
            RecognitionEvent::WakeupStart => self.on_wakeup_start(),
            RecognitionEvent::VoiceActivityStart => self.session.start(),
            RecognitionEvent::VoiceActivityStop => self.stop_if_running(),
            RecognitionEvent::WakeupEnd => {
                self.stop_if_running();
                self.indicator.set_mode(IndicatorMode::Idle);
            }
            RecognitionEvent::Other(code) => {
                log::debug!("recognition: ignoring engine event {code}");
            }
        }
    }

    fn on_wakeup_start(&self) {
        if self.session.is_running() {
            log::debug!("recognition: session already running, wake-up ignored");
            return;
        }
        if self.playback.is_running() {
            self.playback.pause();
        }
        self.indicator.set_mode(IndicatorMode::Listening);
    }

    fn stop_if_running(&self) {
        if self.session.is_running() {
            self.session.stop();
        } else {
            log::debug!("recognition: session is {}, no stop needed", self.session.state());
        }
    }

    /// Handle engine events until the sender side is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<RecognitionEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        log::info!("recognition: event channel closed, handler exiting");
    }
}
