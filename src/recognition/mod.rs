//! Wake-word / voice-activity lifecycle handling.
//!
//! The recognition engine runs outside this crate.  At start-up the device
//! hands it an [`EngineSetup`]: its init-time knobs, the recorder pipeline
//! it opens itself, and the mailbox it reports lifecycle events to.
//! [`RecognitionHandler`] turns those events into voice-service requests,
//! indicator changes and playback pauses.

pub mod handler;

pub use handler::RecognitionHandler;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::audio::RecorderPipeline;
use crate::config::RecognitionConfig;

/// Lifecycle events emitted by the recognition engine, in order of a
/// typical session: `WakeupStart → VoiceActivityStart → VoiceActivityStop →
/// WakeupEnd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Wake word detected (or wake-up triggered by the record key).
    WakeupStart,
    /// Speech started.
    VoiceActivityStart,
    /// Speech ended.
    VoiceActivityStop,
    /// Wake-up window closed.
    WakeupEnd,
    /// Any other engine event, identified by its raw code.
    Other(i32),
}

/// Everything the engine needs from the core, delivered once by
/// [`Device::spawn`](crate::app::Device::spawn).
#[derive(Clone)]
pub struct EngineSetup {
    pub config: RecognitionConfig,
    /// Audio source the engine opens, reads and closes per session.
    pub recorder: Arc<RecorderPipeline>,
    /// Recognition mailbox.  The device holds the only strong sender, so
    /// sends fail once it shuts down.
    pub events: mpsc::WeakSender<RecognitionEvent>,
}

impl EngineSetup {
    /// Post `event` to the recognition mailbox without blocking.
    ///
    /// Returns `false` when the mailbox is full or already closed.
    pub fn report(&self, event: RecognitionEvent) -> bool {
        match self.events.upgrade() {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("recognition: dropping {event:?}: {e}");
                    false
                }
            },
            None => {
                log::debug!("recognition: mailbox closed, dropping {event:?}");
                false
            }
        }
    }
}

/// Control surface of the recognition engine used by the core.
pub trait RecognitionEngine: Send + Sync {
    /// Receive the init-time wiring.  Called once, before any event is
    /// dispatched.
    fn setup(&self, setup: EngineSetup);

    /// Start a wake-up session without waiting for the wake word.
    fn trigger_wakeup(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecorderConfig;
    use crate::testing::SilentCapture;

    fn setup(events: mpsc::WeakSender<RecognitionEvent>) -> EngineSetup {
        EngineSetup {
            config: RecognitionConfig::default(),
            recorder: Arc::new(RecorderPipeline::new(
                Arc::new(SilentCapture),
                RecorderConfig::default(),
            )),
            events,
        }
    }

    #[tokio::test]
    async fn report_posts_to_the_mailbox() {
        let (tx, mut rx) = mpsc::channel(1);
        let setup = setup(tx.downgrade());

        assert!(setup.report(RecognitionEvent::WakeupStart));
        assert_eq!(rx.recv().await, Some(RecognitionEvent::WakeupStart));
    }

    #[tokio::test]
    async fn report_fails_when_full_or_closed() {
        let (tx, rx) = mpsc::channel(1);
        let setup = setup(tx.downgrade());

        assert!(setup.report(RecognitionEvent::VoiceActivityStart));
        assert!(!setup.report(RecognitionEvent::VoiceActivityStop));

        drop(tx);
        drop(rx);
        assert!(!setup.report(RecognitionEvent::WakeupEnd));
    }
}
