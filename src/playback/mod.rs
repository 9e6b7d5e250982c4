//! Local playback seam: pause on wake-up and volume control.

use std::sync::{Mutex, PoisonError};

/// Highest volume the player accepts.
pub const MAX_VOLUME: u8 = 100;

/// The device's local audio player.
pub trait Playback: Send + Sync {
    /// Returns `true` while something is playing.
    fn is_running(&self) -> bool;
    fn pause(&self);
    /// Current volume in `[0, 100]`.
    fn volume(&self) -> u8;
    /// Apply a volume in `[0, 100]`.
    fn set_volume(&self, volume: u8);
}

/// Apply a signed step to `current`, clamped to `[0, 100]`.
///
/// ```
/// use voice_assistant_core::playback::step_volume;
///
/// assert_eq!(step_volume(95, 10), 100);
/// assert_eq!(step_volume(5, -10), 0);
/// assert_eq!(step_volume(50, -10), 40);
/// ```
pub fn step_volume(current: u8, delta: i16) -> u8 {
    (current as i16 + delta).clamp(0, MAX_VOLUME as i16) as u8
}

#[derive(Debug)]
struct PlayerState {
    running: bool,
    volume: u8,
}

/// In-memory player used on hosts without a playback engine.
#[derive(Debug)]
pub struct LocalPlayback {
    state: Mutex<PlayerState>,
}

impl LocalPlayback {
    pub fn new(volume: u8) -> Self {
        Self {
            state: Mutex::new(PlayerState {
                running: false,
                volume: volume.min(MAX_VOLUME),
            }),
        }
    }

    /// Mark playback as started.
    pub fn play(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running = true;
    }
}

impl Default for LocalPlayback {
    fn default() -> Self {
        Self::new(60)
    }
}

impl Playback for LocalPlayback {
    fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
    }

    fn pause(&self) {
        log::info!("playback: paused");
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running = false;
    }

    fn volume(&self) -> u8 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .volume
    }

    fn set_volume(&self, volume: u8) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .volume = volume.min(MAX_VOLUME);
    }
}
