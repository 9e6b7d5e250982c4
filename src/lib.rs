//! Orchestration core of a voice-assistant device.
//!
//! Turns peripheral events (buttons, touch pads, network status) and
//! recognition-engine events (wake word, voice activity) into actions on a
//! cloud voice-service session, the local player, the status indicator and a
//! one-shot network-provisioning task.  The recorder pipeline adapter hands
//! 16 kHz mono PCM from the microphone to the recognition engine.
//!
//! See [`app::Device`] for the wiring.

pub mod app;
pub mod audio;
pub mod config;
pub mod indicator;
pub mod peripheral;
pub mod playback;
pub mod provisioning;
pub mod recognition;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
