//! Network provisioning: the network-link seam and the singleton
//! provisioning task.
//!
//! [`Provisioner::try_spawn`] checks and fills the task slot under one lock,
//! so two button presses can never both start a handshake.  The task clears
//! the slot itself when the handshake succeeds, fails or times out; a new
//! attempt needs a new button press.

pub mod task;

pub use task::{run_provisioning, Provisioner};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ProvisioningMode
// ---------------------------------------------------------------------------

/// Handshake protocol used to hand network credentials to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningMode {
    /// Credentials broadcast by the phone app (SmartConfig-style).
    #[default]
    EspTouch,
    /// WeChat AirKiss broadcast.
    AirKiss,
    /// Device opens its own access point and serves a setup page.
    SoftAp,
}

// ---------------------------------------------------------------------------
// ProvisioningError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisioningError {
    /// A provisioning task is already in progress.
    #[error("network provisioning is already running")]
    AlreadyRunning,

    /// The handshake did not finish within the configured timeout.
    #[error("network provisioning timed out after {0:?}")]
    Timeout(Duration),

    /// The network link reported a failure.
    #[error("network link error: {0}")]
    Link(String),
}

// ---------------------------------------------------------------------------
// NetworkLink
// ---------------------------------------------------------------------------

/// The device's network connection.
#[async_trait]
pub trait NetworkLink: Send + Sync {
    /// Returns `true` while the link is in its own provisioning mode.
    fn is_provisioning(&self) -> bool;

    /// Run one provisioning handshake until credentials are applied.
    async fn provision(&self, mode: ProvisioningMode) -> Result<(), ProvisioningError>;
}
