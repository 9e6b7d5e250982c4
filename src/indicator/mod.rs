//! Status indicator (LED ring / display) seam.
//!
//! The core only ever asks the indicator to switch modes; how a mode is
//! rendered is the driver's business.

use std::fmt;

/// Modes the indicator driver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorMode {
    /// Wake word heard, capturing the user's request.
    Listening,
    /// Wake-up session over.
    Idle,
    /// Network link is being brought up.
    Connecting,
    /// Network link came up.
    Connected,
    /// Network link went down.
    Disconnected,
    /// Network provisioning handshake in progress.
    Provisioning,
}

impl IndicatorMode {
    pub fn label(&self) -> &'static str {
        match self {
            IndicatorMode::Listening => "listening",
            IndicatorMode::Idle => "idle",
            IndicatorMode::Connecting => "connecting",
            IndicatorMode::Connected => "connected",
            IndicatorMode::Disconnected => "disconnected",
            IndicatorMode::Provisioning => "provisioning",
        }
    }
}

impl fmt::Display for IndicatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives mode changes.  Called from several event sources, hence
/// `Send + Sync`.
pub trait Indicator: Send + Sync {
    fn set_mode(&self, mode: IndicatorMode);
}

/// Indicator that only writes the mode to the log.  Used on hosts without
/// an LED driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_mode(&self, mode: IndicatorMode) {
        log::info!("indicator: {mode}");
    }
}
