//! Cross-platform configuration location using the `dirs` crate.
//!
//! Config dir:
//!   Windows: %APPDATA%\voice-assistant\
//!   macOS:   ~/Library/Application Support/voice-assistant/
//!   Linux:   ~/.config/voice-assistant/

use std::path::PathBuf;

/// Resolved configuration paths.
#[derive(Debug, Clone)]
pub struct DevicePaths {
    /// Directory holding `device.toml`.
    pub config_dir: PathBuf,
    /// Full path to `device.toml`.
    pub settings_file: PathBuf,
}

impl DevicePaths {
    const APP_NAME: &'static str = "voice-assistant";

    /// Falls back to the current directory if the platform cannot provide a
    /// standard config path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        let settings_file = config_dir.join("device.toml");

        Self {
            config_dir,
            settings_file,
        }
    }
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self::new()
    }
}
