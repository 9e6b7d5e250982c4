//! Device settings structs, defaults and TOML loading.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]` so a partial `device.toml` only needs
//! to mention the values it overrides.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::DevicePaths;
use crate::provisioning::ProvisioningMode;

// ---------------------------------------------------------------------------
// RecorderConfig
// ---------------------------------------------------------------------------

/// Capture graph formats for the recorder pipeline.
///
/// The codec delivers 48 kHz stereo; the recognition engine consumes 16 kHz
/// mono 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Input capture sample rate in Hz.
    pub source_rate: u32,
    /// Input capture channel count.
    pub source_channels: u16,
    /// Sample rate handed to the recognition engine.
    pub output_rate: u32,
    /// Channel count handed to the recognition engine.
    pub output_channels: u16,
    /// Capacity of the raw-buffer stage in bytes.  When the engine falls
    /// behind, the oldest audio is overwritten.
    pub raw_buffer_bytes: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            source_rate: 48_000,
            source_channels: 2,
            output_rate: 16_000,
            output_channels: 1,
            // 2 s of 16 kHz mono i16
            raw_buffer_bytes: 64_000,
        }
    }
}

// ---------------------------------------------------------------------------
// RecognitionConfig
// ---------------------------------------------------------------------------

/// Knobs handed to the recognition engine at init time.  The core does not
/// interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Silence after speech before the engine reports `VoiceActivityStop`.
    pub vad_off_delay_ms: u64,
    /// How long a wake-up session stays open without speech.
    pub wakeup_timeout_ms: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            vad_off_delay_ms: 800,
            wakeup_timeout_ms: 10_000,
        }
    }
}

impl RecognitionConfig {
    pub fn vad_off_delay(&self) -> Duration {
        Duration::from_millis(self.vad_off_delay_ms)
    }

    pub fn wakeup_timeout(&self) -> Duration {
        Duration::from_millis(self.wakeup_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Reconnection backoff for the voice service session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Period multiplied by the retry counter on every reschedule.
    pub base_period_ms: u64,
    /// Once the counter reaches this value, automatic retries stop.
    pub ceiling: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_period_ms: 1_000,
            ceiling: 128,
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisioningConfig
// ---------------------------------------------------------------------------

/// Network provisioning task settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Upper bound on one provisioning handshake.
    pub timeout_secs: u64,
    /// Handshake protocol requested from the network link.
    pub mode: ProvisioningMode,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            mode: ProvisioningMode::default(),
        }
    }
}

impl ProvisioningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Volume change applied by one touch on volume-up / volume-down.
    pub volume_step: u8,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { volume_step: 10 }
    }
}

// ---------------------------------------------------------------------------
// KeyConfig
// ---------------------------------------------------------------------------

/// Board wiring: which GPIO / touch pad numbers carry which function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub record_gpio: i32,
    pub mode_gpio: i32,
    pub volume_down_pad: i32,
    pub volume_up_pad: i32,
    pub play_pad: i32,
    pub provisioning_pad: i32,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            record_gpio: 36,
            mode_gpio: 39,
            volume_down_pad: 4,
            volume_up_pad: 7,
            play_pad: 8,
            provisioning_pad: 9,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level device configuration, read from `device.toml`.
///
/// ```rust,no_run
/// use voice_assistant_core::config::DeviceConfig;
///
/// // Returns defaults when the file is missing.
/// let config = DeviceConfig::load().unwrap();
/// assert_eq!(config.retry.ceiling, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub recorder: RecorderConfig,
    pub recognition: RecognitionConfig,
    pub retry: RetryConfig,
    pub provisioning: ProvisioningConfig,
    pub playback: PlaybackConfig,
    pub keys: KeyConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            recorder: RecorderConfig::default(),
            recognition: RecognitionConfig::default(),
            retry: RetryConfig::default(),
            provisioning: ProvisioningConfig::default(),
            playback: PlaybackConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Load configuration from the platform-appropriate `device.toml`.
    ///
    /// Returns `Ok(DeviceConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&DevicePaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = DeviceConfig::load_from(&path).expect("should not error");
        assert_eq!(config, DeviceConfig::default());
    }

    #[test]
    fn default_values_match_firmware() {
        let cfg = DeviceConfig::default();

        assert_eq!(cfg.recorder.source_rate, 48_000);
        assert_eq!(cfg.recorder.source_channels, 2);
        assert_eq!(cfg.recorder.output_rate, 16_000);
        assert_eq!(cfg.recorder.output_channels, 1);
        assert_eq!(cfg.recognition.vad_off_delay(), Duration::from_millis(800));
        assert_eq!(cfg.recognition.wakeup_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.retry.base_period_ms, 1_000);
        assert_eq!(cfg.retry.ceiling, 128);
        assert_eq!(cfg.provisioning.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.provisioning.mode, ProvisioningMode::EspTouch);
        assert_eq!(cfg.playback.volume_step, 10);
        assert_eq!(cfg.keys.record_gpio, 36);
        assert_eq!(cfg.keys.provisioning_pad, 9);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("device.toml");
        std::fs::write(
            &path,
            r#"
log_filter = "debug"

[retry]
ceiling = 16

[provisioning]
mode = "air_kiss"

[keys]
record_gpio = 2
"#,
        )
        .expect("write");

        let cfg = DeviceConfig::load_from(&path).expect("load");
        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.retry.ceiling, 16);
        assert_eq!(cfg.retry.base_period_ms, 1_000);
        assert_eq!(cfg.provisioning.mode, ProvisioningMode::AirKiss);
        assert_eq!(cfg.provisioning.timeout_secs, 30);
        assert_eq!(cfg.keys.record_gpio, 2);
        assert_eq!(cfg.keys.mode_gpio, 39);
        assert_eq!(cfg.playback, PlaybackConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("device.toml");
        std::fs::write(&path, "retry = [not valid").expect("write");

        let err = DeviceConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
