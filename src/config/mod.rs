//! Device configuration.
//!
//! Provides `DeviceConfig` (top-level settings), one section per subsystem,
//! and `DevicePaths` for locating `device.toml`.  Configuration is read-only
//! from the core's point of view.

pub mod paths;
pub mod settings;

pub use paths::DevicePaths;
pub use settings::{
    DeviceConfig, KeyConfig, PlaybackConfig, ProvisioningConfig, RecognitionConfig,
    RecorderConfig, RetryConfig,
};
