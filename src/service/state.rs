//! Voice-service connection states as reported by the service subsystem.

use std::fmt;

/// Connection state of the cloud voice session.
///
/// ```text
/// Idle ──connect──▶ Connecting ──▶ Connected ──start──▶ Running ──stop──▶ Stopped
///  ▲                                                                     │
///  └───────────────────────── session lost / quit ◀──────────────────────┘
/// ```
///
/// Only the service subsystem moves the session between states; the core
/// reacts to what it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No session with the backend.  Entering it triggers the retry policy.
    #[default]
    Idle,
    Connecting,
    /// Logged in; resets the reconnection backoff.
    Connected,
    /// A voice request is streaming.
    Running,
    Stopped,
}

impl ConnectionState {
    /// ```
    /// use voice_assistant_core::service::ConnectionState;
    ///
    /// assert!(ConnectionState::Running.is_running());
    /// assert!(!ConnectionState::Connected.is_running());
    /// ```
    pub fn is_running(&self) -> bool {
        matches!(self, ConnectionState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Running => "Running",
            ConnectionState::Stopped => "Stopped",
        }
    }

    /// Parse a case-insensitive state name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "idle" => Some(ConnectionState::Idle),
            "connecting" => Some(ConnectionState::Connecting),
            "connected" => Some(ConnectionState::Connected),
            "running" => Some(ConnectionState::Running),
            "stopped" => Some(ConnectionState::Stopped),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
