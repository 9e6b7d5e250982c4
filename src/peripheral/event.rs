//! Raw peripheral events and their classification.
//!
//! The peripheral subsystem reports a source kind, a code (GPIO or touch-pad
//! number) and a command.  [`KeyMap`] resolves the code against the board
//! wiring in [`KeyConfig`] and decodes the command, producing a
//! [`PeripheralEvent`] the dispatcher can match on.

use crate::config::KeyConfig;

// ---------------------------------------------------------------------------
// Raw event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Button,
    Touch,
    Network,
    /// Any other peripheral (SD card, ADC buttons …), by its raw type id.
    Other(u32),
}

/// Event as delivered by the peripheral subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPeripheralEvent {
    pub source: SourceKind,
    /// GPIO or touch-pad number; unused for network events.
    pub code: i32,
    pub command: i32,
    pub payload: Vec<u8>,
}

impl RawPeripheralEvent {
    pub fn button(code: i32, action: KeyAction) -> Self {
        Self {
            source: SourceKind::Button,
            code,
            command: action.code(),
            payload: Vec::new(),
        }
    }

    pub fn touch(code: i32, action: KeyAction) -> Self {
        Self {
            source: SourceKind::Touch,
            code,
            command: action.code(),
            payload: Vec::new(),
        }
    }

    pub fn network(status: NetworkStatus) -> Self {
        Self {
            source: SourceKind::Network,
            code: 0,
            command: status.code(),
            payload: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Button / touch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Pressed,
    Released,
    LongPressed,
    LongReleased,
}

impl KeyAction {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Pressed),
            2 => Some(Self::Released),
            3 => Some(Self::LongPressed),
            4 => Some(Self::LongReleased),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Pressed => 1,
            Self::Released => 2,
            Self::LongPressed => 3,
            Self::LongReleased => 4,
        }
    }
}

/// Network-link command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connecting,
    Connected,
    Disconnected,
    /// Link entered its own provisioning mode.
    Setting,
    /// Provisioning handed over new credentials.
    ConfigDone,
}

impl NetworkStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Connecting),
            2 => Some(Self::Connected),
            3 => Some(Self::Disconnected),
            4 => Some(Self::Setting),
            5 => Some(Self::ConfigDone),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Disconnected => 3,
            Self::Setting => 4,
            Self::ConfigDone => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Classified event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKey {
    Record,
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPad {
    VolumeDown,
    VolumeUp,
    Play,
    Provisioning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralEvent {
    Button { key: ButtonKey, action: KeyAction },
    Touch { pad: TouchPad, action: KeyAction },
    Network(NetworkStatus),
    /// Unknown source, code or command.
    Other,
}

/// Board wiring lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    record: i32,
    mode: i32,
    volume_down: i32,
    volume_up: i32,
    play: i32,
    provisioning: i32,
}

impl From<&KeyConfig> for KeyMap {
    fn from(keys: &KeyConfig) -> Self {
        Self {
            record: keys.record_gpio,
            mode: keys.mode_gpio,
            volume_down: keys.volume_down_pad,
            volume_up: keys.volume_up_pad,
            play: keys.play_pad,
            provisioning: keys.provisioning_pad,
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from(&KeyConfig::default())
    }
}

impl KeyMap {
    pub fn button(&self, code: i32) -> Option<ButtonKey> {
        match code {
            c if c == self.record => Some(ButtonKey::Record),
            c if c == self.mode => Some(ButtonKey::Mode),
            _ => None,
        }
    }

    pub fn pad(&self, code: i32) -> Option<TouchPad> {
        match code {
            c if c == self.volume_down => Some(TouchPad::VolumeDown),
            c if c == self.volume_up => Some(TouchPad::VolumeUp),
            c if c == self.play => Some(TouchPad::Play),
            c if c == self.provisioning => Some(TouchPad::Provisioning),
            _ => None,
        }
    }

    /// Code of `pad` on this board.
    pub fn pad_code(&self, pad: TouchPad) -> i32 {
        match pad {
            TouchPad::VolumeDown => self.volume_down,
            TouchPad::VolumeUp => self.volume_up,
            TouchPad::Play => self.play,
            TouchPad::Provisioning => self.provisioning,
        }
    }

    /// Code of `key` on this board.
    pub fn button_code(&self, key: ButtonKey) -> i32 {
        match key {
            ButtonKey::Record => self.record,
            ButtonKey::Mode => self.mode,
        }
    }

    pub fn classify(&self, raw: &RawPeripheralEvent) -> PeripheralEvent {
        let classified = match raw.source {
            SourceKind::Button => self
                .button(raw.code)
                .zip(KeyAction::from_code(raw.command))
                .map(|(key, action)| PeripheralEvent::Button { key, action }),
            SourceKind::Touch => self
                .pad(raw.code)
                .zip(KeyAction::from_code(raw.command))
                .map(|(pad, action)| PeripheralEvent::Touch { pad, action }),
            SourceKind::Network => {
                NetworkStatus::from_code(raw.command).map(PeripheralEvent::Network)
            }
            SourceKind::Other(_) => None,
        };
        classified.unwrap_or(PeripheralEvent::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wiring_classifies_every_input() {
        let map = KeyMap::default();
        assert_eq!(
            map.classify(&RawPeripheralEvent::button(36, KeyAction::Pressed)),
            PeripheralEvent::Button {
                key: ButtonKey::Record,
                action: KeyAction::Pressed
            }
        );
        assert_eq!(
            map.classify(&RawPeripheralEvent::button(39, KeyAction::LongReleased)),
            PeripheralEvent::Button {
                key: ButtonKey::Mode,
                action: KeyAction::LongReleased
            }
        );
        for (code, pad) in [
            (4, TouchPad::VolumeDown),
            (7, TouchPad::VolumeUp),
            (8, TouchPad::Play),
            (9, TouchPad::Provisioning),
        ] {
            assert_eq!(
                map.classify(&RawPeripheralEvent::touch(code, KeyAction::Pressed)),
                PeripheralEvent::Touch {
                    pad,
                    action: KeyAction::Pressed
                }
            );
            assert_eq!(map.pad_code(pad), code);
        }
        assert_eq!(
            map.classify(&RawPeripheralEvent::network(NetworkStatus::Connected)),
            PeripheralEvent::Network(NetworkStatus::Connected)
        );
    }

    #[test]
    fn unknown_codes_and_commands_are_other() {
        let map = KeyMap::default();
        assert_eq!(
            map.classify(&RawPeripheralEvent::button(12, KeyAction::Pressed)),
            PeripheralEvent::Other
        );
        let bad_command = RawPeripheralEvent {
            command: 99,
            ..RawPeripheralEvent::touch(4, KeyAction::Pressed)
        };
        assert_eq!(map.classify(&bad_command), PeripheralEvent::Other);
        let sd_card = RawPeripheralEvent {
            source: SourceKind::Other(3),
            code: 0,
            command: 1,
            payload: vec![1, 2],
        };
        assert_eq!(map.classify(&sd_card), PeripheralEvent::Other);
    }

    #[test]
    fn board_wiring_comes_from_config() {
        let map = KeyMap::from(&KeyConfig {
            record_gpio: 0,
            volume_up_pad: 2,
            ..KeyConfig::default()
        });
        assert_eq!(map.button(0), Some(ButtonKey::Record));
        assert_eq!(map.button(36), None);
        assert_eq!(map.pad(2), Some(TouchPad::VolumeUp));
        assert_eq!(map.button_code(ButtonKey::Mode), 39);
    }

    #[test]
    fn firmware_command_codes_decode() {
        assert_eq!(KeyAction::from_code(1), Some(KeyAction::Pressed));
        assert_eq!(KeyAction::from_code(4), Some(KeyAction::LongReleased));
        assert_eq!(KeyAction::from_code(0), None);
        assert_eq!(NetworkStatus::from_code(0), None);
        assert_eq!(NetworkStatus::from_code(3), Some(NetworkStatus::Disconnected));
    }
}
