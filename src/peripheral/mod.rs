//! Peripheral event routing: buttons, touch pads and network-link status.
//!
//! * [`RawPeripheralEvent`]: what the peripheral subsystem delivers.
//! * [`KeyMap`]: board wiring, turns raw events into [`PeripheralEvent`]s.
//! * [`PeripheralDispatcher`]: the action table.

pub mod dispatcher;
pub mod event;

pub use dispatcher::PeripheralDispatcher;
pub use event::{
    ButtonKey, KeyAction, KeyMap, NetworkStatus, PeripheralEvent, RawPeripheralEvent, SourceKind,
    TouchPad,
};

use thiserror::Error;

use crate::provisioning::ProvisioningError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),
}
