//! Outbound command interface to the BLE stack.
//!
//! Every command is a synchronous request that either succeeds or fails with
//! a [`StackError`]. Completion, when there is any, arrives later as its own
//! [`StackEvent`](crate::event::StackEvent); no command blocks waiting for it.

use crate::config;
use crate::error::StackError;
use crate::event::{CharacteristicId, ConnectionHandle};

/// Handle of a radio advertising configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingSet(pub u8);

/// Pairing I/O capability announced by the security manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    /// "Just works" pairing.
    NoInputNoOutput,
    KeyboardDisplay,
}

/// GAP discoverability mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Discoverability {
    NonDiscoverable,
    LimitedDiscoverable,
    GeneralDiscoverable,
}

/// GAP connectability mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Connectability {
    NonConnectable,
    Scannable,
    ConnectableScannable,
}

/// Advertising timing. Intervals are in 0.625 ms ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingTiming {
    pub min_interval: u32,
    pub max_interval: u32,
    /// 10 ms units, 0 = no timeout.
    pub duration: u16,
    /// 0 = unlimited.
    pub max_events: u8,
}

impl AdvertisingTiming {
    /// Fixed, non-randomized cadence from `config`.
    pub const fn fixed() -> Self {
        Self {
            min_interval: config::ADV_INTERVAL_TICKS,
            max_interval: config::ADV_INTERVAL_TICKS,
            duration: config::ADV_DURATION,
            max_events: config::ADV_MAX_EVENTS,
        }
    }
}

/// Everything `start_advertising` needs besides the set handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingMode {
    pub discoverability: Discoverability,
    pub connectability: Connectability,
}

impl AdvertisingMode {
    /// General discoverable, connectable and scannable.
    pub const GENERAL_CONNECTABLE: Self = Self {
        discoverability: Discoverability::GeneralDiscoverable,
        connectability: Connectability::ConnectableScannable,
    };
}

/// Commands the state machine issues to the stack.
pub trait BleStack {
    /// Set the pairing I/O capability and whether bonds are stored.
    fn configure_security(
        &mut self,
        io: IoCapability,
        bondable: bool,
    ) -> Result<(), StackError>;

    fn create_advertising_set(&mut self) -> Result<AdvertisingSet, StackError>;

    fn set_advertising_timing(
        &mut self,
        set: AdvertisingSet,
        timing: AdvertisingTiming,
    ) -> Result<(), StackError>;

    fn start_advertising(
        &mut self,
        set: AdvertisingSet,
        mode: AdvertisingMode,
    ) -> Result<(), StackError>;

    /// Ask for an encrypted link; triggers pairing / bonding.
    fn increase_security(&mut self, connection: ConnectionHandle) -> Result<(), StackError>;

    /// Forget every stored bond.
    fn delete_bondings(&mut self) -> Result<(), StackError>;

    /// Start closing the connection. `ConnectionClosed` follows later.
    fn close_connection(&mut self, connection: ConnectionHandle) -> Result<(), StackError>;

    fn send_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), StackError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_timing_is_100ms_non_randomized() {
        let timing = AdvertisingTiming::fixed();
        assert_eq!(timing.min_interval, 160);
        assert_eq!(timing.min_interval, timing.max_interval);
        assert_eq!(timing.duration, 0);
        assert_eq!(timing.max_events, 0);
    }

    #[test]
    fn general_connectable_mode() {
        let mode = AdvertisingMode::GENERAL_CONNECTABLE;
        assert_eq!(mode.discoverability, Discoverability::GeneralDiscoverable);
        assert_eq!(mode.connectability, Connectability::ConnectableScannable);
    }
}
