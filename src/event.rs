//! Inbound events: the closed, totally ordered stream the state machine
//! consumes.
//!
//! Stack lifecycle events and the button's wake token travel on the same
//! channel, so their relative order is exactly the delivery order.

/// Handle of an open connection, valid between its opened and closed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionHandle(pub u16);

/// Stable identifier of a characteristic in the GATT database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicId(pub u16);

/// What changed on a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusFlag {
    /// The client characteristic configuration (CCCD) was written.
    ClientConfig,
    /// An indication was confirmed by the client.
    Confirmation,
    /// Anything else the stack reports.
    Other(u8),
}

/// Client characteristic configuration value (CCCD bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientConfig(pub u16);

impl ClientConfig {
    pub const DISABLED: Self = Self(0x0000);
    pub const NOTIFY: Self = Self(0x0001);
    pub const INDICATE: Self = Self(0x0002);

    /// True when the client turned both notifications and indications off.
    pub fn is_disabled(self) -> bool {
        self == Self::DISABLED
    }
}

/// Events delivered to the peripheral state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StackEvent {
    /// The radio is up. No command may be issued before this.
    Boot,
    /// A central connected.
    ConnectionOpened { connection: ConnectionHandle },
    /// A connection went away (peer, supervision timeout, or our own close).
    ConnectionClosed {
        connection: ConnectionHandle,
        reason: u16,
    },
    /// Pairing completed and the bond was stored.
    Bonded { connection: ConnectionHandle },
    /// Pairing failed. `reason` is the SMP / HCI reason code.
    BondingFailed {
        connection: ConnectionHandle,
        reason: u16,
    },
    /// A characteristic's status changed on behalf of a client.
    CharacteristicStatus {
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        status: StatusFlag,
        client_config: ClientConfig,
    },
    /// Application signal bits raised outside the stack (the button wake).
    ExternalSignal(u32),
    /// Any stack event this application does not handle, by raw id.
    Unknown(u32),
}
