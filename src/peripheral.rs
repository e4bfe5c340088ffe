//! Peripheral State Machine - advertising, security, connection, subscription.
//!
//! ```text
//!  Idle --boot--> Advertising --opened--> Securing --bonded--> BondedConnected
//!                     ^                       |                      |
//!                     |      bonding failed: delete bonds, close     |
//!                     +------------------- closed -------------------+
//! ```
//!
//! All state lives in one [`PeripheralState`] owned by the event loop. Events
//! are handled strictly one at a time in delivery order. Commands that keep
//! the device reachable (security setup, advertising, re-advertising after a
//! disconnect, notification sends) fail the handler with an [`Error`]; the
//! loop treats that as fatal. The bonding-failure cleanup is a recovery path
//! and only logs when its commands fail.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Receiver;

use crate::dispatcher;
use crate::error::{Command, CommandResultExt, Error};
use crate::event::{CharacteristicId, ClientConfig, ConnectionHandle, StackEvent, StatusFlag};
use crate::signal::ButtonSignal;
use crate::stack::{AdvertisingMode, AdvertisingSet, AdvertisingTiming, BleStack, IoCapability};

/// Where the peripheral is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Before the boot event.
    Idle,
    /// No connection; advertising is (or is being) re-armed.
    Advertising,
    /// Connected, security requested, not bonded.
    Securing,
    /// Connected and bonded.
    BondedConnected,
}

/// Bonding progress of the active connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BondingStatus {
    Unbonded,
    Bonding,
    Bonded,
}

/// Whether the client enabled report notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subscription {
    Unsubscribed,
    Subscribed,
}

/// The single active connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub bonding: BondingStatus,
    pub subscription: Subscription,
}

impl Connection {
    fn opened(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            bonding: BondingStatus::Bonding,
            subscription: Subscription::Unsubscribed,
        }
    }
}

/// Everything the event loop owns.
pub struct PeripheralState {
    report: CharacteristicId,
    advertising: Option<AdvertisingSet>,
    advertising_running: bool,
    connection: Option<Connection>,
}

impl PeripheralState {
    /// `report` is the characteristic notifications go out on.
    pub const fn new(report: CharacteristicId) -> Self {
        Self {
            report,
            advertising: None,
            advertising_running: false,
            connection: None,
        }
    }

    pub fn link_state(&self) -> LinkState {
        if self.advertising.is_none() {
            return LinkState::Idle;
        }
        match self.connection {
            None => LinkState::Advertising,
            Some(Connection {
                bonding: BondingStatus::Bonded,
                ..
            }) => LinkState::BondedConnected,
            Some(_) => LinkState::Securing,
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn advertising_set(&self) -> Option<AdvertisingSet> {
        self.advertising
    }

    /// True after a successful start command and until a connection opens.
    pub fn is_advertising(&self) -> bool {
        self.advertising_running
    }

    /// Connection that wake signals are sent to, if any.
    pub fn notification_target(&self) -> Option<ConnectionHandle> {
        self.connection
            .filter(|c| c.subscription == Subscription::Subscribed)
            .map(|c| c.handle)
    }

    /// Handle one event. An `Err` means a foundational command failed.
    pub fn handle<S: BleStack + ?Sized>(
        &mut self,
        stack: &mut S,
        button: &ButtonSignal,
        event: StackEvent,
    ) -> Result<(), Error> {
        match event {
            StackEvent::Boot => self.on_boot(stack),
            StackEvent::ConnectionOpened { connection } => {
                self.on_connection_opened(stack, connection)
            }
            StackEvent::Bonded { connection } => {
                self.on_bonded(connection);
                Ok(())
            }
            StackEvent::BondingFailed { connection, reason } => {
                self.on_bonding_failed(stack, connection, reason);
                Ok(())
            }
            StackEvent::CharacteristicStatus {
                connection,
                characteristic,
                status,
                client_config,
            } => {
                self.on_characteristic_status(connection, characteristic, status, client_config);
                Ok(())
            }
            StackEvent::ExternalSignal(signal) => self.on_signal(stack, button, signal),
            StackEvent::ConnectionClosed { connection, reason } => {
                self.on_connection_closed(stack, connection, reason)
            }
            StackEvent::Unknown(_id) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("ignoring event {=u32:#x}", _id);
                Ok(())
            }
        }
    }

    fn on_boot<S: BleStack + ?Sized>(&mut self, stack: &mut S) -> Result<(), Error> {
        // A reset stack has no links left.
        self.connection = None;

        stack
            .configure_security(IoCapability::NoInputNoOutput, true)
            .during(Command::ConfigureSecurity)?;

        let set = match self.advertising {
            Some(set) => set,
            None => {
                let set = stack
                    .create_advertising_set()
                    .during(Command::CreateAdvertisingSet)?;
                self.advertising = Some(set);
                set
            }
        };

        stack
            .set_advertising_timing(set, AdvertisingTiming::fixed())
            .during(Command::SetAdvertisingTiming)?;

        self.start_advertising(stack)?;

        #[cfg(feature = "defmt")]
        defmt::info!("start");
        Ok(())
    }

    fn start_advertising<S: BleStack + ?Sized>(&mut self, stack: &mut S) -> Result<(), Error> {
        let set = self.advertising.ok_or(Error::NoAdvertisingSet)?;
        stack
            .start_advertising(set, AdvertisingMode::GENERAL_CONNECTABLE)
            .during(Command::StartAdvertising)?;
        self.advertising_running = true;
        Ok(())
    }

    fn on_connection_opened<S: BleStack + ?Sized>(
        &mut self,
        stack: &mut S,
        connection: ConnectionHandle,
    ) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        if let Some(old) = self.connection {
            defmt::warn!("connection {} replaces {}", connection, old.handle);
        }

        #[cfg(feature = "defmt")]
        defmt::info!("connection {} opened", connection);

        self.advertising_running = false;
        self.connection = Some(Connection::opened(connection));

        stack
            .increase_security(connection)
            .during(Command::IncreaseSecurity)
    }

    fn on_bonded(&mut self, connection: ConnectionHandle) {
        match self.connection.as_mut() {
            Some(c) if c.handle == connection => {
                c.bonding = BondingStatus::Bonded;
                #[cfg(feature = "defmt")]
                defmt::info!("successful bonding {}", connection);
            }
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bonded event for unknown connection {}", connection);
            }
        }
    }

    fn on_bonding_failed<S: BleStack + ?Sized>(
        &mut self,
        stack: &mut S,
        connection: ConnectionHandle,
        _reason: u16,
    ) {
        #[cfg(feature = "defmt")]
        defmt::warn!("bonding failed, reason {=u16:#04x}", _reason);

        if let Some(c) = self.connection.as_mut().filter(|c| c.handle == connection) {
            c.bonding = BondingStatus::Unbonded;
            c.subscription = Subscription::Unsubscribed;
        }

        // The stored bond no longer matches the peer. Drop it and make the
        // peer reconnect; it is expected to retry at least once.
        if let Err(_e) = stack.delete_bondings() {
            #[cfg(feature = "defmt")]
            defmt::warn!("delete bondings failed: {}", _e);
        }
        if let Err(_e) = stack.close_connection(connection) {
            #[cfg(feature = "defmt")]
            defmt::warn!("close connection {} failed: {}", connection, _e);
        }
    }

    fn on_characteristic_status(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        status: StatusFlag,
        client_config: ClientConfig,
    ) {
        if characteristic != self.report || status != StatusFlag::ClientConfig {
            return;
        }

        let Some(c) = self.connection.as_mut().filter(|c| c.handle == connection) else {
            #[cfg(feature = "defmt")]
            defmt::warn!("config write from unknown connection {}", connection);
            return;
        };

        if client_config.is_disabled() {
            c.subscription = Subscription::Unsubscribed;
            #[cfg(feature = "defmt")]
            defmt::info!("notification disabled {}", connection);
        } else {
            c.subscription = Subscription::Subscribed;
            #[cfg(feature = "defmt")]
            defmt::info!("notification enabled {}", connection);
        }
    }

    fn on_signal<S: BleStack + ?Sized>(
        &mut self,
        stack: &mut S,
        button: &ButtonSignal,
        signal: u32,
    ) -> Result<(), Error> {
        if signal & button.signal() == 0 {
            return Ok(());
        }

        let state = button.take();
        dispatcher::dispatch(stack, self.report, state, self.notification_target())?;
        Ok(())
    }

    fn on_connection_closed<S: BleStack + ?Sized>(
        &mut self,
        stack: &mut S,
        connection: ConnectionHandle,
        _reason: u16,
    ) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::info!("connection {} closed, reason {=u16:#x}", connection, _reason);

        if self.connection.map(|c| c.handle) == Some(connection) {
            self.connection = None;
        }

        // Without this the device is unreachable until reset.
        self.start_advertising(stack)?;

        #[cfg(feature = "defmt")]
        defmt::info!("advertising re-armed");
        Ok(())
    }
}

/// Handle every event already queued. Returns how many were handled.
///
/// Stops at the first fatal error and returns it; used by host tests and by
/// callers that poll instead of await.
pub fn process_pending<M: RawMutex, S: BleStack + ?Sized, const N: usize>(
    state: &mut PeripheralState,
    stack: &mut S,
    button: &ButtonSignal,
    events: &Receiver<'_, M, StackEvent, N>,
) -> Result<usize, Error> {
    let mut handled = 0;
    while let Ok(event) = events.try_receive() {
        state.handle(stack, button, event)?;
        handled += 1;
    }
    Ok(handled)
}

/// The event loop. Never returns; a fatal error halts the device.
pub async fn run<M: RawMutex, S: BleStack + ?Sized, const N: usize>(
    state: &mut PeripheralState,
    stack: &mut S,
    button: &ButtonSignal,
    events: &Receiver<'_, M, StackEvent, N>,
) -> ! {
    loop {
        let event = events.receive().await;
        if let Err(e) = state.handle(stack, button, event) {
            fatal(e);
        }
    }
}

fn fatal(e: Error) -> ! {
    #[cfg(feature = "defmt")]
    defmt::panic!("fatal: {}", e);
    #[cfg(not(feature = "defmt"))]
    panic!("fatal: {}", e);
}
