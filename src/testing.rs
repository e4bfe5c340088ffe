//! Recording `BleStack` for host tests.

use std::vec::Vec;

use crate::error::{Command, StackError};
use crate::event::{CharacteristicId, ConnectionHandle};
use crate::stack::{AdvertisingMode, AdvertisingSet, AdvertisingTiming, BleStack, IoCapability};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ConfigureSecurity(IoCapability, bool),
    CreateAdvertisingSet,
    SetAdvertisingTiming(AdvertisingSet, AdvertisingTiming),
    StartAdvertising(AdvertisingSet, AdvertisingMode),
    IncreaseSecurity(ConnectionHandle),
    DeleteBondings,
    CloseConnection(ConnectionHandle),
    SendNotification(ConnectionHandle, CharacteristicId, Vec<u8>),
}

#[derive(Default)]
pub struct MockStack {
    pub calls: Vec<Call>,
    failures: Vec<(Command, StackError)>,
    sets_created: u8,
}

impl MockStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `command` fail with `cause`.
    pub fn fail_on(&mut self, command: Command, cause: StackError) {
        self.failures.push((command, cause));
    }

    pub fn notifications(&self) -> Vec<(ConnectionHandle, CharacteristicId, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SendNotification(conn, chr, payload) => Some((*conn, *chr, payload.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(*c)).count()
    }

    fn record(&mut self, command: Command, call: Call) -> Result<(), StackError> {
        self.calls.push(call);
        match self.failures.iter().find(|(c, _)| *c == command) {
            Some((_, cause)) => Err(*cause),
            None => Ok(()),
        }
    }
}

impl BleStack for MockStack {
    fn configure_security(&mut self, io: IoCapability, bondable: bool) -> Result<(), StackError> {
        self.record(Command::ConfigureSecurity, Call::ConfigureSecurity(io, bondable))
    }

    fn create_advertising_set(&mut self) -> Result<AdvertisingSet, StackError> {
        self.record(Command::CreateAdvertisingSet, Call::CreateAdvertisingSet)?;
        let set = AdvertisingSet(self.sets_created);
        self.sets_created += 1;
        Ok(set)
    }

    fn set_advertising_timing(
        &mut self,
        set: AdvertisingSet,
        timing: AdvertisingTiming,
    ) -> Result<(), StackError> {
        self.record(
            Command::SetAdvertisingTiming,
            Call::SetAdvertisingTiming(set, timing),
        )
    }

    fn start_advertising(
        &mut self,
        set: AdvertisingSet,
        mode: AdvertisingMode,
    ) -> Result<(), StackError> {
        self.record(Command::StartAdvertising, Call::StartAdvertising(set, mode))
    }

    fn increase_security(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        self.record(Command::IncreaseSecurity, Call::IncreaseSecurity(connection))
    }

    fn delete_bondings(&mut self) -> Result<(), StackError> {
        self.record(Command::DeleteBondings, Call::DeleteBondings)
    }

    fn close_connection(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        self.record(Command::CloseConnection, Call::CloseConnection(connection))
    }

    fn send_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), StackError> {
        self.record(
            Command::SendNotification,
            Call::SendNotification(connection, characteristic, payload.to_vec()),
        )
    }
}
