//! `BleStack` on top of the SoftDevice.
//!
//! The S140 has exactly one advertising set and this firmware one peripheral
//! link, so the set handle is always 0 and connection commands resolve the
//! handle against the link task's current connection.

use button_peripheral::stack::{
    AdvertisingMode, AdvertisingSet, AdvertisingTiming, BleStack, IoCapability,
};
use button_peripheral::{CharacteristicId, ConnectionHandle, StackError};
use nrf_softdevice::ble::security::AuthenticateError;

use super::bonder::Bonder;
use super::gatt::{self, Server};
use super::{link, raw_error};

const THE_SET: AdvertisingSet = AdvertisingSet(0);

pub struct SoftdeviceStack {
    server: &'static Server,
    bonder: &'static Bonder,
    created: bool,
    timing: AdvertisingTiming,
}

impl SoftdeviceStack {
    pub fn new(server: &'static Server, bonder: &'static Bonder) -> Self {
        Self {
            server,
            bonder,
            created: false,
            timing: AdvertisingTiming::fixed(),
        }
    }

    fn check_set(&self, set: AdvertisingSet) -> Result<(), StackError> {
        if self.created && set == THE_SET {
            Ok(())
        } else {
            Err(StackError::InvalidState)
        }
    }
}

impl BleStack for SoftdeviceStack {
    fn configure_security(&mut self, io: IoCapability, bondable: bool) -> Result<(), StackError> {
        self.bonder.configure(io, bondable);
        Ok(())
    }

    fn create_advertising_set(&mut self) -> Result<AdvertisingSet, StackError> {
        if self.created {
            return Err(StackError::NoResources);
        }
        self.created = true;
        Ok(THE_SET)
    }

    fn set_advertising_timing(
        &mut self,
        set: AdvertisingSet,
        timing: AdvertisingTiming,
    ) -> Result<(), StackError> {
        self.check_set(set)?;
        // The SoftDevice takes a single interval.
        if timing.min_interval != timing.max_interval {
            return Err(StackError::InvalidState);
        }
        self.timing = timing;
        Ok(())
    }

    fn start_advertising(
        &mut self,
        set: AdvertisingSet,
        mode: AdvertisingMode,
    ) -> Result<(), StackError> {
        self.check_set(set)?;
        if mode != AdvertisingMode::GENERAL_CONNECTABLE {
            return Err(StackError::InvalidState);
        }
        link::request_advertising(self.timing);
        Ok(())
    }

    fn increase_security(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        link::with_connection(connection, |conn| conn.request_security())
            .ok_or(StackError::InvalidConnection)?
            .map_err(|e| match e {
                AuthenticateError::Disconnected => StackError::InvalidConnection,
                AuthenticateError::Raw(raw) => raw_error(raw),
            })
    }

    fn delete_bondings(&mut self) -> Result<(), StackError> {
        self.bonder.clear();
        Ok(())
    }

    fn close_connection(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        link::with_connection(connection, |conn| conn.disconnect())
            .ok_or(StackError::InvalidConnection)?
            .map_err(|_| StackError::InvalidConnection)
    }

    fn send_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), StackError> {
        let server = self.server;
        link::with_connection(connection, |conn| {
            gatt::notify(server, conn, characteristic, payload)
        })
        .ok_or(StackError::InvalidConnection)?
    }
}
