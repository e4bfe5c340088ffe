//! GATT server exposing the button report.
//!
//! One custom service with one characteristic (read, notify). The client
//! enables notifications through the characteristic's CCCD; each CCCD write
//! becomes a `CharacteristicStatus` event.

use button_peripheral::{
    CharacteristicId, ClientConfig, ConnectionHandle, StackError, StackEvent, StatusFlag,
};
use defmt::warn;
use nrf_softdevice::ble::gatt_server::{self, NotifyValueError};
use nrf_softdevice::ble::{Connection, DisconnectedError};

use super::raw_error;
use crate::EVENTS;

/// Service UUID `8e3f0001-6b1d-4c3a-9f2e-5a7b1c2d3e4f`, little-endian for
/// advertising data.
pub const SERVICE_UUID_LE: [u8; 16] = [
    0x4f, 0x3e, 0x2d, 0x1c, 0x7b, 0x5a, 0x2e, 0x9f, 0x3a, 0x4c, 0x1d, 0x6b, 0x01, 0x00, 0x3f, 0x8e,
];

/// Stable id of the report characteristic, as seen by the state machine.
pub const REPORT: CharacteristicId = CharacteristicId(1);

#[nrf_softdevice::gatt_service(uuid = "8e3f0001-6b1d-4c3a-9f2e-5a7b1c2d3e4f")]
pub struct ButtonService {
    /// Button report - 0x00 released, 0x01 pressed.
    #[characteristic(uuid = "8e3f0002-6b1d-4c3a-9f2e-5a7b1c2d3e4f", read, notify)]
    pub report: u8,
}

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub button: ButtonService,
}

/// Serve GATT on `conn` until it disconnects.
pub async fn run(conn: &Connection, server: &Server, handle: ConnectionHandle) -> DisconnectedError {
    // No stored CCCD state: start every link unsubscribed.
    if let Err(e) = gatt_server::set_sys_attrs(conn, None) {
        warn!("set_sys_attrs failed: {:?}", e);
    }

    gatt_server::run(conn, server, |e| match e {
        ServerEvent::Button(ButtonServiceEvent::ReportCccdWrite { notifications }) => {
            let client_config = if notifications {
                ClientConfig::NOTIFY
            } else {
                ClientConfig::DISABLED
            };
            let event = StackEvent::CharacteristicStatus {
                connection: handle,
                characteristic: REPORT,
                status: StatusFlag::ClientConfig,
                client_config,
            };
            if EVENTS.try_send(event).is_err() {
                warn!("event queue full - CCCD write dropped");
            }
        }
    })
    .await
}

/// Notify `payload` on `characteristic`.
pub fn notify(
    server: &Server,
    conn: &Connection,
    characteristic: CharacteristicId,
    payload: &[u8],
) -> Result<(), StackError> {
    if characteristic != REPORT {
        return Err(StackError::InvalidState);
    }
    let value = payload.first().copied().ok_or(StackError::InvalidState)?;

    server
        .button
        .report_notify(conn, &value)
        .map_err(|e| match e {
            NotifyValueError::Disconnected => StackError::InvalidConnection,
            NotifyValueError::Raw(raw) => raw_error(raw),
        })
}
