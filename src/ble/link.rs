//! Advertiser and connection owner.
//!
//! `start_advertising` only posts a request here; the link task does the
//! actual (async) advertising and reports the outcome as events:
//!
//! ```text
//! request -> advertise -> ConnectionOpened -> serve GATT -> ConnectionClosed
//!                                   \-> security watchdog -> BondingFailed
//! ```

use core::cell::RefCell;

use button_peripheral::config::{BONDING_TIMEOUT_REASON, DEVICE_NAME, SECURITY_TIMEOUT_SECS};
use button_peripheral::stack::AdvertisingTiming;
use button_peripheral::{ConnectionHandle, StackEvent};
use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Timer};
use nrf_softdevice::ble::{peripheral, Connection, SecurityMode};
use nrf_softdevice::Softdevice;

use super::bonder::Bonder;
use super::gatt::{self, Server, SERVICE_UUID_LE};
use crate::EVENTS;

/// The SoftDevice does not hand us the HCI disconnect reason.
const UNKNOWN_REASON: u16 = 0;

/// Pending "start advertising" request.
static ADVERTISE: Signal<CriticalSectionRawMutex, AdvertisingTiming> = Signal::new();

/// The one open connection, if any.
static CURRENT: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

const NAME_LEN: usize = DEVICE_NAME.len();

/// Flags + complete local name.
static ADV_DATA: [u8; 5 + NAME_LEN] = adv_data();

/// Complete list of 128-bit service UUIDs.
static SCAN_DATA: [u8; 18] = scan_data();

const fn adv_data() -> [u8; 5 + NAME_LEN] {
    let mut buf = [0u8; 5 + NAME_LEN];
    buf[0] = 0x02;
    buf[1] = 0x01; // flags
    buf[2] = 0x06; // LE general discoverable, BR/EDR not supported
    buf[3] = (NAME_LEN + 1) as u8;
    buf[4] = 0x09; // complete local name
    let name = DEVICE_NAME.as_bytes();
    let mut i = 0;
    while i < NAME_LEN {
        buf[5 + i] = name[i];
        i += 1;
    }
    buf
}

const fn scan_data() -> [u8; 18] {
    let mut buf = [0u8; 18];
    buf[0] = 0x11;
    buf[1] = 0x07;
    let mut i = 0;
    while i < 16 {
        buf[2 + i] = SERVICE_UUID_LE[i];
        i += 1;
    }
    buf
}

/// Ask the link task to advertise. Returns immediately.
pub fn request_advertising(timing: AdvertisingTiming) {
    ADVERTISE.signal(timing);
}

/// Run `f` on the open connection if its handle is `handle`.
pub fn with_connection<R>(handle: ConnectionHandle, f: impl FnOnce(&Connection) -> R) -> Option<R> {
    CURRENT.lock(|current| {
        current
            .borrow()
            .as_ref()
            .filter(|conn| conn.handle() == Some(handle.0))
            .map(f)
    })
}

#[embassy_executor::task]
pub async fn link_task(sd: &'static Softdevice, server: &'static Server, bonder: &'static Bonder) -> ! {
    loop {
        let timing = ADVERTISE.wait().await;

        let config = peripheral::Config {
            interval: timing.min_interval,
            timeout: (timing.duration != 0).then_some(timing.duration),
            max_events: (timing.max_events != 0).then_some(timing.max_events),
            ..Default::default()
        };
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };

        let conn = match peripheral::advertise_pairable(sd, adv, &config, bonder).await {
            Ok(conn) => conn,
            Err(e) => defmt::panic!("advertising failed: {:?}", e),
        };
        let Some(raw_handle) = conn.handle() else {
            warn!("connection dropped before it could be reported");
            ADVERTISE.signal(timing);
            continue;
        };
        let handle = ConnectionHandle(raw_handle);

        CURRENT.lock(|current| *current.borrow_mut() = Some(conn.clone()));
        EVENTS
            .send(StackEvent::ConnectionOpened { connection: handle })
            .await;

        match select(gatt::run(&conn, server, handle), security_watchdog(&conn, handle)).await {
            Either::First(_) => info!("connection {} ended", raw_handle),
            Either::Second(never) => match never {},
        }

        CURRENT.lock(|current| *current.borrow_mut() = None);
        EVENTS
            .send(StackEvent::ConnectionClosed {
                connection: handle,
                reason: UNKNOWN_REASON,
            })
            .await;
    }
}

/// Report a bonding failure if the link is not encrypted in time.
async fn security_watchdog(conn: &Connection, handle: ConnectionHandle) -> ! {
    let secured = with_timeout(
        Duration::from_secs(SECURITY_TIMEOUT_SECS),
        wait_for_secure_link(conn),
    )
    .await;

    if secured.is_err() {
        EVENTS
            .send(StackEvent::BondingFailed {
                connection: handle,
                reason: BONDING_TIMEOUT_REASON,
            })
            .await;
    }

    loop {
        core::future::pending::<()>().await;
    }
}

async fn wait_for_secure_link(conn: &Connection) {
    loop {
        match conn.security_mode() {
            SecurityMode::NoAccess | SecurityMode::Open => {
                Timer::after(Duration::from_millis(200)).await
            }
            _ => return,
        }
    }
}
