//! Button peripheral firmware for nRF52840 + SoftDevice S140.
//!
//! Task layout:
//!
//! - `softdevice_task` - runs the SoftDevice event pump.
//! - `link_task`       - advertises on request, owns the connection, posts
//!                       lifecycle events.
//! - `button_task`     - debounces the button and feeds the Signal Source.
//! - `event_loop_task` - the peripheral state machine; sole consumer of
//!                       `EVENTS`, sole issuer of stack commands.

#![no_std]
#![no_main]

mod ble;
mod button;

use button_peripheral::config::{BUTTON_SIGNAL, DEVICE_NAME, EVENT_QUEUE_DEPTH};
use button_peripheral::peripheral::{self, PeripheralState};
use button_peripheral::{ButtonSignal, StackEvent};
use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::Pin;
use embassy_nrf::interrupt::Priority;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::ble::bonder::Bonder;
use crate::ble::gatt::{self, Server};
use crate::ble::link::link_task;
use crate::ble::stack::SoftdeviceStack;
use crate::button::button_task;

/// The single ordered event stream: stack events and button wakes.
pub static EVENTS: Channel<CriticalSectionRawMutex, StackEvent, EVENT_QUEUE_DEPTH> =
    Channel::new();

/// Button level. Written only by `button_task`.
pub static BUTTON: ButtonSignal = ButtonSignal::new(BUTTON_SIGNAL);

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn event_loop_task(mut stack: SoftdeviceStack) -> ! {
    let mut state = PeripheralState::new(gatt::REPORT);
    peripheral::run(&mut state, &mut stack, &BUTTON, &EVENTS.receiver()).await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { core::mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("{} starting", DEVICE_NAME);

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());

    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));

    static BONDER: StaticCell<Bonder> = StaticCell::new();
    let bonder: &'static Bonder = BONDER.init(Bonder::new());

    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(link_task(sd, server, bonder)));

    // Button 1 on the nRF52840-DK.
    unwrap!(spawner.spawn(button_task(p.P0_11.degrade())));

    // The SoftDevice has no boot event of its own; the radio is ready once
    // it is enabled and the GATT table registered.
    EVENTS.send(StackEvent::Boot).await;
    unwrap!(spawner.spawn(event_loop_task(SoftdeviceStack::new(server, bonder))));
}
