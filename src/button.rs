//! GPIO button input with async debouncing.
//!
//! One active-low push button with internal pull-up. Every debounced level
//! change is handed to the Signal Source, which records the level and posts
//! the wake token. The task never calls into the state machine.

use button_peripheral::config::BUTTON_DEBOUNCE_MS;
use defmt::debug;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_time::{Duration, Timer};

use crate::{BUTTON, EVENTS};

/// Watch the button forever.
///
/// Waits for any edge, debounces, and reports the level if it actually
/// changed since the last report.
#[embassy_executor::task]
pub async fn button_task(pin: AnyPin) -> ! {
    let mut btn = Input::new(pin, Pull::Up);
    let mut pressed = btn.is_low();

    loop {
        btn.wait_for_any_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        let now = btn.is_low();
        if now == pressed {
            debug!("bounce ignored");
            continue;
        }
        pressed = now;
        BUTTON.on_change(pressed, &EVENTS);
    }
}
