//! Bluetooth Low Energy glue for the Nordic SoftDevice S140.
//!
//! The SoftDevice is driven in **Peripheral** role:
//!
//! 1. **GATT** - the button service with its 1-byte report characteristic.
//! 2. **Bonder** - security handler; answers pairing requests and keeps the
//!    bond table in RAM.
//! 3. **Link** - advertises on request, owns the single connection, and turns
//!    SoftDevice activity into `StackEvent`s on the event channel.
//! 4. **Stack** - `SoftdeviceStack`, the `BleStack` the state machine commands.
//!
//! The state machine itself lives in the library crate and never sees a
//! SoftDevice type.

pub mod bonder;
pub mod gatt;
pub mod link;
pub mod stack;

use button_peripheral::StackError;
use nrf_softdevice::RawError;

/// Map a SoftDevice status code onto a stack error.
pub fn raw_error(e: RawError) -> StackError {
    StackError::Raw(e as u32 as u16)
}
