//! Host-testable core of the button peripheral.
//!
//! The firmware advertises, accepts one connection, bonds, and notifies a
//! subscribed client with a 1-byte button report whenever the button changes.
//! Everything here is independent of the radio stack: the stack is reached
//! through [`stack::BleStack`] and talks back through [`event::StackEvent`]s
//! on one ordered channel.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and supplies the nRF SoftDevice implementation of `BleStack`.

#![cfg_attr(not(test), no_std)]

// ═══════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod peripheral;
pub mod signal;
pub mod stack;

#[cfg(test)]
mod testing;

pub use dispatcher::{dispatch, ReportFrame};
pub use error::{Command, Error, StackError};
pub use event::{CharacteristicId, ClientConfig, ConnectionHandle, StackEvent, StatusFlag};
pub use peripheral::{LinkState, PeripheralState};
pub use signal::{ButtonSignal, ButtonState, WakeSink};
pub use stack::BleStack;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - crate-level wiring
// ═══════════════════════════════════════════════════════════════════════════
