//! Application-wide constants and compile-time configuration.
//!
//! Advertising cadence, signal ids, and queue sizes live here so they can be
//! tuned in one place.

// Advertising

/// Advertising interval (ms). Min and max are equal, so the cadence is fixed.
pub const ADV_INTERVAL_MS: u32 = 100;

/// Advertising interval in radio ticks (0.625 ms units). 160 = 100 ms.
pub const ADV_INTERVAL_TICKS: u32 = ADV_INTERVAL_MS * 8 / 5;

/// Advertising duration (10 ms units). 0 = advertise until stopped.
pub const ADV_DURATION: u16 = 0;

/// Maximum number of advertising events. 0 = unlimited.
pub const ADV_MAX_EVENTS: u8 = 0;

// Event stream

/// Application signal id raised by the button (bit mask, like the stack's
/// external signals).
pub const BUTTON_SIGNAL: u32 = 1;

/// Depth of the single channel carrying stack events and wake tokens.
pub const EVENT_QUEUE_DEPTH: usize = 8;

// Firmware glue (used by the embedded binary)

/// GAP device name.
pub const DEVICE_NAME: &str = "BtnReport";

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 20;

/// How long the peer gets to encrypt the link after security was requested
/// before the attempt counts as a bonding failure (seconds).
pub const SECURITY_TIMEOUT_SECS: u64 = 5;

/// Bond records kept in RAM. Not persisted across resets.
pub const MAX_BONDED_PEERS: usize = 4;

/// Bonding failure reason reported when the security watchdog expires
/// (SMP "unspecified reason").
pub const BONDING_TIMEOUT_REASON: u16 = 0x08;
