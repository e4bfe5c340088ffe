//! Signal Source - button level plus wake token.
//!
//! The button driver calls [`ButtonSignal::on_change`] on every edge. That is
//! the only writer of the level. The call stores the level and posts at most
//! one wake token onto the event channel; it never touches the state machine
//! or the stack directly.
//!
//! The level is not a queue. A press, release, press burst before the wake is
//! consumed leaves "pressed", and the next dispatch sends only that.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Sender};

use crate::event::StackEvent;

/// Latest physical state of the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    Released,
    Pressed,
}

impl ButtonState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }

    pub fn is_pressed(self) -> bool {
        self == ButtonState::Pressed
    }

    /// Wire value: 1 = pressed, 0 = released.
    pub fn as_byte(self) -> u8 {
        match self {
            ButtonState::Released => 0,
            ButtonState::Pressed => 1,
        }
    }
}

/// Somewhere a wake token can be posted without blocking.
pub trait WakeSink {
    /// Post `ExternalSignal(signal)`. Returns `false` if it could not be queued.
    fn wake(&self, signal: u32) -> bool;
}

impl<M: RawMutex, const N: usize> WakeSink for Channel<M, StackEvent, N> {
    fn wake(&self, signal: u32) -> bool {
        self.try_send(StackEvent::ExternalSignal(signal)).is_ok()
    }
}

impl<'ch, M: RawMutex, const N: usize> WakeSink for Sender<'ch, M, StackEvent, N> {
    fn wake(&self, signal: u32) -> bool {
        self.try_send(StackEvent::ExternalSignal(signal)).is_ok()
    }
}

/// Button level shared between the driver context and the event loop.
pub struct ButtonSignal {
    pressed: AtomicBool,
    wake_pending: AtomicBool,
    signal: u32,
}

impl ButtonSignal {
    /// `signal` is the id carried by the wake token. It must be non-zero:
    /// the event loop matches on its bits, and a zero id would never be
    /// consumed, leaving every later edge swallowed.
    pub const fn new(signal: u32) -> Self {
        debug_assert!(signal != 0, "signal id must be non-zero");
        Self {
            pressed: AtomicBool::new(false),
            wake_pending: AtomicBool::new(false),
            signal,
        }
    }

    /// Signal id this source raises.
    pub fn signal(&self) -> u32 {
        self.signal
    }

    /// Edge callback from the button driver.
    pub fn on_change<W: WakeSink + ?Sized>(&self, pressed: bool, sink: &W) {
        self.pressed.store(pressed, Ordering::SeqCst);

        #[cfg(feature = "defmt")]
        defmt::info!("button {}", ButtonState::from_pressed(pressed));

        // A token already in flight will read this level when it is consumed.
        if self.wake_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        if !sink.wake(self.signal) {
            self.wake_pending.store(false, Ordering::SeqCst);
            #[cfg(feature = "defmt")]
            defmt::warn!("event queue full - wake dropped");
        }
    }

    /// Current level without consuming a wake.
    pub fn state(&self) -> ButtonState {
        ButtonState::from_pressed(self.pressed.load(Ordering::SeqCst))
    }

    /// Consume the pending wake and read the level.
    ///
    /// The flag is cleared before the read, so an edge landing after this
    /// call always posts a fresh token.
    pub fn take(&self) -> ButtonState {
        self.wake_pending.store(false, Ordering::SeqCst);
        self.state()
    }

    /// True while a wake token is queued and not yet consumed.
    pub fn wake_pending(&self) -> bool {
        self.wake_pending.load(Ordering::SeqCst)
    }
}
