//! Notification Dispatcher - sends the button level to the subscribed client.
//!
//! Frame layout (1 byte):
//! ```text
//! Byte 0: 0x00 = released, 0x01 = pressed
//! ```
//!
//! No retry and no queue of missed states: whatever the level is at dispatch
//! time is what goes out.

use crate::error::{Command, CommandResultExt, Error};
use crate::event::{CharacteristicId, ConnectionHandle};
use crate::signal::ButtonState;
use crate::stack::BleStack;

/// Report frame size in bytes.
pub const REPORT_FRAME_SIZE: usize = 1;

/// One notification payload, built fresh per send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportFrame([u8; REPORT_FRAME_SIZE]);

impl ReportFrame {
    pub fn new(state: ButtonState) -> Self {
        Self([state.as_byte()])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Send `state` to `target` on `characteristic`.
///
/// With no subscribed connection this is a no-op and returns `Ok(None)`.
/// A failed send is returned as [`Error::Command`]; the caller treats it as
/// fatal.
pub fn dispatch<S: BleStack + ?Sized>(
    stack: &mut S,
    characteristic: CharacteristicId,
    state: ButtonState,
    target: Option<ConnectionHandle>,
) -> Result<Option<ReportFrame>, Error> {
    let Some(connection) = target else {
        return Ok(None);
    };

    let frame = ReportFrame::new(state);
    stack
        .send_notification(connection, characteristic, frame.as_bytes())
        .during(Command::SendNotification)?;

    #[cfg(feature = "defmt")]
    defmt::info!("sent {} to {}", frame, connection);

    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;
    use crate::testing::{Call, MockStack};

    const REPORT: CharacteristicId = CharacteristicId(21);

    #[test]
    fn frame_mirrors_state() {
        assert_eq!(ReportFrame::new(ButtonState::Pressed).as_bytes(), &[0x01]);
        assert_eq!(ReportFrame::new(ButtonState::Released).as_bytes(), &[0x00]);
    }

    #[test]
    fn no_target_is_a_noop() {
        let mut stack = MockStack::new();
        let sent = dispatch(&mut stack, REPORT, ButtonState::Pressed, None).unwrap();
        assert_eq!(sent, None);
        assert!(stack.calls.is_empty());
    }

    #[test]
    fn sends_one_frame_to_target() {
        let mut stack = MockStack::new();
        let target = Some(ConnectionHandle(1));

        let sent = dispatch(&mut stack, REPORT, ButtonState::Pressed, target).unwrap();

        assert_eq!(sent, Some(ReportFrame::new(ButtonState::Pressed)));
        assert_eq!(
            stack.calls,
            vec![Call::SendNotification(ConnectionHandle(1), REPORT, vec![0x01])]
        );
    }

    #[test]
    fn send_failure_is_reported() {
        let mut stack = MockStack::new();
        stack.fail_on(Command::SendNotification, StackError::NoResources);

        let err = dispatch(
            &mut stack,
            REPORT,
            ButtonState::Released,
            Some(ConnectionHandle(3)),
        )
        .unwrap_err();

        assert_eq!(
            err,
            Error::Command {
                command: Command::SendNotification,
                cause: StackError::NoResources,
            }
        );
    }
}
