//! Integration tests: full event sequences through the public API.

use button_peripheral::config::BUTTON_SIGNAL;
use button_peripheral::peripheral::{process_pending, LinkState, PeripheralState};
use button_peripheral::stack::{AdvertisingMode, AdvertisingSet, AdvertisingTiming, BleStack, IoCapability};
use button_peripheral::{
    ButtonSignal, CharacteristicId, ClientConfig, ConnectionHandle, StackError, StackEvent,
    StatusFlag,
};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;

const REPORT: CharacteristicId = CharacteristicId(21);
const C1: ConnectionHandle = ConnectionHandle(1);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Security,
    CreateSet,
    Timing(AdvertisingTiming),
    Start(AdvertisingSet, AdvertisingMode),
    IncreaseSecurity(ConnectionHandle),
    DeleteBondings,
    Close(ConnectionHandle),
    Notify(ConnectionHandle, CharacteristicId, Vec<u8>),
}

#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
}

impl Recorder {
    fn notifications(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Notify(..)))
            .collect()
    }

    fn starts(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Start(..)))
            .collect()
    }
}

impl BleStack for Recorder {
    fn configure_security(&mut self, io: IoCapability, bondable: bool) -> Result<(), StackError> {
        assert_eq!(io, IoCapability::NoInputNoOutput);
        assert!(bondable);
        self.calls.push(Call::Security);
        Ok(())
    }

    fn create_advertising_set(&mut self) -> Result<AdvertisingSet, StackError> {
        self.calls.push(Call::CreateSet);
        Ok(AdvertisingSet(0))
    }

    fn set_advertising_timing(
        &mut self,
        _set: AdvertisingSet,
        timing: AdvertisingTiming,
    ) -> Result<(), StackError> {
        self.calls.push(Call::Timing(timing));
        Ok(())
    }

    fn start_advertising(
        &mut self,
        set: AdvertisingSet,
        mode: AdvertisingMode,
    ) -> Result<(), StackError> {
        self.calls.push(Call::Start(set, mode));
        Ok(())
    }

    fn increase_security(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        self.calls.push(Call::IncreaseSecurity(connection));
        Ok(())
    }

    fn delete_bondings(&mut self) -> Result<(), StackError> {
        self.calls.push(Call::DeleteBondings);
        Ok(())
    }

    fn close_connection(&mut self, connection: ConnectionHandle) -> Result<(), StackError> {
        self.calls.push(Call::Close(connection));
        Ok(())
    }

    fn send_notification(
        &mut self,
        connection: ConnectionHandle,
        characteristic: CharacteristicId,
        payload: &[u8],
    ) -> Result<(), StackError> {
        self.calls
            .push(Call::Notify(connection, characteristic, payload.to_vec()));
        Ok(())
    }
}

struct Harness {
    state: PeripheralState,
    stack: Recorder,
    button: ButtonSignal,
    events: Channel<NoopRawMutex, StackEvent, 8>,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: PeripheralState::new(REPORT),
            stack: Recorder::default(),
            button: ButtonSignal::new(BUTTON_SIGNAL),
            events: Channel::new(),
        }
    }

    fn post(&self, event: StackEvent) {
        self.events.try_send(event).expect("event queue full");
    }

    fn edge(&self, pressed: bool) {
        self.button.on_change(pressed, &self.events);
    }

    fn pump(&mut self) {
        process_pending(
            &mut self.state,
            &mut self.stack,
            &self.button,
            &self.events.receiver(),
        )
        .expect("fatal command failure");
    }
}

fn subscribed(connection: ConnectionHandle) -> StackEvent {
    StackEvent::CharacteristicStatus {
        connection,
        characteristic: REPORT,
        status: StatusFlag::ClientConfig,
        client_config: ClientConfig::NOTIFY,
    }
}

#[test]
fn bonded_subscriber_gets_pressed_report() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(StackEvent::Bonded { connection: C1 });
    h.post(subscribed(C1));
    h.pump();
    assert_eq!(h.state.link_state(), LinkState::BondedConnected);

    h.edge(true);
    h.pump();

    assert_eq!(
        h.stack.notifications(),
        vec![&Call::Notify(C1, REPORT, vec![0x01])]
    );
}

#[test]
fn bonding_failure_cleans_up_and_never_notifies() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(StackEvent::BondingFailed {
        connection: C1,
        reason: 0x03,
    });
    h.pump();

    let tail = &h.stack.calls[h.stack.calls.len() - 2..];
    assert_eq!(tail, &[Call::DeleteBondings, Call::Close(C1)]);

    h.edge(true);
    h.pump();
    assert!(h.stack.notifications().is_empty());
}

#[test]
fn press_release_burst_sends_released() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(StackEvent::Bonded { connection: C1 });
    h.post(subscribed(C1));
    h.pump();

    h.edge(true);
    h.edge(false);
    h.pump();

    let sent = h.stack.notifications();
    assert!(!sent.is_empty());
    for call in sent {
        assert_eq!(call, &Call::Notify(C1, REPORT, vec![0x00]));
    }
}

#[test]
fn last_edge_of_any_burst_wins() {
    let bursts: [&[bool]; 4] = [
        &[true],
        &[true, false, true],
        &[false, true, false],
        &[true, true, false, false, true],
    ];

    for burst in bursts {
        let mut h = Harness::new();
        h.post(StackEvent::Boot);
        h.post(StackEvent::ConnectionOpened { connection: C1 });
        h.post(subscribed(C1));
        h.pump();

        for &pressed in burst {
            h.edge(pressed);
        }
        h.pump();

        let expected = u8::from(*burst.last().unwrap());
        assert_eq!(
            h.stack.notifications().last(),
            Some(&&Call::Notify(C1, REPORT, vec![expected]))
        );
    }
}

#[test]
fn nothing_is_sent_before_subscription() {
    let mut h = Harness::new();

    h.edge(true);
    h.post(StackEvent::Boot);
    h.pump();
    h.edge(false);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(StackEvent::Bonded { connection: C1 });
    h.pump();
    h.edge(true);
    h.pump();

    assert!(h.stack.notifications().is_empty());
}

#[test]
fn disconnect_rearms_identically_and_stops_notifications() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(subscribed(C1));
    h.post(StackEvent::ConnectionClosed {
        connection: C1,
        reason: 0x13,
    });
    h.pump();

    let starts = h.stack.starts();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[0], starts[1]);
    assert_eq!(h.state.link_state(), LinkState::Advertising);

    h.edge(true);
    h.pump();
    assert!(h.stack.notifications().is_empty());
}

#[test]
fn boot_creates_exactly_one_set_with_fixed_timing() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.pump();

    assert_eq!(
        h.stack.calls,
        vec![
            Call::Security,
            Call::CreateSet,
            Call::Timing(AdvertisingTiming::fixed()),
            Call::Start(AdvertisingSet(0), AdvertisingMode::GENERAL_CONNECTABLE),
        ]
    );
    assert!(h.state.is_advertising());
}

#[test]
fn reconnect_after_failed_bonding() {
    let mut h = Harness::new();
    let c2 = ConnectionHandle(2);

    h.post(StackEvent::Boot);
    h.post(StackEvent::ConnectionOpened { connection: C1 });
    h.post(StackEvent::BondingFailed {
        connection: C1,
        reason: 0x03,
    });
    h.post(StackEvent::ConnectionClosed {
        connection: C1,
        reason: 0x16,
    });
    h.post(StackEvent::ConnectionOpened { connection: c2 });
    h.post(StackEvent::Bonded { connection: c2 });
    h.post(subscribed(c2));
    h.pump();

    h.edge(true);
    h.pump();

    assert_eq!(
        h.stack
            .calls
            .iter()
            .filter(|c| matches!(c, Call::IncreaseSecurity(_)))
            .count(),
        2
    );
    assert_eq!(
        h.stack.notifications(),
        vec![&Call::Notify(c2, REPORT, vec![0x01])]
    );
}

#[test]
fn unknown_events_are_ignored() {
    let mut h = Harness::new();

    h.post(StackEvent::Boot);
    h.pump();
    let before = h.stack.calls.len();

    h.post(StackEvent::Unknown(0x00a0_0020));
    h.post(StackEvent::ExternalSignal(0x8));
    h.pump();

    assert_eq!(h.stack.calls.len(), before);
}
