//! Security handler and in-RAM bond table.
//!
//! Bonds survive reconnects but not resets. "Delete all bondings" clears the
//! table so a peer whose keys no longer match pairs from scratch.

use core::cell::{Cell, RefCell};

use button_peripheral::config::MAX_BONDED_PEERS;
use button_peripheral::stack::IoCapability;
use button_peripheral::{ConnectionHandle, StackEvent};
use defmt::{info, warn};
use heapless::Vec;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{Connection, EncryptionInfo, IdentityKey, MasterId, SecurityMode};

use crate::EVENTS;

struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
}

pub struct Bonder {
    io: Cell<IoCapability>,
    bondable: Cell<bool>,
    peers: RefCell<Vec<PeerBond, MAX_BONDED_PEERS>>,
}

impl Bonder {
    pub fn new() -> Self {
        Self {
            io: Cell::new(IoCapability::NoInputNoOutput),
            bondable: Cell::new(false),
            peers: RefCell::new(Vec::new()),
        }
    }

    pub fn configure(&self, io: IoCapability, bondable: bool) {
        self.io.set(io);
        self.bondable.set(bondable);
    }

    /// Forget every bond.
    pub fn clear(&self) {
        let mut peers = self.peers.borrow_mut();
        info!("deleting {} bond(s)", peers.len());
        peers.clear();
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        match self.io.get() {
            IoCapability::DisplayOnly => IoCapabilities::DisplayOnly,
            IoCapability::DisplayYesNo => IoCapabilities::DisplayYesNo,
            IoCapability::KeyboardOnly => IoCapabilities::KeyboardOnly,
            IoCapability::NoInputNoOutput => IoCapabilities::None,
            IoCapability::KeyboardDisplay => IoCapabilities::KeyboardDisplay,
        }
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        self.bondable.get()
    }

    fn on_bonded(
        &self,
        conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        _peer_id: IdentityKey,
    ) {
        {
            let mut peers = self.peers.borrow_mut();
            if let Some(existing) = peers.iter_mut().find(|p| p.master_id == master_id) {
                existing.key = key;
            } else {
                if peers.is_full() {
                    peers.remove(0);
                }
                let _ = peers.push(PeerBond { master_id, key });
            }
        }

        if let Some(handle) = conn.handle() {
            let event = StackEvent::Bonded {
                connection: ConnectionHandle(handle),
            };
            if EVENTS.try_send(event).is_err() {
                warn!("event queue full - bonded event dropped");
            }
        }
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peers
            .borrow()
            .iter()
            .find_map(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
    }
}
