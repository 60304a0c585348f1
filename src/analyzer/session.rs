/*!
Per-peer session state machine, folded over the whole message stream.

Peers start in an implicit Unknown state. PeerUp/PeerDown messages drive
transitions; repeating the current state is counted as a duplicate instead
of transitioning. Every other message type is counted against the peer,
partitioned by whether the session was up when it arrived. Anomalies are
never raised as errors here; they surface as counters for the caller to
assert on or display.
*/
use crate::error::ReplayError;
use crate::models::{ClassifiedMessage, MessageType, PeerId, PeerType};
use itertools::Itertools;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Accumulated session history for one peer. Created on the first message
/// referencing the peer and kept for the whole replay.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerSessionRecord {
    /// Current up/down state; `None` until the first PeerUp/PeerDown.
    pub state: Option<MessageType>,
    /// Sequence numbers of the messages that changed the state.
    pub state_transitions: Vec<u64>,
    /// Per-message-type counters: `<Type>`, `<Type>_duplicate`,
    /// `<Type>_ignored`.
    pub counters: BTreeMap<String, u64>,
}

impl PeerSessionRecord {
    fn incr(&mut self, counter: impl Into<String>) {
        *self.counters.entry(counter.into()).or_insert(0) += 1;
    }

    /// Counter value, 0 if never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn is_up(&self) -> bool {
        self.state == Some(MessageType::PeerUp)
    }
}

/// Folds the message stream into per-peer session records.
///
/// LocRibInstance peers describe the router's own table rather than a
/// neighbor, so they are kept in a separate VRF store; the state-machine
/// logic is the same for both stores.
#[derive(Debug, Default)]
pub struct SessionTracker {
    peers: HashMap<PeerId, PeerSessionRecord>,
    vrfs: HashMap<PeerId, PeerSessionRecord>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one message. Messages without a per-peer header are ignored.
    /// Must be called in increasing sequence order.
    pub fn observe(&mut self, msg: &ClassifiedMessage) -> Result<(), ReplayError> {
        let msg_type = msg.msg_type;
        if !msg_type.has_peer_header() {
            return Ok(());
        }

        let peer_id = PeerId::from_message(msg)?;
        let store = match peer_id.peer_type {
            PeerType::LocRibInstance => &mut self.vrfs,
            _ => &mut self.peers,
        };
        let record = store.entry(peer_id.clone()).or_default();

        match msg_type {
            MessageType::PeerUp | MessageType::PeerDown => {
                if record.state == Some(msg_type) {
                    record.incr(format!("{}_duplicate", msg_type.as_str()));
                    debug!("peer {} duplicate state {} {}", peer_id, msg_type, msg.location);
                } else {
                    debug!(
                        "peer {} changed state {:?} -> {} {}",
                        peer_id, record.state, msg_type, msg.location
                    );
                    record.state_transitions.push(msg.sequence());
                    record.state = Some(msg_type);
                    record.incr(msg_type.as_str());
                }
            }
            _ => {
                if record.is_up() {
                    record.incr(msg_type.as_str());
                } else {
                    record.incr(format!("{}_ignored", msg_type.as_str()));
                }
            }
        }
        Ok(())
    }

    pub fn peer(&self, peer_id: &PeerId) -> Option<&PeerSessionRecord> {
        self.peers.get(peer_id)
    }

    pub fn vrf(&self, peer_id: &PeerId) -> Option<&PeerSessionRecord> {
        self.vrfs.get(peer_id)
    }

    pub fn peers(&self) -> impl Iterator<Item = (&PeerId, &PeerSessionRecord)> {
        self.peers.iter()
    }

    pub fn vrfs(&self) -> impl Iterator<Item = (&PeerId, &PeerSessionRecord)> {
        self.vrfs.iter()
    }

    /// All records (peers then VRFs) in a stable order for reporting.
    pub fn summary(&self) -> Vec<(&PeerId, &PeerSessionRecord)> {
        self.peers
            .iter()
            .chain(self.vrfs.iter())
            .sorted_by_key(|(peer_id, _)| {
                (
                    peer_id.peer_type as u8,
                    peer_id.peer_address.as_str(),
                    peer_id.route_distinguisher.as_str(),
                )
            })
            .collect()
    }
}
