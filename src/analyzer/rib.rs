/*!
Per-prefix RIB history, scoped by (peer, monitoring type).

Every RouteMonitoring message appends to the timeline of the prefix it
names; updates and withdraws additionally maintain counts, the last known
state and the last attribute set. Entries are never removed, so a full
replay leaves a complete queryable history per prefix.
*/
use crate::fields::{names, FieldSource};
use crate::models::{BgpPduType, ClassifiedMessage, MonitoringType, Nlri, PeerId};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Last known state of a prefix within its scope.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteState {
    Up,
    Down,
}

/// History of one prefix within a (peer, monitoring type) scope, keyed by
/// [Nlri::rib_key]. Created on first reference, mutated by every later
/// event, never deleted.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RibEntry {
    pub prefix_len: u8,
    pub path_id: u32,
    pub route_distinguisher: String,
    pub update_count: u64,
    pub withdraw_count: u64,
    /// Withdraws received while the prefix was already down or never seen
    /// up.
    pub duplicate_withdraw_count: u64,
    pub last_state: Option<RouteState>,
    /// Path attributes of the most recent update, names stripped of the
    /// common dissector prefix. `None` after a withdraw.
    pub last_attributes: Option<BTreeMap<String, String>>,
    /// Every event touching this prefix, as (sequence, PDU kind).
    pub timeline: Vec<(u64, BgpPduType)>,
}

impl RibEntry {
    fn new(nlri: &Nlri) -> RibEntry {
        RibEntry {
            prefix_len: nlri.prefix_len,
            path_id: nlri.path_id,
            route_distinguisher: nlri.route_distinguisher.clone(),
            update_count: 0,
            withdraw_count: 0,
            duplicate_withdraw_count: 0,
            last_state: None,
            last_attributes: None,
            timeline: Vec::new(),
        }
    }
}

/// RIB scope key: one RIB view of one peer.
pub type RibScope = (PeerId, MonitoringType);

/// Folds RouteMonitoring events into per-scope, per-prefix histories.
#[derive(Debug, Default)]
pub struct RibTracker {
    scopes: HashMap<RibScope, HashMap<String, RibEntry>>,
}

impl RibTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one RouteMonitoring event that has already been resolved to
    /// its peer, monitoring type and NLRI. Must be called in increasing
    /// sequence order.
    pub fn observe(
        &mut self,
        msg: &ClassifiedMessage,
        peer_id: &PeerId,
        monitoring_type: MonitoringType,
        nlri: &Nlri,
        pdu_type: BgpPduType,
    ) {
        let rib = self
            .scopes
            .entry((peer_id.clone(), monitoring_type))
            .or_default();
        let entry = rib
            .entry(nlri.rib_key())
            .or_insert_with(|| RibEntry::new(nlri));

        entry.timeline.push((msg.sequence(), pdu_type));

        match pdu_type {
            // an EoR is an update event for bookkeeping, not a content
            // change
            BgpPduType::EndOfRib => {
                entry.update_count += 1;
            }
            BgpPduType::Withdraw => {
                if matches!(entry.last_state, Some(RouteState::Down) | None) {
                    entry.duplicate_withdraw_count += 1;
                    debug!("duplicate withdraw of {} {}", nlri, msg.location);
                }
                entry.withdraw_count += 1;
                entry.last_state = Some(RouteState::Down);
                entry.last_attributes = None;
            }
            BgpPduType::Update => {
                entry.update_count += 1;
                entry.last_state = Some(RouteState::Up);
                entry.last_attributes = Some(path_attributes(msg));
            }
        }
    }

    pub fn scope(&self, peer_id: &PeerId, monitoring_type: MonitoringType) -> Option<&HashMap<String, RibEntry>> {
        self.scopes.get(&(peer_id.clone(), monitoring_type))
    }

    pub fn entry(
        &self,
        peer_id: &PeerId,
        monitoring_type: MonitoringType,
        rib_key: &str,
    ) -> Option<&RibEntry> {
        self.scope(peer_id, monitoring_type)?.get(rib_key)
    }

    pub fn scopes(&self) -> impl Iterator<Item = (&RibScope, &HashMap<String, RibEntry>)> {
        self.scopes.iter()
    }
}

/// All path-attribute fields present on the message, names stripped of the
/// common `bgp_update_path_attribute_` prefix.
fn path_attributes(msg: &ClassifiedMessage) -> BTreeMap<String, String> {
    msg.field_names()
        .into_iter()
        .filter_map(|name| {
            let stripped = name.strip_prefix(names::PATH_ATTRIBUTE_FIELD_PREFIX)?;
            Some((stripped.to_string(), msg.field(name)?.to_string()))
        })
        .collect()
}
