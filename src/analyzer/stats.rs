/*!
Statistics-report tracking.

BMP statistics come in two kinds on the wire: 4-byte monotonic counters and
8-byte point-in-time gauges. The kind carries its own validity rule —
a counter must never decrease between reports, a gauge may move freely.
Regressions are recorded as anomalies, not raised as errors.
*/
use crate::error::ReplayError;
use crate::fields::{FieldSource, FieldSourceExt};
use crate::models::{ClassifiedMessage, PeerId};
use log::warn;
use std::collections::HashMap;

/// Dissector fields of a statistics TLV.
pub mod stat_names {
    pub const STAT_TYPE: &str = "stat_type";
    pub const STAT_LEN: &str = "stat_len";
    pub const STAT_DATA: &str = "stat_data";
}

/// Kind of one statistic, derived from its wire length.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatKind {
    /// 4-byte monotonic counter.
    Counter,
    /// 8-byte point-in-time gauge.
    Gauge,
}

impl StatKind {
    pub fn from_len(len: u64) -> Option<StatKind> {
        match len {
            4 => Some(StatKind::Counter),
            8 => Some(StatKind::Gauge),
            _ => None,
        }
    }

    /// Whether a transition from the previous to the new value is legal
    /// for this kind.
    pub fn valid_transition(&self, previous: u64, new: u64) -> bool {
        match self {
            StatKind::Counter => new >= previous,
            StatKind::Gauge => true,
        }
    }
}

/// Last observed value of one statistic of one peer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatRecord {
    pub kind: StatKind,
    pub last_value: u64,
    pub samples: u64,
    /// Counter values that went backwards.
    pub regressions: u64,
}

/// Folds StatisticsReport messages into per-(peer, stat type) records.
#[derive(Debug, Default)]
pub struct StatsTracker {
    stats: HashMap<(PeerId, u64), StatRecord>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one StatisticsReport message. Messages whose dissection
    /// carries no statistics TLV are skipped.
    pub fn observe(&mut self, msg: &ClassifiedMessage, peer_id: &PeerId) -> Result<(), ReplayError> {
        if !msg.has_field(stat_names::STAT_TYPE) {
            return Ok(());
        }

        let stat_type = msg.require_u64(stat_names::STAT_TYPE)?;
        let stat_len = msg.require_u64(stat_names::STAT_LEN)?;
        let value = msg.require_u64(stat_names::STAT_DATA)?;
        let kind = StatKind::from_len(stat_len).ok_or(ReplayError::MalformedField {
            name: stat_names::STAT_LEN,
            value: stat_len.to_string(),
        })?;

        match self.stats.entry((peer_id.clone(), stat_type)) {
            std::collections::hash_map::Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if !record.kind.valid_transition(record.last_value, value) {
                    record.regressions += 1;
                    warn!(
                        "stat {} of peer {} regressed {} -> {} {}",
                        stat_type, peer_id, record.last_value, value, msg.location
                    );
                }
                record.last_value = value;
                record.samples += 1;
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant.insert(StatRecord {
                    kind,
                    last_value: value,
                    samples: 1,
                    regressions: 0,
                });
            }
        }
        Ok(())
    }

    pub fn stat(&self, peer_id: &PeerId, stat_type: u64) -> Option<&StatRecord> {
        self.stats.get(&(peer_id.clone(), stat_type))
    }

    /// Total counter regressions across all peers and stat types.
    pub fn total_regressions(&self) -> u64 {
        self.stats.values().map(|record| record.regressions).sum()
    }
}
