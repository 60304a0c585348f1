/*!
Replay analysis: a single sequential fold of a classified message stream
through the session, RIB and statistics trackers, plus the stream-level
consistency checks (peer-type/RD pairing, BMP version stability).
*/
use crate::error::{LocatedError, ReplayError};
use crate::fields::{names, FieldSource, FieldSourceExt};
use crate::ingest::validate_sequencing;
use crate::models::{
    ClassifiedMessage, MessageLocation, MessageType, MonitoringType, PeerId, PeerType,
};
use log::warn;
use std::collections::BTreeMap;

pub use nlri::{extract_nlri, EmptyUnreachPolicy};
pub use rib::{RibEntry, RibScope, RibTracker, RouteState};
pub use session::{PeerSessionRecord, SessionTracker};
pub use stats::{stat_names, StatKind, StatRecord, StatsTracker};

pub(crate) mod nlri;
pub(crate) mod rib;
pub(crate) mod session;
pub(crate) mod stats;

/// Analysis configuration.
#[derive(Debug, Default, Copy, Clone)]
pub struct AnalyzerConfig {
    /// Record malformed messages with their location and keep going
    /// instead of aborting on the first one. Invariant violations
    /// (sequencing, LocRib flags) abort regardless.
    pub best_effort: bool,
    /// How to read an MP_UNREACH attribute that resolves no prefix.
    pub empty_unreach: EmptyUnreachPolicy,
}

/// A message whose peer type and route distinguisher disagree: a
/// GlobalInstance peer carrying a non-zero RD, or an RD-scoped peer
/// carrying the all-zero one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRdMismatch {
    pub location: MessageLocation,
    pub peer_id: PeerId,
}

/// An Initiation message announcing a BMP version different from the first
/// one seen in the replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionChange {
    pub location: MessageLocation,
    pub previous: u64,
    pub announced: u64,
}

/// Drives one replay: validates sequencing, folds every message through
/// the trackers and accumulates the stream-level checks. All results are
/// exposed read-only once [ReplayAnalyzer::analyze] returns.
#[derive(Debug, Default)]
pub struct ReplayAnalyzer {
    config: AnalyzerConfig,
    sessions: SessionTracker,
    ribs: RibTracker,
    stats: StatsTracker,
    totals: BTreeMap<MessageType, u64>,
    rd_mismatches: Vec<PeerRdMismatch>,
    bmp_version: Option<u64>,
    version_changes: Vec<VersionChange>,
    skipped: Vec<LocatedError>,
}

impl ReplayAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        ReplayAnalyzer {
            config,
            ..Default::default()
        }
    }

    /// Fold the whole replay. The stream must satisfy the sequencing law;
    /// violating it aborts before any message is folded.
    pub fn analyze(&mut self, messages: &[ClassifiedMessage]) -> Result<(), LocatedError> {
        if let Err(error) = validate_sequencing(messages) {
            let location = match &error {
                ReplayError::SequenceViolation { expected, .. } => {
                    messages[*expected as usize].location
                }
                _ => unreachable!("validate_sequencing only reports sequence violations"),
            };
            return Err(error.at(location));
        }

        for msg in messages {
            *self.totals.entry(msg.msg_type).or_insert(0) += 1;

            if let Err(error) = self.fold(msg) {
                if error.is_fatal() || !self.config.best_effort {
                    return Err(error.at(msg.location));
                }
                warn!("skipping malformed message: {} {}", error, msg.location);
                self.skipped.push(error.at(msg.location));
            }
        }
        Ok(())
    }

    fn fold(&mut self, msg: &ClassifiedMessage) -> Result<(), ReplayError> {
        if msg.msg_type == MessageType::Initiation {
            self.check_version(msg)?;
        }
        if !msg.msg_type.has_peer_header() {
            return Ok(());
        }

        let peer_id = PeerId::from_message(msg)?;
        self.check_peer_rd(msg, &peer_id);
        self.sessions.observe(msg)?;

        match msg.msg_type {
            MessageType::StatisticsReport => self.stats.observe(msg, &peer_id)?,
            MessageType::RouteMonitoring => {
                let monitoring_type = MonitoringType::from_message(msg, peer_id.peer_type)?;
                let (nlri, pdu_type) = extract_nlri(msg, self.config.empty_unreach)?;
                self.ribs.observe(msg, &peer_id, monitoring_type, &nlri, pdu_type);
            }
            _ => {}
        }
        Ok(())
    }

    /// Initiation messages of one capture must all announce the same BMP
    /// version; a change is recorded, not raised.
    fn check_version(&mut self, msg: &ClassifiedMessage) -> Result<(), ReplayError> {
        if !msg.has_field(names::BMP_VERSION) {
            return Ok(());
        }
        let announced = msg.require_u64(names::BMP_VERSION)?;
        match self.bmp_version {
            None => self.bmp_version = Some(announced),
            Some(previous) if previous != announced => {
                warn!(
                    "BMP version changed {} -> {} {}",
                    previous, announced, msg.location
                );
                self.version_changes.push(VersionChange {
                    location: msg.location,
                    previous,
                    announced,
                });
                self.bmp_version = Some(announced);
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// GlobalInstance peers must carry the all-zero RD; RDInstance and
    /// LocalInstance peers must carry a non-zero one. Recorded, not
    /// raised.
    fn check_peer_rd(&mut self, msg: &ClassifiedMessage, peer_id: &PeerId) {
        let can_rd = peer_id.peer_type != PeerType::GlobalInstance;
        let need_rd = matches!(
            peer_id.peer_type,
            PeerType::RDInstance | PeerType::LocalInstance
        );
        let has_rd = !peer_id.has_zero_rd();
        if (has_rd && !can_rd) || (need_rd && !has_rd) {
            warn!("peer {} has invalid type/RD combination {}", peer_id, msg.location);
            self.rd_mismatches.push(PeerRdMismatch {
                location: msg.location,
                peer_id: peer_id.clone(),
            });
        }
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn ribs(&self) -> &RibTracker {
        &self.ribs
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Count of messages seen per type across the whole replay.
    pub fn message_totals(&self) -> &BTreeMap<MessageType, u64> {
        &self.totals
    }

    pub fn total_messages(&self) -> u64 {
        self.totals.values().sum()
    }

    pub fn rd_mismatches(&self) -> &[PeerRdMismatch] {
        &self.rd_mismatches
    }

    pub fn version_changes(&self) -> &[VersionChange] {
        &self.version_changes
    }

    /// Malformed messages isolated in best-effort mode, in stream order.
    pub fn skipped(&self) -> &[LocatedError] {
        &self.skipped
    }
}
