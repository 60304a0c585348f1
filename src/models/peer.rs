use crate::error::ReplayError;
use crate::fields::{names, FieldSourceExt};
use crate::models::{ClassifiedMessage, PeerType};
use num_enum::IntoPrimitive;
use std::fmt::{Display, Formatter};

/// The all-zero route distinguisher as the dissector renders it. Present on
/// every per-peer header; only meaningful for RD-scoped peer types.
pub const ALL_ZERO_RD: &str = "00:00:00:00:00:00:00:00";

/// Stable identity of a monitored peer: two messages carrying the same
/// (type, address, RD) triple refer to the same peer/VRF.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerId {
    pub peer_type: PeerType,
    pub peer_address: String,
    pub route_distinguisher: String,
}

impl PeerId {
    /// Derive the peer identity from a message's per-peer header fields.
    ///
    /// Only valid for message types that carry a per-peer header; callers
    /// must filter out Initiation/Termination first.
    pub fn from_message(msg: &ClassifiedMessage) -> Result<PeerId, ReplayError> {
        if !msg.msg_type.has_peer_header() {
            return Err(ReplayError::NoPeerHeader(msg.msg_type.as_str()));
        }

        let type_value = msg.require_u64(names::PEER_TYPE)?;
        let peer_type = PeerType::try_from(u8::try_from(type_value).map_err(|_| {
            ReplayError::UnrecognizedEnumVariant {
                type_name: "PeerType",
                value: type_value,
            }
        })?)?;

        // IPv4 field when present, IPv6 otherwise
        let peer_address = msg
            .first_of(&[names::PEER_IPV4_ADDR, names::PEER_IPV6_ADDR])
            .ok_or(ReplayError::MissingPeerAddress)?
            .to_string();

        let route_distinguisher = msg.require(names::PEER_DISTINGUISHER)?.to_string();

        Ok(PeerId {
            peer_type,
            peer_address,
            route_distinguisher,
        })
    }

    pub fn has_zero_rd(&self) -> bool {
        self.route_distinguisher == ALL_ZERO_RD
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} rd={}",
            self.peer_type, self.peer_address, self.route_distinguisher
        )
    }
}

/// Which RIB view a RouteMonitoring message reports on: the adjacency
/// direction crossed with pre/post-policy, or the router's Loc-RIB.
///
/// The ordinal is the bit combination `(out << 1) | post`, with LocRib one
/// bit above; kept numeric for reporting parity with the wire flags.
#[derive(Debug, IntoPrimitive, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MonitoringType {
    AdjInPre = 0,
    AdjInPost = 1,
    AdjOutPre = 2,
    AdjOutPost = 3,
    LocRib = 4,
}

impl MonitoringType {
    /// Resolve the monitoring type from the peer type and the two per-peer
    /// header flags.
    ///
    /// LocRib is valid iff the peer type is LocRibInstance with both flags
    /// clear; any flag set on a LocRibInstance peer is an invariant
    /// violation, as is deriving an adjacency type for one.
    pub fn from_flags(
        peer_type: PeerType,
        out: bool,
        post: bool,
    ) -> Result<MonitoringType, ReplayError> {
        if peer_type == PeerType::LocRibInstance {
            if out || post {
                return Err(ReplayError::InvalidFlagCombination {
                    peer_type: peer_type.as_str(),
                    out,
                    post,
                });
            }
            return Ok(MonitoringType::LocRib);
        }
        Ok(match (out, post) {
            (false, false) => MonitoringType::AdjInPre,
            (false, true) => MonitoringType::AdjInPost,
            (true, false) => MonitoringType::AdjOutPre,
            (true, true) => MonitoringType::AdjOutPost,
        })
    }

    /// Resolve from a message's per-peer header. Absent flag fields read
    /// as clear; some dissectors omit them on non-monitoring messages.
    pub fn from_message(
        msg: &ClassifiedMessage,
        peer_type: PeerType,
    ) -> Result<MonitoringType, ReplayError> {
        let out = msg.flag(names::PEER_FLAGS_ADJ_RIB_OUT)?;
        let post = msg.flag(names::PEER_FLAGS_POST_POLICY)?;
        MonitoringType::from_flags(peer_type, out, post)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringType::AdjInPre => "AdjInPre",
            MonitoringType::AdjInPost => "AdjInPost",
            MonitoringType::AdjOutPre => "AdjOutPre",
            MonitoringType::AdjOutPost => "AdjOutPost",
            MonitoringType::LocRib => "LocRib",
        }
    }
}

impl Display for MonitoringType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), *self as u8)
    }
}
