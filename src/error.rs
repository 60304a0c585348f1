/*!
error module defines the error types used in bmp-replay.
*/
use crate::models::MessageLocation;
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use std::fmt::{Display, Formatter};
use std::{error::Error, fmt};
use thiserror::Error;

/// Errors raised while classifying or extracting a single message.
///
/// These are the malformed-input class: the offending message cannot be
/// interpreted under the supported grammar, but surrounding messages may
/// still be analyzable (see [crate::AnalyzerConfig::best_effort]).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// This error represents a [num_enum::TryFromPrimitiveError] error for
    /// any of the wire-defined enums (message type, peer type).
    #[error("unrecognized value {value} for {type_name}")]
    UnrecognizedEnumVariant { type_name: &'static str, value: u64 },

    /// A required dissector field is absent from the message.
    #[error("missing field {0}")]
    MissingField(&'static str),

    /// A dissector field is present but its value could not be parsed.
    #[error("malformed field {name}: {value:?}")]
    MalformedField { name: &'static str, value: String },

    /// Peer identity was requested for a message type that carries no
    /// per-peer header (Initiation, Termination).
    #[error("message type {0} carries no per-peer header")]
    NoPeerHeader(&'static str),

    /// Neither the IPv4 nor the IPv6 peer address field is present.
    #[error("no peer address field present")]
    MissingPeerAddress,

    /// The reachability attribute type code is not one this analyzer
    /// understands (supported: plain NLRI, MP_REACH, MP_UNREACH).
    #[error("unsupported path attribute type code {0}")]
    UnsupportedPathAttributeType(u8),

    /// A single monitored PDU carries both withdrawn routes and update
    /// NLRI. Legal BGP in principle, out of the supported grammar here.
    #[error("PDU mixes withdrawn routes and update NLRI")]
    MixedUpdateWithdraw,

    /// An MP_UNREACH attribute resolved no prefix and the analyzer is
    /// configured to reject that instead of treating it as End-of-RIB.
    #[error("MP_UNREACH attribute carries no prefix")]
    EmptyMpUnreach,

    /// LocRib peers must have both the adj-rib-out and post-policy flags
    /// clear; every other combination is a broken capture. Fatal.
    #[error("invalid monitoring flags for peer type {peer_type}: out={out}, post={post}")]
    InvalidFlagCombination {
        peer_type: &'static str,
        out: bool,
        post: bool,
    },

    /// Global sequence numbers are not strictly monotonic and contiguous
    /// from 0. Fatal: the capture-to-sequence assignment is broken.
    #[error("sequence violation: expected {expected}, found {found}")]
    SequenceViolation { expected: u64, found: u64 },
}

impl ReplayError {
    /// Invariant violations abort the whole analysis even in best-effort
    /// mode; everything else is isolatable to the offending message.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReplayError::InvalidFlagCombination { .. } | ReplayError::SequenceViolation { .. }
        )
    }

    /// Attach positional context for exact relocation in the capture.
    pub fn at(self, location: MessageLocation) -> LocatedError {
        LocatedError {
            error: self,
            location,
        }
    }
}

impl<T> From<TryFromPrimitiveError<T>> for ReplayError
where
    T: TryFromPrimitive,
    T::Primitive: Into<u64>,
{
    #[inline]
    fn from(value: TryFromPrimitiveError<T>) -> Self {
        ReplayError::UnrecognizedEnumVariant {
            type_name: T::NAME,
            value: value.number.into(),
        }
    }
}

/// A [ReplayError] paired with the location of the offending message, so a
/// caller can find it in the source capture (Wireshark frame/packet).
#[derive(Debug, PartialEq, Eq)]
pub struct LocatedError {
    pub error: ReplayError,
    pub location: MessageLocation,
}

impl Display for LocatedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.error, self.location)
    }
}

impl Error for LocatedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}
