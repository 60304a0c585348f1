use crate::error::ReplayError;
use crate::fields::{names, FieldSource, FieldSourceExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{Debug, Display, Formatter};

/// BMP message type enum.
///
/// ```text
///    o  Message Type (1 byte): This identifies the type of the BMP
///       message.
///
///       *  Type = 0: Route Monitoring
///       *  Type = 1: Statistics Report
///       *  Type = 2: Peer Down Notification
///       *  Type = 3: Peer Up Notification
///       *  Type = 4: Initiation Message
///       *  Type = 5: Termination Message
/// ```
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageType {
    RouteMonitoring = 0,
    StatisticsReport = 1,
    PeerDown = 2,
    PeerUp = 3,
    Initiation = 4,
    Termination = 5,
}

impl MessageType {
    /// Variant name, used as the base of session-tracker counter keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RouteMonitoring => "RouteMonitoring",
            MessageType::StatisticsReport => "StatisticsReport",
            MessageType::PeerDown => "PeerDown",
            MessageType::PeerUp => "PeerUp",
            MessageType::Initiation => "Initiation",
            MessageType::Termination => "Termination",
        }
    }

    /// Initiation and Termination are the only types without a per-peer
    /// header.
    pub fn has_peer_header(&self) -> bool {
        !matches!(self, MessageType::Initiation | MessageType::Termination)
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), *self as u8)
    }
}

/// BMP per-peer header peer type.
///
/// <https://www.iana.org/assignments/bmp-parameters/bmp-parameters.xhtml#peer-types>
#[derive(Debug, TryFromPrimitive, IntoPrimitive, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PeerType {
    GlobalInstance = 0,
    RDInstance = 1,
    LocalInstance = 2,
    LocRibInstance = 3,
}

impl PeerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerType::GlobalInstance => "GlobalInstance",
            PeerType::RDInstance => "RDInstance",
            PeerType::LocalInstance => "LocalInstance",
            PeerType::LocRibInstance => "LocRibInstance",
        }
    }
}

impl Display for PeerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), *self as u8)
    }
}

/// Position of a message within the source capture.
///
/// `sequence` is global across the whole capture; `frame`/`frame_index` are
/// zero-based, while the `Display` form is one-based to match what
/// Wireshark shows (F = frame, P = packet within the frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageLocation {
    pub sequence: u64,
    pub frame: u32,
    pub frame_index: u32,
    pub frame_count: u32,
}

impl Display for MessageLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@ (F{}:P{}/{})",
            self.frame + 1,
            self.frame_index + 1,
            self.frame_count
        )
    }
}

/// One dissected BMP message with its resolved type and capture position.
///
/// Built once at ingestion and never mutated. Field lookup passes straight
/// through to the underlying [FieldSource], so downstream components can
/// read arbitrary protocol fields without re-wrapping the message.
pub struct ClassifiedMessage {
    pub location: MessageLocation,
    pub msg_type: MessageType,
    fields: Box<dyn FieldSource>,
}

impl ClassifiedMessage {
    /// Resolve the message type from the integer `type` field and wrap the
    /// source with its capture position.
    pub fn classify(
        fields: Box<dyn FieldSource>,
        location: MessageLocation,
    ) -> Result<Self, ReplayError> {
        let type_value = fields.require_u64(names::MESSAGE_TYPE)?;
        let msg_type = MessageType::try_from(u8::try_from(type_value).map_err(|_| {
            ReplayError::UnrecognizedEnumVariant {
                type_name: "MessageType",
                value: type_value,
            }
        })?)?;
        Ok(ClassifiedMessage {
            location,
            msg_type,
            fields,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.location.sequence
    }
}

impl FieldSource for ClassifiedMessage {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.field(name)
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.has_field(name)
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.field_names()
    }
}

impl Debug for ClassifiedMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifiedMessage")
            .field("location", &self.location)
            .field("msg_type", &self.msg_type)
            .finish_non_exhaustive()
    }
}
