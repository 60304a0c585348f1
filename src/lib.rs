/*!
`bmp-replay` reconstructs per-peer session state and per-prefix RIB history
from a finite, already-dissected BMP message stream.

It does not decode raw bytes: an external dissector (tshark or similar)
exposes each message as named string fields, consumed through the
[fields::FieldSource] contract. This crate classifies every message,
derives peer identity and monitoring type, extracts the normalized NLRI of
each RouteMonitoring PDU and folds the whole stream into auditable,
ordered, deduplicated histories that replay/verification tools can assert
against.

```
use bmp_replay::fields::{names, FieldMap, FieldSource};
use bmp_replay::ingest::{ingest_frames, Frame};
use bmp_replay::{AnalyzerConfig, ReplayAnalyzer};

let peer_up = FieldMap::new()
    .with(names::MESSAGE_TYPE, "3")
    .with(names::PEER_TYPE, "0")
    .with(names::PEER_IPV4_ADDR, "192.0.2.1")
    .with(names::PEER_DISTINGUISHER, "00:00:00:00:00:00:00:00");

let frames: Vec<Frame> = vec![vec![Box::new(peer_up) as Box<dyn FieldSource>]];
let messages = ingest_frames(frames).unwrap();

let mut analyzer = ReplayAnalyzer::new(AnalyzerConfig::default());
analyzer.analyze(&messages).unwrap();
assert_eq!(analyzer.total_messages(), 1);
```
*/
pub mod analyzer;
pub mod error;
pub mod fields;
pub mod ingest;
pub mod models;

pub use analyzer::{
    extract_nlri, AnalyzerConfig, EmptyUnreachPolicy, PeerRdMismatch, PeerSessionRecord, RibEntry,
    RibTracker, ReplayAnalyzer, RouteState, SessionTracker, StatKind, StatRecord, StatsTracker,
    VersionChange,
};
pub use error::{LocatedError, ReplayError};
pub use ingest::{ingest_frames, validate_sequencing};
pub use models::{
    BgpPduType, ClassifiedMessage, MessageLocation, MessageType, MonitoringType, Nlri, PeerId,
    PeerType,
};
