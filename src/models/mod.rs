//! Value types shared across the analyzer: message classification, peer
//! identity and normalized NLRI.

mod message;
mod nlri;
mod peer;

pub use message::*;
pub use nlri::*;
pub use peer::*;
