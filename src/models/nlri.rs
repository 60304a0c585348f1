use std::fmt::{Display, Formatter};

/// Kind of the BGP PDU embedded in a RouteMonitoring message.
///
/// Ordinals follow the original reporting convention: withdrawn = 0,
/// updated = 1, with End-of-RIB below both.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum BgpPduType {
    EndOfRib = -1,
    Withdraw = 0,
    Update = 1,
}

impl Display for BgpPduType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BgpPduType::EndOfRib => "EoR",
            BgpPduType::Withdraw => "Withdraw",
            BgpPduType::Update => "Update",
        };
        write!(f, "{name}")
    }
}

/// Prefix placeholder used for End-of-RIB markers, which carry no NLRI.
pub const EOR_PREFIX: &str = "EoR";

/// Normalized NLRI extracted from an embedded BGP PDU: the prefix text as
/// dissected (address part only, no `/len` suffix), its length, the
/// add-path identifier and the route distinguisher (both zero/empty when
/// the PDU carries none).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nlri {
    pub prefix: String,
    pub prefix_len: u8,
    pub path_id: u32,
    pub route_distinguisher: String,
}

impl Nlri {
    /// The sentinel NLRI recorded for End-of-RIB markers.
    pub fn end_of_rib() -> Nlri {
        Nlri {
            prefix: EOR_PREFIX.to_string(),
            prefix_len: 0,
            path_id: 0,
            route_distinguisher: String::new(),
        }
    }

    /// Composed RIB-entry key. Entries with identical prefix, length,
    /// path id and RD under the same scope collide intentionally; that
    /// quadruple is the identity of a RIB entry.
    pub fn rib_key(&self) -> String {
        format!(
            "{}/{}, id={}, rd={}",
            self.prefix, self.prefix_len, self.path_id, self.route_distinguisher
        )
    }
}

impl Display for Nlri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rib_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rib_key_format() {
        let nlri = Nlri {
            prefix: "10.0.0.0".to_string(),
            prefix_len: 24,
            path_id: 2,
            route_distinguisher: "00:00:00:01:00:00:00:0a".to_string(),
        };
        assert_eq!(nlri.rib_key(), "10.0.0.0/24, id=2, rd=00:00:00:01:00:00:00:0a");
    }

    #[test]
    fn test_end_of_rib_sentinel() {
        let eor = Nlri::end_of_rib();
        assert_eq!(eor.prefix, "EoR");
        assert_eq!(eor.prefix_len, 0);
        assert_eq!(eor.path_id, 0);
        assert!(eor.route_distinguisher.is_empty());
    }
}
