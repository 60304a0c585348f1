/*!
Field-dissection consumption contract.

This crate never touches raw bytes: it consumes messages that an external
dissector has already exploded into named fields (tshark-style names with
the separators flattened to underscores, e.g.
`bgp_update_withdrawn_routes_length`). Numeric fields arrive
decimal-string-encoded and are parsed here.
*/
use crate::error::ReplayError;
use std::collections::BTreeMap;

/// Dissector field names read by this crate, collected in one place so the
/// lookup policy is stated once rather than scattered through the fold.
pub mod names {
    /// BMP common header message type (integer 0-5).
    pub const MESSAGE_TYPE: &str = "type";
    /// BMP Initiation message version TLV.
    pub const BMP_VERSION: &str = "version";

    // per-peer header
    pub const PEER_TYPE: &str = "peer_type";
    pub const PEER_IPV4_ADDR: &str = "peer_ip_addr";
    pub const PEER_IPV6_ADDR: &str = "peer_ipv6_addr";
    pub const PEER_DISTINGUISHER: &str = "peer_distinguisher";
    pub const PEER_FLAGS_ADJ_RIB_OUT: &str = "peer_flags_adj_rib_out";
    pub const PEER_FLAGS_POST_POLICY: &str = "peer_flags_post_policy";

    // embedded BGP PDU skeleton
    pub const WITHDRAWN_ROUTES_LENGTH: &str = "bgp_update_withdrawn_routes_length";
    pub const PATH_ATTRIBUTES_LENGTH: &str = "bgp_update_path_attributes_length";
    pub const PATH_ATTRIBUTE_TYPE_CODE: &str = "bgp_update_path_attribute_type_code";

    // plain (attribute type code 1) NLRI
    pub const NLRI_PREFIX: &str = "bgp_update_nlri";
    pub const NLRI_PREFIX_LENGTH: &str = "bgp_prefix_length";
    pub const NLRI_PATH_ID: &str = "bgp_nlri_path_id";
    pub const NLRI_ROUTE_DISTINGUISHER: &str = "bgp_rd";

    // plain withdraw
    pub const WITHDRAWN_PREFIX: &str = "bgp_withdrawn_prefix";
    pub const WITHDRAWN_PREFIX_LENGTH: &str = "bgp_withdrawn_prefix_length";

    /// MP_REACH prefix candidates, in resolution order: generic field
    /// first, then the IPv6-specific and IPv4-specific variants. The first
    /// non-absent field wins; this order is policy, not fallback accident.
    pub const MP_REACH_PREFIX_CANDIDATES: [&str; 3] = [
        "bgp_nlri_prefix",
        "bgp_update_path_attribute_mp_reach_nlri_ipv6_prefix",
        "bgp_update_path_attribute_mp_reach_nlri_ipv4_prefix",
    ];
    pub const MP_REACH_PREFIX_LENGTH: &str = "bgp_update_path_attribute_mp_reach_nlri_prefix_length";

    /// MP_UNREACH prefix candidates, same resolution order as MP_REACH.
    /// If none resolves, the PDU is an implicit End-of-RIB marker.
    pub const MP_UNREACH_PREFIX_CANDIDATES: [&str; 3] = [
        "bgp_mp_unreach_nlri_prefix",
        "bgp_update_path_attribute_mp_unreach_nlri_ipv6_prefix",
        "bgp_update_path_attribute_mp_unreach_nlri_ipv4_prefix",
    ];
    pub const MP_UNREACH_PREFIX_LENGTH: &str =
        "bgp_update_path_attribute_mp_unreach_nlri_prefix_length";

    /// Common prefix of all path-attribute fields; stripped when recording
    /// the attribute set of an Update on a RIB entry.
    pub const PATH_ATTRIBUTE_FIELD_PREFIX: &str = "bgp_update_path_attribute_";
}

/// Read-only access to the named fields of one dissected message.
pub trait FieldSource {
    /// Returns the raw string value of a field, or `None` if absent.
    fn field(&self, name: &str) -> Option<&str>;

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// All field names present on this message.
    fn field_names(&self) -> Vec<&str>;
}

/// Parsing helpers over the raw string fields. Provided for every source so
/// downstream components read typed values without re-wrapping the message.
pub trait FieldSourceExt: FieldSource {
    /// Field value or [ReplayError::MissingField].
    fn require(&self, name: &'static str) -> Result<&str, ReplayError> {
        self.field(name).ok_or(ReplayError::MissingField(name))
    }

    /// Required decimal-encoded integer field.
    fn require_u64(&self, name: &'static str) -> Result<u64, ReplayError> {
        parse_u64(name, self.require(name)?)
    }

    /// Optional decimal-encoded integer field; absent reads as `default`.
    fn u64_or(&self, name: &'static str, default: u64) -> Result<u64, ReplayError> {
        match self.field(name) {
            Some(value) => parse_u64(name, value),
            None => Ok(default),
        }
    }

    /// Optional flag field; the dissector encodes flags as `"0"`/`"1"` and
    /// omits them entirely on some message types, which reads as false.
    fn flag(&self, name: &'static str) -> Result<bool, ReplayError> {
        Ok(self.u64_or(name, 0)? != 0)
    }

    /// First present field out of an ordered candidate list.
    fn first_of<'a>(&'a self, candidates: &[&str]) -> Option<&'a str> {
        candidates.iter().find_map(|name| self.field(name))
    }
}

impl<T: FieldSource + ?Sized> FieldSourceExt for T {}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, ReplayError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ReplayError::MalformedField {
            name,
            value: value.to_string(),
        })
}

/// Owned name/value map implementing [FieldSource]. This is the bridge from
/// any dissector output (tshark JSON, test fixtures) into the analyzer.
#[derive(Debug, Default, Clone)]
pub struct FieldMap {
    fields: BTreeMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder-style insert for fixture construction.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        FieldMap {
            fields: iter.into_iter().collect(),
        }
    }
}

impl FieldSource for FieldMap {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}
