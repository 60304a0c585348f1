/*!
NLRI extraction from the BGP PDU embedded in a RouteMonitoring message.

The PDU grammar is disambiguated in strict priority order over the two
byte-length fields (withdrawn routes, path attributes):

1. both zero: explicit End-of-RIB marker;
2. withdrawn only: plain withdraw;
3. attributes only: update-bearing PDU, branched on the leading
   path-attribute type code (plain NLRI, MP_REACH, MP_UNREACH) — where an
   MP_UNREACH attribute resolving no prefix is an *implicit* End-of-RIB,
   not an error;
4. both non-zero: unsupported.

Order matters: the MP_UNREACH branch must see an empty prefix before any
error path does.
*/
use crate::error::ReplayError;
use crate::fields::{names, FieldSource, FieldSourceExt};
use crate::models::{BgpPduType, ClassifiedMessage, Nlri};
use log::debug;

/// ORIGIN, the mandatory first attribute of a plain IPv4 update.
const ATTR_ORIGIN: u8 = 1;
/// MP_REACH_NLRI, RFC 4760.
const ATTR_MP_REACH_NLRI: u8 = 14;
/// MP_UNREACH_NLRI, RFC 4760.
const ATTR_MP_UNREACH_NLRI: u8 = 15;

/// What to do with an MP_UNREACH attribute that resolves no prefix.
///
/// Routers emit such PDUs as End-of-RIB markers, but a capture produced by
/// a broken speaker could contain one that is simply malformed; which
/// reading applies is a property of the capture, so it is configured
/// rather than hardcoded.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub enum EmptyUnreachPolicy {
    /// Treat it as an End-of-RIB marker (what routers actually send).
    #[default]
    ImplicitEndOfRib,
    /// Treat it as malformed input.
    Reject,
}

/// Extract the normalized NLRI and PDU kind from a RouteMonitoring
/// message. Callers must filter on the message type first.
pub fn extract_nlri(
    msg: &ClassifiedMessage,
    empty_unreach: EmptyUnreachPolicy,
) -> Result<(Nlri, BgpPduType), ReplayError> {
    let withdrawn_len = msg.require_u64(names::WITHDRAWN_ROUTES_LENGTH)?;
    let attributes_len = msg.require_u64(names::PATH_ATTRIBUTES_LENGTH)?;

    match (withdrawn_len, attributes_len) {
        (0, 0) => Ok((Nlri::end_of_rib(), BgpPduType::EndOfRib)),
        (_, 0) => extract_plain_withdraw(msg),
        (0, _) => extract_update_pdu(msg, empty_unreach),
        (_, _) => Err(ReplayError::MixedUpdateWithdraw),
    }
}

fn extract_plain_withdraw(msg: &ClassifiedMessage) -> Result<(Nlri, BgpPduType), ReplayError> {
    let prefix = msg.require(names::WITHDRAWN_PREFIX)?.to_string();
    let prefix_len = require_prefix_len(msg, names::WITHDRAWN_PREFIX_LENGTH)?;
    Ok((
        Nlri {
            prefix,
            prefix_len,
            path_id: msg.u64_or(names::NLRI_PATH_ID, 0)? as u32,
            route_distinguisher: rd_or_empty(msg),
        },
        BgpPduType::Withdraw,
    ))
}

fn extract_update_pdu(
    msg: &ClassifiedMessage,
    empty_unreach: EmptyUnreachPolicy,
) -> Result<(Nlri, BgpPduType), ReplayError> {
    let type_code = msg.require_u64(names::PATH_ATTRIBUTE_TYPE_CODE)?;
    let type_code = u8::try_from(type_code).map_err(|_| ReplayError::MalformedField {
        name: names::PATH_ATTRIBUTE_TYPE_CODE,
        value: type_code.to_string(),
    })?;

    match type_code {
        ATTR_ORIGIN => {
            let prefix = msg.require(names::NLRI_PREFIX)?.to_string();
            let prefix_len = require_prefix_len(msg, names::NLRI_PREFIX_LENGTH)?;
            Ok((
                Nlri {
                    prefix,
                    prefix_len,
                    path_id: msg.u64_or(names::NLRI_PATH_ID, 0)? as u32,
                    route_distinguisher: rd_or_empty(msg),
                },
                BgpPduType::Update,
            ))
        }
        ATTR_MP_REACH_NLRI => {
            let raw = msg
                .first_of(&names::MP_REACH_PREFIX_CANDIDATES)
                .ok_or(ReplayError::MissingField(
                    names::MP_REACH_PREFIX_CANDIDATES[0],
                ))?;
            let (prefix, prefix_len) =
                resolve_prefix_and_len(msg, raw, names::MP_REACH_PREFIX_LENGTH)?;
            Ok((
                Nlri {
                    prefix,
                    prefix_len,
                    path_id: msg.u64_or(names::NLRI_PATH_ID, 0)? as u32,
                    route_distinguisher: rd_or_empty(msg),
                },
                BgpPduType::Update,
            ))
        }
        ATTR_MP_UNREACH_NLRI => {
            let Some(raw) = msg.first_of(&names::MP_UNREACH_PREFIX_CANDIDATES) else {
                // no prefix resolves: the speaker used MP_UNREACH as an
                // End-of-RIB marker for its AFI/SAFI
                return match empty_unreach {
                    EmptyUnreachPolicy::ImplicitEndOfRib => {
                        debug!("empty MP_UNREACH treated as End-of-RIB {}", msg.location);
                        Ok((Nlri::end_of_rib(), BgpPduType::EndOfRib))
                    }
                    EmptyUnreachPolicy::Reject => Err(ReplayError::EmptyMpUnreach),
                };
            };
            let (prefix, prefix_len) =
                resolve_prefix_and_len(msg, raw, names::MP_UNREACH_PREFIX_LENGTH)?;
            Ok((
                Nlri {
                    prefix,
                    prefix_len,
                    path_id: msg.u64_or(names::NLRI_PATH_ID, 0)? as u32,
                    route_distinguisher: rd_or_empty(msg),
                },
                BgpPduType::Withdraw,
            ))
        }
        other => Err(ReplayError::UnsupportedPathAttributeType(other)),
    }
}

fn rd_or_empty(msg: &ClassifiedMessage) -> String {
    msg.field(names::NLRI_ROUTE_DISTINGUISHER)
        .unwrap_or_default()
        .to_string()
}

fn require_prefix_len(msg: &ClassifiedMessage, name: &'static str) -> Result<u8, ReplayError> {
    let value = msg.require_u64(name)?;
    u8::try_from(value).map_err(|_| ReplayError::MalformedField {
        name,
        value: value.to_string(),
    })
}

/// Resolve a multiprotocol prefix to its address part and length: the
/// explicit length field wins when present, otherwise the length is parsed
/// from the trailing `/len` suffix of the prefix string. The returned
/// prefix is always stripped of the suffix.
fn resolve_prefix_and_len(
    msg: &ClassifiedMessage,
    raw_prefix: &str,
    len_field: &'static str,
) -> Result<(String, u8), ReplayError> {
    let (address, suffix) = match raw_prefix.rsplit_once('/') {
        Some((address, suffix)) => (address, Some(suffix)),
        None => (raw_prefix, None),
    };

    if msg.has_field(len_field) {
        return Ok((address.to_string(), require_prefix_len(msg, len_field)?));
    }

    let suffix = suffix.ok_or(ReplayError::MissingField(len_field))?;
    let prefix_len = suffix
        .parse::<u8>()
        .map_err(|_| ReplayError::MalformedField {
            name: len_field,
            value: raw_prefix.to_string(),
        })?;
    Ok((address.to_string(), prefix_len))
}
