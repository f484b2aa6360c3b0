//! Entitlement lists embedded in message payloads.
//!
//! Layout (little-endian):
//!
//! ```text
//! u16 version | u16 flags | u32 count | u64 byte count
//! count x (u32 topic_len | u32 filter_len | topic | filter)
//! ```
//!
//! Only version 1 with flags 1 is understood.

use crate::bytes::ByteReader;
use crate::error::{CodecError, CodecResult};
use serde::Serialize;

const ENTITLEMENT_HEADER_LEN: usize = 16;

/// One entitled topic and its content filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entitlement {
    /// Topic (or topic regex).
    pub topic: String,
    /// Content filter.
    pub filter: String,
}

#[derive(Serialize)]
struct EntitlementDocument<'a> {
    entitlement: &'a [Entitlement],
}

/// Parses an entitlement list.
///
/// Returns an empty list when the header announces another version, other
/// flags or no entries. Topic and filter bytes that are not UTF-8 are
/// converted lossily.
///
/// # Errors
///
/// Returns `MalformedRecord` if an entry runs past the end of `bytes`.
pub fn parse_entitlements(bytes: &[u8]) -> CodecResult<Vec<Entitlement>> {
    let malformed = |err: CodecError| CodecError::malformed(0, format!("entitlement list: {err}"));

    if bytes.len() < ENTITLEMENT_HEADER_LEN {
        return Ok(Vec::new());
    }
    let mut reader = ByteReader::new(bytes);
    let version = reader.read_u16().map_err(malformed)?;
    let flags = reader.read_u16().map_err(malformed)?;
    let count = reader.read_u32().map_err(malformed)?;
    let _byte_count = reader.read_u64().map_err(malformed)?;

    if version != 1 || flags != 1 || count == 0 {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for _ in 0..count {
        let topic_len = reader.read_u32().map_err(malformed)? as usize;
        let filter_len = reader.read_u32().map_err(malformed)? as usize;
        let topic = reader.read_bytes(topic_len).map_err(malformed)?;
        let filter = reader.read_bytes(filter_len).map_err(malformed)?;
        entries.push(Entitlement {
            topic: String::from_utf8_lossy(topic).into_owned(),
            filter: String::from_utf8_lossy(filter).into_owned(),
        });
    }
    Ok(entries)
}

/// Renders an entitlement list as `{"entitlement":[{"topic":..,"filter":..}]}`.
///
/// Returns an empty string when the payload holds no entitlements.
///
/// # Errors
///
/// Returns `MalformedRecord` if an entry runs past the end of `bytes`.
pub fn render_entitlements(bytes: &[u8]) -> CodecResult<String> {
    let entries = parse_entitlements(bytes)?;
    if entries.is_empty() {
        return Ok(String::new());
    }
    serde_json::to_string(&EntitlementDocument {
        entitlement: &entries,
    })
    .map_err(|err| CodecError::malformed(0, format!("entitlement list: {err}")))
}
