//! Records exchanged at the start of every Avro IPC request and response.
//!
//! The handshake lets each side learn the other's protocol by its MD5
//! fingerprint, sending the full protocol text only when the peer does not
//! know it yet.
//!
//! <https://avro.apache.org/docs/1.11.1/specification/#handshake>

// Keep the schema's symbol names
#![allow(clippy::upper_case_acronyms)]

use std::collections::BTreeMap;

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// 16 byte MD5 fingerprint of a protocol's JSON text (`fixed` named `MD5`).
pub type MD5 = [u8; 16];

/// Call and response metadata, `map<bytes>`.
pub type Metadata = BTreeMap<String, Vec<u8>>;

/// Sent by the client before every call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// Fingerprint of the client's protocol
    pub client_hash: MD5,
    /// Full client protocol text, only sent when the server asked for it
    pub client_protocol: Option<String>,
    /// Fingerprint of the protocol the client believes the server speaks
    pub server_hash: MD5,
    pub meta: Option<Metadata>,
}
DeserializeStruct!(HandshakeRequest, client_hash, client_protocol, server_hash, meta);
SerializeStruct!(HandshakeRequest, client_hash, client_protocol, server_hash, meta);

/// Outcome of matching the client's view of both protocols.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum HandshakeMatch {
    /// Both hashes are known and current
    #[default]
    BOTH = 0,
    /// Client protocol is known, but the client holds a stale server hash
    CLIENT = 1,
    /// Client protocol is unknown; the call was not processed
    NONE = 2,
}
impl SerializeEnum for HandshakeMatch {}
impl DeserializeEnum for HandshakeMatch {}

/// Sent by the server in front of every response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// Named `match` in the schema
    pub matched: HandshakeMatch,
    pub server_protocol: Option<String>,
    pub server_hash: Option<MD5>,
    pub meta: Option<Metadata>,
}
DeserializeStruct!(HandshakeResponse, matched, server_protocol, server_hash, meta);
SerializeStruct!(HandshakeResponse, matched, server_protocol, server_hash, meta);

impl HandshakeResponse {
    /// Response for a client whose protocol and server hash are both current
    pub fn both() -> HandshakeResponse {
        HandshakeResponse { matched: HandshakeMatch::BOTH, ..Default::default() }
    }

    /// Response carrying the server's protocol, for `CLIENT` and `NONE`
    pub fn with_server_protocol(
        matched: HandshakeMatch,
        protocol_text: &str,
        hash: MD5,
    ) -> HandshakeResponse {
        HandshakeResponse {
            matched,
            server_protocol: Some(protocol_text.to_string()),
            server_hash: Some(hash),
            meta: None,
        }
    }
}
