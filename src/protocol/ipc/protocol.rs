//! Avro protocol declarations.
//!
//! A protocol is a JSON document naming the record types and messages a
//! service speaks. Both ends of a connection fingerprint their protocol
//! text with MD5 and exchange those fingerprints during the handshake.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::avro::handshake::MD5;

/// Name of the only message of the mail protocol
pub const SEND_MESSAGE: &str = "send";

/// A named parameter of a message request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub schema: Value,
}

/// Declaration of one message: its request parameters, response schema
/// and declared errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageDecl {
    #[serde(default)]
    pub request: Vec<Field>,
    pub response: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
    #[serde(rename = "one-way", default, skip_serializing_if = "std::ops::Not::not")]
    pub one_way: bool,
}

/// Serde model of an Avro protocol document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub types: Vec<Value>,
    #[serde(default)]
    pub messages: BTreeMap<String, MessageDecl>,
}

impl Protocol {
    /// The `IMailService` protocol served by [`crate::service::MailServiceImpl`].
    pub fn mail() -> Protocol {
        let attachment = json!({
            "type": "record",
            "name": "Attachment",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "size", "type": "int"}
            ]
        });
        let message = json!({
            "type": "record",
            "name": "Message",
            "fields": [
                {"name": "to", "type": "string"},
                {"name": "from", "type": "string"},
                {"name": "body", "type": "string"},
                {"name": "attachments", "type": {"type": "array", "items": "Attachment"}}
            ]
        });
        let send = MessageDecl {
            request: vec![Field { name: "message".to_string(), schema: json!("Message") }],
            response: json!("string"),
            errors: Vec::new(),
            one_way: false,
        };

        Protocol {
            protocol: "IMailService".to_string(),
            namespace: Some("example.proto".to_string()),
            types: vec![attachment, message],
            messages: BTreeMap::from([(SEND_MESSAGE.to_string(), send)]),
        }
    }

    /// Parses a peer's protocol text.
    pub fn parse(text: &str) -> serde_json::Result<Protocol> {
        serde_json::from_str(text)
    }

    /// Canonical JSON text, the input of [`Protocol::hash`].
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// MD5 fingerprint of the protocol text.
    pub fn hash(&self) -> serde_json::Result<MD5> {
        Ok(fingerprint(&self.to_json()?))
    }

    pub fn message(&self, name: &str) -> Option<&MessageDecl> {
        self.messages.get(name)
    }

    /// Namespace-qualified protocol name
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{}", self.protocol),
            None => self.protocol.clone(),
        }
    }
}

/// MD5 of an already serialized protocol text.
pub fn fingerprint(text: &str) -> MD5 {
    Md5::digest(text.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_protocol_round_trips_through_json() {
        let protocol = Protocol::mail();
        let text = protocol.to_json().unwrap();
        let parsed = Protocol::parse(&text).unwrap();

        assert_eq!(parsed, protocol);
        assert_eq!(parsed.hash().unwrap(), protocol.hash().unwrap());
        assert_eq!(protocol.full_name(), "example.proto.IMailService");
    }

    #[test]
    fn send_is_declared_as_two_way() {
        let protocol = Protocol::mail();
        let send = protocol.message(SEND_MESSAGE).expect("send declared");

        assert_eq!(send.request.len(), 1);
        assert_eq!(send.request[0].name, "message");
        assert_eq!(send.response, json!("string"));
        assert!(!send.one_way);
        assert!(protocol.message("receive").is_none());
    }

    #[test]
    fn fingerprint_matches_known_md5() {
        // RFC 1321 test suite
        assert_eq!(
            fingerprint("abc"),
            [
                0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28,
                0xe1, 0x7f, 0x72
            ]
        );
    }
}
