//! Remote protocols known to a responder, keyed by fingerprint.
//!
//! A client sends its protocol text only once; afterwards it is identified
//! by the MD5 hash alone. Entries live as long as the responder.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::protocol::avro::handshake::MD5;
use crate::protocol::ipc::Protocol;

#[derive(Default)]
pub struct ProtocolCache {
    protocols: RwLock<HashMap<MD5, Arc<Protocol>>>,
}

impl ProtocolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &MD5) -> Option<Arc<Protocol>> {
        let protocols = self.protocols.read().unwrap_or_else(|e| e.into_inner());
        protocols.get(hash).cloned()
    }

    /// Registers a protocol under the hash the client announced for it.
    pub fn insert(&self, hash: MD5, protocol: Arc<Protocol>) {
        let mut protocols = self.protocols.write().unwrap_or_else(|e| e.into_inner());
        protocols.insert(hash, protocol);
    }

    pub fn len(&self) -> usize {
        self.protocols.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
