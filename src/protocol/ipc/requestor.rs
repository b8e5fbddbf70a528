//! Client side of the IPC protocol.
//!
//! A [`Requestor`] turns a message name and its parameters into a request
//! payload, pushes it through a [`Transceiver`] and decodes the response.
//! It drives the handshake: the client protocol text is only attached
//! after the server answered `NONE`, and the server protocol learned from a
//! `CLIENT` or `NONE` answer is remembered for later calls.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::RpcError;
use crate::protocol::avro::handshake::{
    HandshakeMatch, HandshakeRequest, HandshakeResponse, Metadata, MD5,
};
use crate::protocol::avro::{deserialize, read_long, Deserialize, Serialize};
use crate::protocol::ipc::{self, Protocol};
use crate::transport::Transceiver;

/// Server protocol as learned through the handshake
struct RemoteProtocol {
    hash: MD5,
    protocol: Arc<Protocol>,
}

pub struct Requestor<T: Transceiver> {
    transceiver: T,
    local: Protocol,
    local_text: String,
    local_hash: MD5,
    remote: RwLock<Option<RemoteProtocol>>,
    /// Set once the server asked for the client protocol text
    send_local_text: AtomicBool,
}

impl<T: Transceiver> Requestor<T> {
    pub fn new(local: Protocol, transceiver: T) -> Result<Requestor<T>, RpcError> {
        let local_text = local.to_json()?;
        let local_hash = ipc::fingerprint(&local_text);
        Ok(Requestor {
            transceiver,
            local,
            local_text,
            local_hash,
            remote: RwLock::new(None),
            send_local_text: AtomicBool::new(false),
        })
    }

    pub fn transceiver(&self) -> &T {
        &self.transceiver
    }

    /// Server protocol, once a handshake told us about it
    pub fn remote(&self) -> Option<Arc<Protocol>> {
        let remote = self.remote.read().unwrap_or_else(|e| e.into_inner());
        remote.as_ref().map(|r| r.protocol.clone())
    }

    /// Performs one call and waits for its response
    ///
    /// A `NONE` handshake answer resends the same call once, now carrying
    /// the client protocol text. There is no timeout and no other retry.
    ///
    /// # Arguments
    ///
    /// * `message_name` - Message declared by the local protocol
    /// * `params` - Parameters record of that message
    pub async fn request<P, R>(&self, message_name: &str, params: &P) -> Result<R, RpcError>
    where
        P: Serialize + Sync,
        R: Deserialize + Default,
    {
        if self.local.message(message_name).is_none() {
            return Err(RpcError::UnknownMessage(message_name.to_string()));
        }

        let mut call = Vec::new();
        Metadata::new().serialize(&mut call)?;
        message_name.serialize(&mut call)?;
        params.serialize(&mut call)?;

        for _ in 0..2 {
            let mut payload = Vec::with_capacity(call.len() + 64);
            self.handshake_request().serialize(&mut payload)?;
            payload.extend_from_slice(&call);

            debug!("Calling {} on {}", message_name, self.transceiver.remote_name());
            let response = self.transceiver.transceive(vec![payload]).await?.concat();
            let mut input = Cursor::new(response);
            let handshake = deserialize::<HandshakeResponse>(&mut input)?;
            if self.process_handshake(handshake)? {
                return read_response(&mut input);
            }
        }

        Err(RpcError::Handshake(format!(
            "server {} does not accept protocol {}",
            self.transceiver.remote_name(),
            self.local.full_name()
        )))
    }

    fn handshake_request(&self) -> HandshakeRequest {
        let remote = self.remote.read().unwrap_or_else(|e| e.into_inner());
        let send_local_text = self.send_local_text.load(Ordering::SeqCst);
        HandshakeRequest {
            client_hash: self.local_hash,
            client_protocol: send_local_text.then(|| self.local_text.clone()),
            // until told otherwise, assume the server speaks our protocol
            server_hash: remote.as_ref().map_or(self.local_hash, |r| r.hash),
            meta: None,
        }
    }

    /// Applies a handshake answer. Returns whether a call result follows.
    fn process_handshake(&self, response: HandshakeResponse) -> Result<bool, RpcError> {
        match response.matched {
            HandshakeMatch::BOTH => {
                self.send_local_text.store(false, Ordering::SeqCst);
                Ok(true)
            }
            HandshakeMatch::CLIENT => {
                self.set_remote(response)?;
                self.send_local_text.store(false, Ordering::SeqCst);
                Ok(true)
            }
            HandshakeMatch::NONE => {
                debug!("Server {} does not know our protocol", self.transceiver.remote_name());
                self.set_remote(response)?;
                self.send_local_text.store(true, Ordering::SeqCst);
                Ok(false)
            }
        }
    }

    fn set_remote(&self, response: HandshakeResponse) -> Result<(), RpcError> {
        let (Some(text), Some(hash)) = (response.server_protocol, response.server_hash) else {
            return Err(RpcError::Handshake(format!(
                "{:?} answer without server protocol",
                response.matched
            )));
        };
        let protocol = Protocol::parse(&text)?;
        if protocol.protocol != self.local.protocol {
            warn!(
                "Server speaks {} while we speak {}",
                protocol.full_name(),
                self.local.full_name()
            );
        }
        let mut remote = self.remote.write().unwrap_or_else(|e| e.into_inner());
        *remote = Some(RemoteProtocol { hash, protocol: Arc::new(protocol) });
        Ok(())
    }
}

/// Reads the call result that follows a `BOTH` or `CLIENT` handshake
fn read_response<R: Deserialize + Default>(input: &mut Cursor<Vec<u8>>) -> Result<R, RpcError> {
    let _meta = deserialize::<Metadata>(input)?;
    if !deserialize::<bool>(input)? {
        return Ok(deserialize::<R>(input)?);
    }

    match read_long(input)? {
        0 => Err(RpcError::Remote(deserialize::<String>(input)?)),
        branch => Err(RpcError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Undeclared error union branch {branch}"),
        ))),
    }
}
