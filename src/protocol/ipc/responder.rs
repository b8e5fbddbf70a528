//! Server side of the IPC protocol, independent of any transport.

use std::io::Cursor;
use std::sync::Arc;

use tracing::debug;

use crate::error::RpcError;
use crate::protocol::avro::handshake::MD5;
use crate::protocol::ipc::{self, Protocol, ProtocolCache};
use crate::service::MailService;

/// Serves IPC requests for one service implementation
///
/// Holds the local protocol with its precomputed text and fingerprint, and
/// the cache of client protocols learned through handshakes. Transports
/// pass it the de-framed request payload and frame whatever it returns.
pub struct Responder {
    protocol: Arc<Protocol>,
    protocol_text: Arc<String>,
    protocol_hash: MD5,
    protocol_cache: Arc<ProtocolCache>,
    service: Arc<dyn MailService>,
}

impl Responder {
    /// Creates a responder speaking the mail protocol
    pub fn new(service: Arc<dyn MailService>) -> Result<Responder, RpcError> {
        Responder::with_protocol(Protocol::mail(), service)
    }

    pub fn with_protocol(
        protocol: Protocol,
        service: Arc<dyn MailService>,
    ) -> Result<Responder, RpcError> {
        let protocol_text = protocol.to_json()?;
        let protocol_hash = ipc::fingerprint(&protocol_text);
        Ok(Responder {
            protocol: Arc::new(protocol),
            protocol_text: Arc::new(protocol_text),
            protocol_hash,
            protocol_cache: Arc::new(ProtocolCache::new()),
            service,
        })
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn protocol_hash(&self) -> MD5 {
        self.protocol_hash
    }

    /// Number of distinct client protocols seen so far
    pub fn known_clients(&self) -> usize {
        self.protocol_cache.len()
    }

    /// Processes one request payload and returns the response payload
    ///
    /// # Arguments
    ///
    /// * `request` - Concatenated buffers of the request frame
    /// * `client_addr` - Caller identity used for logging
    pub async fn respond(
        &self,
        request: &[u8],
        client_addr: &str,
    ) -> Result<Vec<u8>, anyhow::Error> {
        let context = ipc::Context {
            client_addr: client_addr.to_string(),
            protocol: self.protocol.clone(),
            protocol_text: self.protocol_text.clone(),
            protocol_hash: self.protocol_hash,
            protocol_cache: self.protocol_cache.clone(),
            service: self.service.clone(),
        };
        debug!("Responding to {} byte request from {}", request.len(), client_addr);

        let mut input = Cursor::new(request);
        let mut output = Vec::with_capacity(ipc::DEFAULT_RESPONSE_BUFFER_CAPACITY);
        ipc::handle_ipc(&mut input, &mut output, context).await?;
        Ok(output)
    }
}
