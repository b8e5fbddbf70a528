//! Per-request state handed to the IPC dispatcher and protocol handlers.

use std::fmt;
use std::sync::Arc;

use crate::protocol::avro::handshake::MD5;
use crate::protocol::ipc::{Protocol, ProtocolCache};
use crate::service::MailService;

/// Represents the execution context of one IPC request
///
/// Built by the [`super::Responder`] for every incoming request. It carries
/// the identity of the caller, the protocol this side speaks, the shared
/// cache of client protocols and the service implementation the call is
/// dispatched to.
#[derive(Clone)]
pub struct Context {
    /// Caller's network address (IP:port), or a fixed tag for in-process calls
    pub client_addr: String,

    /// Protocol served locally
    pub protocol: Arc<Protocol>,

    /// Canonical text of `protocol`, sent to clients that do not know it
    pub protocol_text: Arc<String>,

    /// Fingerprint of `protocol_text`
    pub protocol_hash: MD5,

    /// Client protocols already seen, shared by all requests of a responder
    pub protocol_cache: Arc<ProtocolCache>,

    /// Implementation receiving the decoded calls
    pub service: Arc<dyn MailService>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ipc::Context")
            .field("client_addr", &self.client_addr)
            .field("protocol", &self.protocol.full_name())
            .finish()
    }
}
