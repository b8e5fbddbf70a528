//! Avro IPC: remote procedure calls between a requestor and a responder
//! that exchange Avro encoded messages.
//!
//! This module implements the parts of the IPC specification needed for a
//! stateless transport such as HTTP:
//!
//! 1. Message framing with length prefixed buffers
//! 2. The protocol handshake, with protocol fingerprints cached by the responder
//! 3. Call and response encoding, including system errors
//! 4. Dispatching of calls to the protocol handler
//!
//! <https://avro.apache.org/docs/1.11.1/specification/#protocol-wire-format>

mod context;
pub mod protocol;
mod protocol_cache;
mod requestor;
mod responder;
mod wire;

pub use context::Context;
pub use protocol::{fingerprint, Protocol, SEND_MESSAGE};
pub use protocol_cache::ProtocolCache;
pub use requestor::Requestor;
pub use responder::Responder;
pub use wire::{handle_ipc, read_frame, write_frame, BUFFER_SIZE};

/// Upper bound on the payload of a single frame
pub const MAX_FRAME_PAYLOAD_LENGTH: usize = 16 * 1024 * 1024;

/// MIME type of framed IPC payloads over HTTP
pub const AVRO_CONTENT_TYPE: &str = "avro/binary";

/// Initial size of the response buffer
const DEFAULT_RESPONSE_BUFFER_CAPACITY: usize = 1024;
