//! Protocol module implements the wire side of the mail RPC.
//!
//! This module contains three main components:
//!
//! - `avro`: Avro binary encoding and decoding of the records exchanged,
//!   including the IPC handshake records and the mail protocol's records.
//!
//! - `ipc`: The Avro IPC protocol: message framing, the handshake that
//!   exchanges protocol fingerprints, call encoding and dispatching on the
//!   responder side, and the requestor used by clients.
//!
//! - `mail`: Handlers of the `IMailService` messages, called by the IPC
//!   dispatcher once a call has been decoded.

pub mod avro;
pub mod ipc;
pub mod mail;
