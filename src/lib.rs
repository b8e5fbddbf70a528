//! Avro Mail RPC - a remote procedure call round trip for a mail-sending service
//!
//! This library serves a one-method mail service over HTTP and calls it
//! through a client side proxy. The calls travel as Avro IPC requests, so
//! the handshake, call framing and encoding follow the Avro specification.
//!
//! ## Main Components
//!
//! - `service`: The `MailService` contract and `MailServiceImpl`, the handler
//!   that describes the message it was given.
//!
//! - `http`: HTTP server that binds a port, serves an IPC responder and can be
//!   shut down explicitly.
//!
//! - `transport`: Transceivers carrying requests to a responder, over HTTP or
//!   in process.
//!
//! - `client`: `MailServiceClient`, the proxy implementing `MailService` on
//!   top of a transceiver.
//!
//! - `protocol`: Avro binary encoding, the IPC handshake and framing, and the
//!   mail protocol handlers.
//!
//! - `config`: Command line configuration of the `mail-roundtrip` program.
//!
//! ## Usage
//!
//! Bind an `HttpServer` with a `MailService` implementation, start it, and
//! point a `MailServiceClient<HttpTransceiver>` at its address.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod protocol;
pub mod service;
pub mod transport;

pub use error::RpcError;
pub use protocol::avro;
pub use protocol::avro::mail::{Attachment, Message};
