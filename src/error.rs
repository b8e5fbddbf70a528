//! Errors surfaced to callers of the RPC client and transports.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid endpoint URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("server answered HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("message {0} is not declared by the local protocol")]
    UnknownMessage(String),

    #[error("request rejected by responder: {0}")]
    Rejected(String),

    /// A system error raised on the remote side while serving the call
    #[error("remote error: {0}")]
    Remote(String),

    #[error("transceiver is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RpcError>;
