//! The mail service contract shared by the server side handler and the
//! client side proxy.
//!
//! This module provides:
//! - The `MailService` trait, the one-method contract of the `IMailService` protocol
//! - `MailServiceImpl`, the handler served by the demo server
//!
//! Implement [`MailService`] and hand it to [`crate::http::HttpServer::bind`]
//! to expose it; [`crate::client::MailServiceClient`] implements the same
//! trait by forwarding calls over a transport.

use async_trait::async_trait;
use tracing::debug;

use crate::error::RpcError;
use crate::protocol::avro::mail::Message;

#[async_trait]
pub trait MailService: Send + Sync {
    /// Sends a message and returns a human readable description of what
    /// was sent.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to send; its attachments travel with it
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Description produced by the handler
    /// * `Err(RpcError)` - The call could not be completed; for a remote
    ///   handler this includes transport and handshake failures
    async fn send(&self, message: Message) -> Result<String, RpcError>;
}

/// Handler that only describes the message it was given.
#[derive(Clone, Copy, Debug, Default)]
pub struct MailServiceImpl;

impl MailServiceImpl {
    /// Text returned by `send`. Attachments never appear in it.
    pub fn describe(message: &Message) -> String {
        format!(
            "Sending message to {} from {} with body {}",
            message.to, message.from, message.body
        )
    }
}

#[async_trait]
impl MailService for MailServiceImpl {
    async fn send(&self, message: Message) -> Result<String, RpcError> {
        println!("### SERVER: Sending message");
        debug!("send to {} with {} attachments", message.to, message.attachments.len());
        Ok(MailServiceImpl::describe(&message))
    }
}
