//! Client side proxy for the mail service.

use async_trait::async_trait;

use crate::error::RpcError;
use crate::protocol::avro::mail::{Message, SendRequest};
use crate::protocol::ipc::{Protocol, Requestor, SEND_MESSAGE};
use crate::service::MailService;
use crate::transport::Transceiver;

/// Stand-in for a remote [`MailService`]
///
/// Every call is encoded, sent over the transceiver and awaited; the
/// decoded response is returned as if the service were local.
///
/// ```
/// let proxy = MailServiceClient::new(HttpTransceiver::new("http://127.0.0.1:65111")?)?;
/// let response = proxy.send(message).await?;
/// ```
pub struct MailServiceClient<T: Transceiver> {
    requestor: Requestor<T>,
}

impl<T: Transceiver> MailServiceClient<T> {
    pub fn new(transceiver: T) -> Result<MailServiceClient<T>, RpcError> {
        Ok(MailServiceClient { requestor: Requestor::new(Protocol::mail(), transceiver)? })
    }

    /// Server protocol, known after the first successful call
    pub fn remote_protocol(&self) -> Option<std::sync::Arc<Protocol>> {
        self.requestor.remote()
    }

    /// Releases the underlying transceiver
    pub async fn close(&self) -> Result<(), RpcError> {
        self.requestor.transceiver().close().await
    }
}

#[async_trait]
impl<T: Transceiver> MailService for MailServiceClient<T> {
    async fn send(&self, message: Message) -> Result<String, RpcError> {
        self.requestor.request(SEND_MESSAGE, &SendRequest { message }).await
    }
}
