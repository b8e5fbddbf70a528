//! Transceivers carry a request frame to a responder and bring back its
//! response.
//!
//! - [`HttpTransceiver`] POSTs each request to a URL, one HTTP exchange per call
//! - [`LocalTransceiver`] hands requests to an in-process [`Responder`]
//!
//! Both are stateless between calls, so every request carries a handshake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::{debug, trace};

use crate::error::RpcError;
use crate::protocol::ipc::{self, Responder};

/// Network channel used by a [`crate::protocol::ipc::Requestor`].
#[async_trait]
pub trait Transceiver: Send + Sync {
    /// Human readable name of the peer, for logging
    fn remote_name(&self) -> String;

    /// Sends the request buffers and waits for the response buffers
    async fn transceive(&self, request: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, RpcError>;

    /// Releases the transport. Later calls fail with [`RpcError::Closed`].
    ///
    /// Closing twice is a no-op.
    async fn close(&self) -> Result<(), RpcError>;
}

/// HTTP transceiver posting framed requests with `Content-Type: avro/binary`.
pub struct HttpTransceiver {
    client: reqwest::Client,
    url: Url,
    closed: AtomicBool,
}

impl HttpTransceiver {
    /// Creates a transceiver for the given endpoint URL
    ///
    /// No connection is made until the first call.
    pub fn new(url: &str) -> Result<HttpTransceiver, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(HttpTransceiver { client: reqwest::Client::new(), url, closed: AtomicBool::new(false) })
    }
}

#[async_trait]
impl Transceiver for HttpTransceiver {
    fn remote_name(&self) -> String {
        self.url.to_string()
    }

    async fn transceive(&self, request: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        let mut body = Vec::new();
        ipc::write_frame(&request, &mut body)?;
        trace!("POST {} ({} bytes)", self.url, body.len());

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, ipc::AVRO_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Http { status: status.as_u16(), body });
        }

        let bytes = response.bytes().await?;
        Ok(ipc::read_frame(&mut &bytes[..])?)
    }

    async fn close(&self) -> Result<(), RpcError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed transceiver for {}", self.url);
        }
        Ok(())
    }
}

/// In-process transceiver: no network, no framing.
pub struct LocalTransceiver {
    responder: Arc<Responder>,
    closed: AtomicBool,
}

impl LocalTransceiver {
    pub fn new(responder: Arc<Responder>) -> LocalTransceiver {
        LocalTransceiver { responder, closed: AtomicBool::new(false) }
    }
}

#[async_trait]
impl Transceiver for LocalTransceiver {
    fn remote_name(&self) -> String {
        "local".to_string()
    }

    async fn transceive(&self, request: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>, RpcError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RpcError::Closed);
        }

        let response = self
            .responder
            .respond(&request.concat(), "local")
            .await
            .map_err(|e| RpcError::Rejected(format!("{e:#}")))?;
        Ok(vec![response])
    }

    async fn close(&self) -> Result<(), RpcError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
