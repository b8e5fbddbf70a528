// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use avro_mail_rpc::client::MailServiceClient;
use avro_mail_rpc::http::HttpServer;
use avro_mail_rpc::service::{MailService, MailServiceImpl};
use avro_mail_rpc::transport::HttpTransceiver;
use avro_mail_rpc::{Attachment, Message, RpcError};

/// The message sent by the `mail-roundtrip` program
pub fn sample_message() -> Message {
    Message {
        to: "info@abc.com".to_string(),
        from: "remo@github.com".to_string(),
        body: "Hello abc!\nSome new text ...".to_string(),
        attachments: vec![Attachment::new("first", 66), Attachment::new("second", 234)],
    }
}

pub const SAMPLE_RESPONSE: &str =
    "Sending message to info@abc.com from remo@github.com with body Hello abc!\nSome new text ...";

/// Binds `MailServiceImpl` to a free loopback port and starts serving
pub async fn start_server() -> HttpServer {
    start_server_with(Arc::new(MailServiceImpl)).await
}

pub async fn start_server_with(service: Arc<dyn MailService>) -> HttpServer {
    let mut server = HttpServer::bind("127.0.0.1:0", service).await.expect("bind server");
    server.start().expect("start server");
    server
}

pub fn server_url(server: &HttpServer) -> String {
    format!("http://{}", server.local_addr())
}

/// Proxy posting to `url`
pub fn http_proxy(url: &str) -> MailServiceClient<HttpTransceiver> {
    MailServiceClient::new(HttpTransceiver::new(url).expect("valid url")).expect("build proxy")
}

/// Service whose every call fails
#[derive(Default)]
pub struct FailingService;

#[async_trait]
impl MailService for FailingService {
    async fn send(&self, _message: Message) -> Result<String, RpcError> {
        Err(RpcError::Io(io::Error::other("mailbox full")))
    }
}
