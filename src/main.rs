use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use avro_mail_rpc::client::MailServiceClient;
use avro_mail_rpc::config::DemoConfig;
use avro_mail_rpc::http::HttpServer;
use avro_mail_rpc::service::{MailService, MailServiceImpl};
use avro_mail_rpc::transport::HttpTransceiver;
use avro_mail_rpc::{Attachment, Message};

/// Starts a server, attaches a client and sends one message
///
/// Every step runs in sequence; the first failure ends the program with a
/// non-zero status. A server left running by an early failure is shut down
/// when it is dropped.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DemoConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,avro_mail_rpc=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("Starting server");
    // usually the server would be another process
    let mut server = HttpServer::bind(&config.bind_addr(), Arc::new(MailServiceImpl)).await?;
    server.start()?;
    println!("Server started");

    let port = server.get_listen_port();
    if let Some(target) = config.target_port_mismatch(port) {
        warn!("Client targets port {} but the server listens on {}", target, port);
    }
    let proxy = MailServiceClient::new(HttpTransceiver::new(&config.client_url(port))?)?;
    println!("Client built, got proxy");

    let message = Message {
        to: "info@abc.com".to_string(),
        from: "remo@github.com".to_string(),
        body: "Hello abc!\nSome new text ...".to_string(),
        attachments: vec![Attachment::new("first", 66), Attachment::new("second", 234)],
    };

    println!("Calling proxy.send with message:  {message}");
    println!("### CLIENT: Response: {}", proxy.send(message).await?);

    proxy.close().await?;
    server.close().await?;
    Ok(())
}
