//! The HTTP module exposes an IPC [`Responder`] over HTTP.
//!
//! This module implements an HTTP server for the mail protocol that:
//! - Accepts `POST /` requests whose body is one IPC frame
//! - Hands the de-framed payload to the responder
//! - Answers with the framed response and `Content-Type: avro/binary`
//! - Starts and shuts down explicitly, so a caller controls its lifetime
//!
//! A body that is not a valid frame, or whose handshake cannot be decoded,
//! is answered with HTTP 400 and a plain text explanation.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::protocol::ipc::{self, Responder};
use crate::service::MailService;

/// HTTP server bound to a local address, serving one [`Responder`].
pub struct HttpServer {
    /// Bound listener, handed to the serving task by [`HttpServer::start`]
    listener: Option<TcpListener>,
    /// Address the listener is bound to
    local_addr: SocketAddr,
    responder: Arc<Responder>,
    /// Fires the graceful shutdown of the serving task
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<io::Result<()>>>,
}

/// Processes one HTTP request carrying an IPC frame
async fn handle_call(
    State(responder): State<Arc<Responder>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response {
    let client_addr = match connect_info {
        Some(ConnectInfo(addr)) => addr.to_string(),
        None => "unknown".to_string(),
    };

    let request = match ipc::read_frame(&mut &body[..]) {
        Ok(buffers) => buffers.concat(),
        Err(e) => {
            warn!("Malformed IPC frame from {}: {}", client_addr, e);
            return (StatusCode::BAD_REQUEST, format!("Malformed IPC frame: {e}")).into_response();
        }
    };

    let response = match responder.respond(&request, &client_addr).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Rejected request from {}: {:#}", client_addr, e);
            return (StatusCode::BAD_REQUEST, format!("{e:#}")).into_response();
        }
    };

    let mut framed = Vec::with_capacity(response.len() + 8);
    if let Err(e) = ipc::write_frame(&[response], &mut framed) {
        error!("Write error {:?}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    ([(header::CONTENT_TYPE, ipc::AVRO_CONTENT_TYPE)], framed).into_response()
}

impl HttpServer {
    /// Binds an HTTP server for the given service to an address
    ///
    /// # Arguments
    ///
    /// * `addr` - IP address and port in the format "IP:PORT" (e.g. "127.0.0.1:65111");
    ///   port 0 lets the OS pick a free port
    /// * `service` - Implementation receiving the calls
    ///
    /// # Returns
    ///
    /// The bound, not yet serving, server or the bind error. Nothing is retried.
    pub async fn bind(addr: &str, service: Arc<dyn MailService>) -> io::Result<HttpServer> {
        let responder = Responder::new(service).map_err(io::Error::other)?;
        HttpServer::bind_responder(addr, Arc::new(responder)).await
    }

    /// Binds an HTTP server for an already built responder
    pub async fn bind_responder(addr: &str, responder: Arc<Responder>) -> io::Result<HttpServer> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {:?}", local_addr);

        Ok(HttpServer {
            listener: Some(listener),
            local_addr,
            responder,
            shutdown: None,
            task: None,
        })
    }

    /// Router serving the IPC endpoint, usable without a listener
    pub fn router(responder: Arc<Responder>) -> Router {
        Router::new()
            .route("/", post(handle_call))
            .layer(DefaultBodyLimit::max(2 * ipc::MAX_FRAME_PAYLOAD_LENGTH))
            .with_state(responder)
    }

    /// Returns the actual port number on which the server is listening
    ///
    /// This is especially useful when binding to port 0.
    pub fn get_listen_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the IP address on which the server is listening
    pub fn get_listen_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn responder(&self) -> &Arc<Responder> {
        &self.responder
    }

    /// Starts serving requests on a background task
    ///
    /// Fails if the server was already started or closed.
    pub fn start(&mut self) -> io::Result<()> {
        let Some(listener) = self.listener.take() else {
            return Err(io::Error::other("server already started or closed"));
        };

        let app = HttpServer::router(self.responder.clone());
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });
        debug!("Serving on {}", self.local_addr);

        self.shutdown = Some(shutdown);
        self.task = Some(task);
        Ok(())
    }

    /// Stops accepting requests and waits for the serving task to finish
    ///
    /// Closing a server that is not running, or closing it twice, does nothing.
    pub async fn close(&mut self) -> io::Result<()> {
        self.listener = None;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(io::Error::other)??;
            info!("Server on {} closed", self.local_addr);
        }
        Ok(())
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            debug!("Server on {} dropped while running, shutting down", self.local_addr);
            let _ = shutdown.send(());
        }
    }
}
