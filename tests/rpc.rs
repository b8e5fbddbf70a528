use std::io::{Cursor, ErrorKind};
use std::sync::Arc;

mod support;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use avro_mail_rpc::avro::handshake::{
    HandshakeMatch, HandshakeRequest, HandshakeResponse, Metadata,
};
use avro_mail_rpc::avro::mail::SendRequest;
use avro_mail_rpc::avro::{deserialize, read_long, Serialize};
use avro_mail_rpc::http::HttpServer;
use avro_mail_rpc::protocol::ipc::protocol::{Field, MessageDecl};
use avro_mail_rpc::protocol::ipc::{
    self, read_frame, write_frame, Protocol, Responder, MAX_FRAME_PAYLOAD_LENGTH, SEND_MESSAGE,
};
use avro_mail_rpc::service::MailServiceImpl;

use support::{sample_message, FailingService, SAMPLE_RESPONSE};

fn responder() -> Arc<Responder> {
    Arc::new(Responder::new(Arc::new(MailServiceImpl)).expect("build responder"))
}

/// Handshake from a client speaking `protocol` that already knows the server hash
fn handshake_for(
    protocol: &Protocol,
    send_text: bool,
    server_hash: [u8; 16],
) -> HandshakeRequest {
    HandshakeRequest {
        client_hash: protocol.hash().unwrap(),
        client_protocol: send_text.then(|| protocol.to_json().unwrap()),
        server_hash,
        meta: None,
    }
}

fn call_payload(handshake: &HandshakeRequest, message_name: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    handshake.serialize(&mut payload).unwrap();
    Metadata::new().serialize(&mut payload).unwrap();
    message_name.serialize(&mut payload).unwrap();
    SendRequest { message: sample_message() }.serialize(&mut payload).unwrap();
    payload
}

/// Reads the response metadata and error flag, then either the value or the system error
fn read_result(input: &mut Cursor<Vec<u8>>) -> Result<String, String> {
    let _meta = deserialize::<Metadata>(input).unwrap();
    if !deserialize::<bool>(input).unwrap() {
        return Ok(deserialize::<String>(input).unwrap());
    }
    assert_eq!(read_long(input).unwrap(), 0, "system error branch");
    Err(deserialize::<String>(input).unwrap())
}

/// Mail protocol with an extra message the server does not implement
fn extended_protocol() -> Protocol {
    let mut protocol = Protocol::mail();
    protocol.messages.insert(
        "receive".to_string(),
        MessageDecl {
            request: vec![Field { name: "folder".to_string(), schema: json!("string") }],
            response: json!("string"),
            errors: Vec::new(),
            one_way: false,
        },
    );
    protocol
}

#[test]
fn rejects_oversized_frame() {
    let oversized = (MAX_FRAME_PAYLOAD_LENGTH + 1) as u32;
    let bytes = oversized.to_be_bytes();

    let err = read_frame(&mut &bytes[..]).expect_err("expected oversize error");
    assert!(err.to_string().contains("exceeds max"), "unexpected error: {err:?}");
}

#[test]
fn rejects_truncated_frame() {
    let bytes = [0, 0, 0, 5, 1, 2];
    let err = read_frame(&mut &bytes[..]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

    // a complete buffer but no terminating empty buffer
    let bytes = [0, 0, 0, 1, 9];
    assert!(read_frame(&mut &bytes[..]).is_err());
}

#[test]
fn frames_split_large_buffers() {
    let payload: Vec<u8> = (0..20_000).map(|i| (i % 251) as u8).collect();
    let mut framed = Vec::new();
    write_frame(&[payload.clone(), Vec::new()], &mut framed).unwrap();

    let buffers = read_frame(&mut &framed[..]).unwrap();
    let sizes: Vec<usize> = buffers.iter().map(Vec::len).collect();
    assert_eq!(sizes, [ipc::BUFFER_SIZE, ipc::BUFFER_SIZE, 20_000 - 2 * ipc::BUFFER_SIZE]);
    assert_eq!(buffers.concat(), payload);
    assert_eq!(&framed[framed.len() - 4..], [0_u8; 4]);
}

#[tokio::test]
async fn unknown_client_gets_none_and_call_is_skipped() {
    let responder = responder();
    let local = Protocol::mail();
    let handshake = handshake_for(&local, false, responder.protocol_hash());
    let request = call_payload(&handshake, SEND_MESSAGE);

    let response = responder.respond(&request, "test").await.expect("respond");
    let mut input = Cursor::new(response);
    let handshake = deserialize::<HandshakeResponse>(&mut input).unwrap();

    assert_eq!(handshake.matched, HandshakeMatch::NONE);
    assert_eq!(handshake.server_hash, Some(responder.protocol_hash()));
    let server_protocol = Protocol::parse(&handshake.server_protocol.unwrap()).unwrap();
    assert_eq!(&server_protocol, responder.protocol());
    assert_eq!(input.position() as usize, input.get_ref().len(), "no call result expected");
    assert_eq!(responder.known_clients(), 0);
}

#[tokio::test]
async fn client_sending_its_protocol_gets_both_and_a_result() {
    let responder = responder();
    let local = Protocol::mail();

    let handshake = handshake_for(&local, true, responder.protocol_hash());
    let request = call_payload(&handshake, SEND_MESSAGE);
    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    let handshake = deserialize::<HandshakeResponse>(&mut input).unwrap();
    assert_eq!(handshake, HandshakeResponse::both());
    assert_eq!(read_result(&mut input), Ok(SAMPLE_RESPONSE.to_string()));
    assert_eq!(responder.known_clients(), 1);

    // the hash alone is enough from now on
    let handshake = handshake_for(&local, false, responder.protocol_hash());
    let request = call_payload(&handshake, SEND_MESSAGE);
    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    assert_eq!(
        deserialize::<HandshakeResponse>(&mut input).unwrap().matched,
        HandshakeMatch::BOTH
    );
    assert_eq!(read_result(&mut input), Ok(SAMPLE_RESPONSE.to_string()));
}

#[tokio::test]
async fn stale_server_hash_gets_client_match() {
    let responder = responder();
    let handshake = handshake_for(&Protocol::mail(), true, [0xAB; 16]);
    let request = call_payload(&handshake, SEND_MESSAGE);

    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    let handshake = deserialize::<HandshakeResponse>(&mut input).unwrap();

    assert_eq!(handshake.matched, HandshakeMatch::CLIENT);
    assert_eq!(handshake.server_hash, Some(responder.protocol_hash()));
    assert!(handshake.server_protocol.is_some());
    assert_eq!(read_result(&mut input), Ok(SAMPLE_RESPONSE.to_string()));
}

#[tokio::test]
async fn undeclared_messages_are_system_errors() {
    let responder = responder();
    let client = extended_protocol();

    let handshake = handshake_for(&client, true, responder.protocol_hash());
    let request = call_payload(&handshake, "receive");
    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    deserialize::<HandshakeResponse>(&mut input).unwrap();
    assert_eq!(
        read_result(&mut input),
        Err("No message named receive in example.proto.IMailService".to_string())
    );

    let handshake = handshake_for(&client, false, responder.protocol_hash());
    let request = call_payload(&handshake, "bogus");
    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    deserialize::<HandshakeResponse>(&mut input).unwrap();
    assert_eq!(read_result(&mut input), Err("No such remote message: bogus".to_string()));
}

#[tokio::test]
async fn handler_failures_are_system_errors() {
    let responder = Responder::new(Arc::new(FailingService)).unwrap();
    let handshake = handshake_for(&Protocol::mail(), true, responder.protocol_hash());
    let request = call_payload(&handshake, SEND_MESSAGE);

    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    deserialize::<HandshakeResponse>(&mut input).unwrap();
    let err = read_result(&mut input).unwrap_err();
    assert!(err.contains("mailbox full"), "unexpected error: {err}");
}

#[tokio::test]
async fn garbage_parameters_are_system_errors() {
    let responder = responder();
    let mut request = Vec::new();
    handshake_for(&Protocol::mail(), true, responder.protocol_hash())
        .serialize(&mut request)
        .unwrap();
    Metadata::new().serialize(&mut request).unwrap();
    SEND_MESSAGE.serialize(&mut request).unwrap();
    // a string length pointing past the end of the request
    request.push(0x7e);

    let mut input = Cursor::new(responder.respond(&request, "test").await.unwrap());
    assert_eq!(
        deserialize::<HandshakeResponse>(&mut input).unwrap().matched,
        HandshakeMatch::BOTH
    );
    assert!(read_result(&mut input).is_err());
}

#[tokio::test]
async fn truncated_call_header_is_a_system_error() {
    let responder = responder();
    let mut request = Vec::new();
    handshake_for(&Protocol::mail(), true, responder.protocol_hash())
        .serialize(&mut request)
        .unwrap();
    Metadata::new().serialize(&mut request).unwrap();
    // message name length with no name bytes behind it
    request.push(0x7e);

    let response = responder.respond(&request, "test").await.expect("system error response");
    let mut input = Cursor::new(response);
    assert_eq!(
        deserialize::<HandshakeResponse>(&mut input).unwrap().matched,
        HandshakeMatch::BOTH
    );
    let err = read_result(&mut input).unwrap_err();
    assert!(err.starts_with("Unreadable call"), "unexpected error: {err}");
    assert_eq!(input.position() as usize, input.get_ref().len());
}

#[tokio::test]
async fn undecodable_handshake_is_rejected() {
    let responder = responder();
    assert!(responder.respond(&[1, 2, 3], "test").await.is_err());
}

#[tokio::test]
async fn router_answers_malformed_frames_with_bad_request() {
    let app = HttpServer::router(responder());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .body(Body::from(vec![0_u8, 0, 1]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn router_serves_framed_calls() {
    let responder = responder();
    let app = HttpServer::router(responder.clone());
    let handshake = handshake_for(&Protocol::mail(), true, responder.protocol_hash());
    let payload = call_payload(&handshake, SEND_MESSAGE);
    let mut body = Vec::new();
    write_frame(&[payload], &mut body).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, ipc::AVRO_CONTENT_TYPE)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], ipc::AVRO_CONTENT_TYPE);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut input = Cursor::new(read_frame(&mut &bytes[..]).unwrap().concat());
    assert_eq!(
        deserialize::<HandshakeResponse>(&mut input).unwrap().matched,
        HandshakeMatch::BOTH
    );
    assert_eq!(read_result(&mut input), Ok(SAMPLE_RESPONSE.to_string()));
}
