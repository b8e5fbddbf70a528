//! Avro IPC message framing and call dispatching.
//!
//! Over HTTP every request and every response is one frame: a list of
//! buffers, each prefixed with its 4 byte big endian length, ended by a
//! zero length buffer. The concatenated payload of a request is a
//! handshake request followed by the call; the payload of a response is a
//! handshake response optionally followed by the call's result.
//!
//! <https://avro.apache.org/docs/1.11.1/specification/#message-framing>

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, trace, warn};

use crate::protocol::avro::handshake::{
    HandshakeMatch, HandshakeRequest, HandshakeResponse, Metadata,
};
use crate::protocol::avro::{deserialize, write_long, Serialize};
use crate::protocol::ipc::{self, Protocol};
use crate::protocol::mail;

/// Processes a single IPC request
///
/// This function forms the core of the responder. It:
/// 1. Deserializes the handshake request and answers it
/// 2. Stops after the handshake when the client protocol is unknown
/// 3. Reads the call metadata and message name
/// 4. Resolves the message against the client's and the local protocol
/// 5. Routes the call to the protocol handler and writes its response
///
/// Failures while serving the call itself are reported to the client as
/// system errors inside the response. Only a request whose handshake cannot
/// be decoded yields an `Err`.
pub async fn handle_ipc(
    input: &mut impl Read,
    output: &mut impl Write,
    context: ipc::Context,
) -> Result<(), anyhow::Error> {
    let request = deserialize::<HandshakeRequest>(input)?;
    let Some(remote) = handshake(&request, output, &context)? else {
        return Ok(());
    };

    let (meta, message_name) = match read_call_header(input) {
        Ok(header) => header,
        Err(e) => {
            warn!("Unreadable call from {}: {}", context.client_addr, e);
            return write_system_error(output, &format!("Unreadable call: {e}"));
        }
    };
    debug!(
        "handle_ipc({}, {:?}) with {} metadata entries",
        context.client_addr,
        message_name,
        meta.len()
    );

    if remote.message(&message_name).is_none() {
        warn!("Client {} called undeclared message {}", context.client_addr, message_name);
        return write_system_error(output, &format!("No such remote message: {message_name}"));
    }
    if context.protocol.message(&message_name).is_none() {
        return write_system_error(
            output,
            &format!("No message named {} in {}", message_name, context.protocol.full_name()),
        );
    }

    // the handler writes into its own buffer so a failure midway cannot
    // leave a half written response behind
    let mut value = Vec::new();
    match mail::handle_mail(&message_name, input, &mut value, &context).await {
        Ok(()) => {
            Metadata::new().serialize(output)?;
            false.serialize(output)?;
            output.write_all(&value)?;
            Ok(())
        }
        Err(e) => {
            warn!("{} failed for {}: {:#}", message_name, context.client_addr, e);
            write_system_error(output, &format!("{e:#}"))
        }
    }
}

/// Reads the call metadata and the message name following the handshake
fn read_call_header(input: &mut impl Read) -> std::io::Result<(Metadata, String)> {
    let meta = deserialize::<Metadata>(input)?;
    let message_name = deserialize::<String>(input)?;
    Ok((meta, message_name))
}

/// Answers the handshake and returns the client's protocol when it is known
///
/// The client protocol is known if its hash was seen before or if the
/// request carries its text. An unknown client receives `NONE` together
/// with the server protocol and the call is skipped; a known client whose
/// idea of the server hash is stale receives `CLIENT`.
fn handshake(
    request: &HandshakeRequest,
    output: &mut impl Write,
    context: &ipc::Context,
) -> Result<Option<Arc<Protocol>>, anyhow::Error> {
    let mut remote = context.protocol_cache.get(&request.client_hash);
    if remote.is_none() {
        if let Some(text) = &request.client_protocol {
            let protocol = Arc::new(Protocol::parse(text)?);
            debug!("Caching client protocol {} for {}", protocol.full_name(), context.client_addr);
            context.protocol_cache.insert(request.client_hash, protocol.clone());
            remote = Some(protocol);
        }
    }

    let response = match &remote {
        None => HandshakeResponse::with_server_protocol(
            HandshakeMatch::NONE,
            &context.protocol_text,
            context.protocol_hash,
        ),
        Some(_) if request.server_hash == context.protocol_hash => HandshakeResponse::both(),
        Some(_) => HandshakeResponse::with_server_protocol(
            HandshakeMatch::CLIENT,
            &context.protocol_text,
            context.protocol_hash,
        ),
    };
    trace!("handshake {:?} -> {:?}", context.client_addr, response.matched);
    response.serialize(output)?;

    Ok(remote)
}

/// Writes a response whose error flag is set and whose value is the
/// `string` branch of the error union.
fn write_system_error(output: &mut impl Write, message: &str) -> Result<(), anyhow::Error> {
    Metadata::new().serialize(output)?;
    true.serialize(output)?;
    write_long(0, output)?;
    message.serialize(output)?;
    Ok(())
}

/// Size of the buffers a payload is split into when framed
pub const BUFFER_SIZE: usize = 8192;

/// Reads one frame and returns its buffers
///
/// Fails with `InvalidData` once the buffers add up to more than
/// [`ipc::MAX_FRAME_PAYLOAD_LENGTH`] and with `UnexpectedEof` when the frame
/// is truncated before its terminating empty buffer.
pub fn read_frame(src: &mut impl Read) -> std::io::Result<Vec<Vec<u8>>> {
    let mut buffers = Vec::new();
    let mut total: usize = 0;
    loop {
        let length = src.read_u32::<BigEndian>()? as usize;
        trace!("Reading buffer length:{}", length);
        if length == 0 {
            return Ok(buffers);
        }
        total = total.saturating_add(length);
        if total > ipc::MAX_FRAME_PAYLOAD_LENGTH {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "IPC frame payload length {} exceeds max {}",
                    total,
                    ipc::MAX_FRAME_PAYLOAD_LENGTH
                ),
            ));
        }
        let mut buffer = vec![0; length];
        src.read_exact(&mut buffer)?;
        buffers.push(buffer);
    }
}

/// Writes buffers as one frame
///
/// Buffers larger than [`BUFFER_SIZE`] are split, empty buffers are
/// skipped since an empty buffer ends the frame.
pub fn write_frame(buffers: &[Vec<u8>], dest: &mut impl Write) -> std::io::Result<()> {
    for buffer in buffers {
        for chunk in buffer.chunks(BUFFER_SIZE) {
            trace!("Writing buffer length:{}", chunk.len());
            dest.write_u32::<BigEndian>(chunk.len() as u32)?;
            dest.write_all(chunk)?;
        }
    }
    dest.write_u32::<BigEndian>(0)
}
