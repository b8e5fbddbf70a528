//! Implementation of the `send` message: `string send(Message message)`.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::avro::{deserialize, mail, Serialize};
use crate::protocol::ipc;

/// Handles the `send` message
///
/// Decodes the [`mail::SendRequest`] parameters, hands the message to the
/// service and writes the returned description as a `string`.
///
/// # Returns
///
/// * `Result<(), anyhow::Error>` - Ok(()) on success or an error raised by
///   decoding or by the service
pub async fn mailproc_send(
    input: &mut impl Read,
    output: &mut impl Write,
    context: &ipc::Context,
) -> Result<(), anyhow::Error> {
    let args = deserialize::<mail::SendRequest>(input)?;
    debug!(
        "mailproc_send({}, to={:?}, attachments={})",
        context.client_addr,
        args.message.to,
        args.message.attachments.len()
    );

    let response = context.service.send(args.message).await?;
    debug!(" {} --> {:?}", context.client_addr, response);
    response.serialize(output)?;
    Ok(())
}
