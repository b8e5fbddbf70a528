//! Handlers for the messages of the `IMailService` protocol.
//!
//! Each handler decodes the parameters record of its message from the
//! request, calls the [`crate::service::MailService`] held by the context
//! and encodes the response value. Metadata, error flag and error values
//! are written by the dispatcher in [`crate::protocol::ipc`].

use std::io::{Read, Write};

use anyhow::anyhow;

use crate::protocol::ipc::{self, SEND_MESSAGE};

mod send;

use send::mailproc_send;

/// Main handler for the mail protocol
///
/// # Arguments
///
/// * `message_name` - Name of the called message
/// * `input` - Input stream positioned at the parameters record
/// * `output` - Output stream for the response value
/// * `context` - Request context holding the service
pub async fn handle_mail(
    message_name: &str,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &ipc::Context,
) -> Result<(), anyhow::Error> {
    match message_name {
        SEND_MESSAGE => mailproc_send(input, output, context).await,
        unknown => Err(anyhow!("No handler for message {}", unknown)),
    }
}
