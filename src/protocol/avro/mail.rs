//! Records of the `IMailService` protocol.

use std::fmt;
use std::io;

use super::*;

/// A file attached to a [`Message`]. Only its name and size travel.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: i32,
}
DeserializeStruct!(Attachment, name, size);
SerializeStruct!(Attachment, name, size);

impl Attachment {
    pub fn new(name: impl Into<String>, size: i32) -> Attachment {
        Attachment { name: name.into(), size }
    }
}

/// A mail message handed to `send`. No field is validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub to: String,
    pub from: String,
    pub body: String,
    /// Kept in the order the caller supplied them
    pub attachments: Vec<Attachment>,
}
DeserializeStruct!(Message, to, from, body, attachments);
SerializeStruct!(Message, to, from, body, attachments);

/// JSON layout of Avro's record printing: `": "` after keys, `", "`
/// between entries and array items, everything on one line.
struct RecordFormatter;

impl serde_json::ser::Formatter for RecordFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Renders the record as JSON, the way Avro prints records.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut json = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut json, RecordFormatter);
        serde::Serialize::serialize(self, &mut ser).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&json))
    }
}

/// Parameters of the `send` message: a record with the single field `message`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SendRequest {
    pub message: Message,
}
DeserializeStruct!(SendRequest, message);
SerializeStruct!(SendRequest, message);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_an_avro_record() {
        let message = Message {
            to: "info@abc.com".to_string(),
            from: "remo@github.com".to_string(),
            body: "Hello abc!\nSome new text ...".to_string(),
            attachments: vec![Attachment::new("first", 66), Attachment::new("second", 234)],
        };

        let expected = concat!(
            r#"{"to": "info@abc.com", "from": "remo@github.com", "#,
            r#""body": "Hello abc!\nSome new text ...", "#,
            r#""attachments": [{"name": "first", "size": 66}, {"name": "second", "size": 234}]}"#,
        );
        assert_eq!(message.to_string(), expected);
    }

    #[test]
    fn empty_attachments_print_as_empty_array() {
        let message =
            Message { to: "a".into(), from: "b".into(), body: "c".into(), attachments: Vec::new() };

        assert_eq!(
            message.to_string(),
            r#"{"to": "a", "from": "b", "body": "c", "attachments": []}"#
        );
    }
}
