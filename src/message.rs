//! Message contexts exchanged with the hub.
//!
//! A [`MessageContext`] is the unit submitted for sending as a text frame. It
//! carries a [`Command`], an arbitrary JSON value and a header map. Once a
//! session exists every outbound context carries the session's
//! [`CONNECTION_ID_KEY`] header entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Header key carrying the session's connection identifier.
pub const CONNECTION_ID_KEY: &str = "ConnectionId";

/// Hub command carried by a [`MessageContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Command {
    /// Connection-level notification.
    Connect,
    /// Application data.
    DataSend,
    /// Handshake acknowledgement carrying the assigned connection id.
    Handshake,
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        match command {
            Command::Connect => 1,
            Command::DataSend => 2,
            Command::Handshake => 4,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Connect),
            2 => Ok(Self::DataSend),
            4 => Ok(Self::Handshake),
            other => Err(format!("unknown command {other}")),
        }
    }
}

/// Data unit sent to, or received from, the hub as a text frame.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use socketlink::{Command, MessageContext};
///
/// let ctx = MessageContext::new(Command::DataSend, json!({"order": 7}))
///     .with_header("Topic", json!("orders"));
/// let segment = ctx.to_segment().expect("serialize");
/// let parsed = MessageContext::from_segment(&segment).expect("parse");
/// assert_eq!(parsed, ctx);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageContext {
    command: Command,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    header: Map<String, Value>,
}

impl MessageContext {
    /// Create a context with an empty header.
    #[must_use]
    pub fn new(command: Command, value: Value) -> Self {
        Self {
            command,
            value,
            header: Map::new(),
        }
    }

    /// Add or replace a header entry.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: Value) -> Self {
        self.header.insert(key.into(), value);
        self
    }

    /// Command carried by this context.
    #[must_use]
    pub fn command(&self) -> Command { self.command }

    /// Payload value.
    #[must_use]
    pub fn value(&self) -> &Value { &self.value }

    /// Header entries.
    #[must_use]
    pub fn header(&self) -> &Map<String, Value> { &self.header }

    /// Mutable access to the header entries.
    pub fn header_mut(&mut self) -> &mut Map<String, Value> { &mut self.header }

    /// Connection id carried in the header, if it is present and a string.
    #[must_use]
    pub fn connection_id(&self) -> Option<&str> {
        self.header.get(CONNECTION_ID_KEY).and_then(Value::as_str)
    }

    /// Serialize the context into a JSON text segment.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the context cannot be serialized.
    pub fn to_segment(&self) -> Result<String, serde_json::Error> { serde_json::to_string(self) }

    /// Parse a context from a text segment.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if `segment` is not a valid context.
    pub fn from_segment(segment: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(segment)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(Command::Connect, 1)]
    #[case(Command::DataSend, 2)]
    #[case(Command::Handshake, 4)]
    fn command_wire_values(#[case] command: Command, #[case] wire: u8) {
        assert_eq!(u8::from(command), wire);
        assert_eq!(Command::try_from(wire), Ok(command));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = MessageContext::from_segment(r#"{"Command":3}"#).expect_err("3 is unknown");
        assert!(err.to_string().contains("unknown command 3"), "{err}");
    }

    #[test]
    fn segment_uses_hub_field_names() {
        let ctx = MessageContext::new(Command::DataSend, json!("ping"))
            .with_header(CONNECTION_ID_KEY, json!("c-1"));
        let segment = ctx.to_segment().expect("serialize");
        let raw: Value = serde_json::from_str(&segment).expect("valid json");
        assert_eq!(
            raw,
            json!({"Command": 2, "Value": "ping", "Header": {"ConnectionId": "c-1"}})
        );
    }

    #[test]
    fn missing_value_and_header_default() {
        let ctx = MessageContext::from_segment(r#"{"Command":4}"#).expect("parse");
        assert_eq!(ctx.command(), Command::Handshake);
        assert!(ctx.value().is_null());
        assert!(ctx.header().is_empty());
        assert_eq!(ctx.connection_id(), None);
    }

    #[test]
    fn non_string_connection_id_is_not_exposed() {
        let ctx = MessageContext::new(Command::DataSend, Value::Null)
            .with_header(CONNECTION_ID_KEY, json!(17));
        assert_eq!(ctx.connection_id(), None);
    }
}
