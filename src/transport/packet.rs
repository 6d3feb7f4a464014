//! Socket.IO v4 framing over the Engine.IO v4 WebSocket transport.
//!
//! Every WebSocket text frame is one Engine.IO packet: a single type digit
//! followed by its data. Engine.IO `message` packets carry one Socket.IO
//! packet, again prefixed by a type digit.

use serde::Deserialize;
use serde_json::Value;

use super::error::{TransportError, TransportResult};

/// Engine.IO open handshake.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// How long the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
}

/// One Engine.IO packet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EnginePacket {
    /// `0`: handshake sent by the server.
    Open(Handshake),
    /// `1`: transport close.
    Close,
    /// `2`: heartbeat from the server.
    Ping,
    /// `3`: heartbeat reply.
    Pong,
    /// `4`: application data, a Socket.IO packet.
    Message(String),
    /// `5`: transport upgrade.
    Upgrade,
    /// `6`: no-op.
    Noop,
}

impl EnginePacket {
    /// Decode a WebSocket text frame.
    ///
    /// # Errors
    /// Returns a protocol error for empty frames, unknown types or a malformed handshake.
    pub fn decode(frame: &str) -> TransportResult<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| TransportError::Protocol("empty frame".to_string()))?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(data)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(data.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(TransportError::Protocol(format!(
                "unknown engine packet type {other:?}"
            ))),
        }
    }

    /// Encode as a WebSocket text frame. The client never sends `Open`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

/// One Socket.IO packet on the default namespace.
#[derive(Clone, Debug, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect (request from client, ack from server with `{sid}`).
    Connect(Option<Value>),
    /// `1`: namespace disconnect.
    Disconnect,
    /// `2`: named event with its payload.
    Event {
        /// Event name.
        name: String,
        /// First argument, or an array when the server sent several.
        payload: Value,
    },
    /// `4`: namespace connect refused.
    ConnectError(Value),
}

impl SocketPacket {
    /// Decode the data of an Engine.IO message packet.
    ///
    /// A namespace prefix (`/nsp,`) and an ack id are skipped. Binary
    /// attachments are not supported.
    ///
    /// # Errors
    /// Returns a protocol error for unknown or unsupported packets.
    pub fn decode(data: &str) -> TransportResult<Self> {
        let mut chars = data.chars();
        let kind = chars
            .next()
            .ok_or_else(|| TransportError::Protocol("empty socket packet".to_string()))?;
        let rest = skip_ack_id(skip_namespace(chars.as_str()));

        match kind {
            '0' => Ok(Self::Connect(parse_optional(rest)?)),
            '1' => Ok(Self::Disconnect),
            '2' => decode_event(rest),
            '4' => Ok(Self::ConnectError(parse_optional(rest)?.unwrap_or(Value::Null))),
            '3' => Err(TransportError::Protocol("unexpected ack packet".to_string())),
            '5' | '6' => Err(TransportError::Protocol(
                "binary packets are not supported".to_string(),
            )),
            other => Err(TransportError::Protocol(format!(
                "unknown socket packet type {other:?}"
            ))),
        }
    }

    /// Encode for use inside an Engine.IO message packet.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Connect(None) => "0".to_string(),
            Self::Connect(Some(auth)) => format!("0{auth}"),
            Self::Disconnect => "1".to_string(),
            Self::Event { name, payload } => {
                format!("2{}", Value::Array(vec![Value::String(name.clone()), payload.clone()]))
            }
            Self::ConnectError(data) => format!("4{data}"),
        }
    }

    /// Encode straight into a WebSocket text frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

fn skip_namespace(data: &str) -> &str {
    if data.starts_with('/') {
        data.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        data
    }
}

fn skip_ack_id(data: &str) -> &str {
    data.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_optional(data: &str) -> TransportResult<Option<Value>> {
    if data.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(data)?))
    }
}

fn decode_event(data: &str) -> TransportResult<SocketPacket> {
    let Value::Array(mut args) = serde_json::from_str::<Value>(data)? else {
        return Err(TransportError::Protocol(
            "event payload is not an array".to_string(),
        ));
    };
    if args.is_empty() {
        return Err(TransportError::Protocol("event without a name".to_string()));
    }
    let Value::String(name) = args.remove(0) else {
        return Err(TransportError::Protocol(
            "event name is not a string".to_string(),
        ));
    };
    let payload = match args.len() {
        0 => Value::Null,
        1 => args.remove(0),
        _ => Value::Array(args),
    };
    Ok(SocketPacket::Event { name, payload })
}
