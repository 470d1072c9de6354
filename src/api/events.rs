//! Push channel wire format and the domain events carried over it.
//!
//! The backend speaks Socket.IO v5 on top of Engine.IO v4. Only the
//! websocket transport is used, so every frame is one text packet:
//!
//! ```text
//! <engine type>[<socket type>[<namespace>,][<ack id>][<json>]]
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::api::models::ContactRecord;
use crate::error::PushError;

/// Engine.IO handshake payload sent by the server right after upgrade.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

impl OpenPayload {
    /// How long the server may stay silent before the session is dead.
    /// `None` when the handshake did not announce a heartbeat.
    pub fn heartbeat_timeout(&self) -> Option<Duration> {
        match self.ping_interval {
            0 => None,
            interval => Some(Duration::from_millis(interval + self.ping_timeout)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPacketKind {
    Connect,
    Disconnect,
    Event,
    Ack,
    ConnectError,
    BinaryEvent,
    BinaryAck,
}

impl SocketPacketKind {
    fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            b'0' => Self::Connect,
            b'1' => Self::Disconnect,
            b'2' => Self::Event,
            b'3' => Self::Ack,
            b'4' => Self::ConnectError,
            b'5' => Self::BinaryEvent,
            b'6' => Self::BinaryAck,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocketPacket {
    pub kind: SocketPacketKind,
    pub namespace: String,
    pub data: Option<Value>,
}

/// One decoded websocket text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFrame {
    Open(OpenPayload),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

pub const PONG: &str = "3";

pub fn decode_frame(text: &str) -> Result<EngineFrame, PushError> {
    let bytes = text.as_bytes();
    let Some(&engine_type) = bytes.first() else {
        return Err(PushError::Protocol("empty frame".into()));
    };
    let rest = text.get(1..).unwrap_or_default();
    match engine_type {
        b'0' => serde_json::from_str(rest)
            .map(EngineFrame::Open)
            .map_err(|e| PushError::Protocol(format!("bad open payload: {e}"))),
        b'1' => Ok(EngineFrame::Close),
        b'2' => Ok(EngineFrame::Ping),
        b'3' => Ok(EngineFrame::Pong),
        b'4' => decode_socket_packet(rest).map(EngineFrame::Message),
        b'5' => Ok(EngineFrame::Upgrade),
        b'6' => Ok(EngineFrame::Noop),
        other => Err(PushError::Protocol(format!("unknown engine packet type {:?}", other as char))),
    }
}

fn decode_socket_packet(text: &str) -> Result<SocketPacket, PushError> {
    let bytes = text.as_bytes();
    let kind = bytes
        .first()
        .and_then(|b| SocketPacketKind::from_byte(*b))
        .ok_or_else(|| PushError::Protocol(format!("bad socket packet: {text:?}")))?;
    let mut rest = &text[1..];

    // Binary packets carry an attachment count before the namespace.
    if matches!(kind, SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck) {
        let end = rest.find('-').ok_or_else(|| PushError::Protocol("missing attachment count".into()))?;
        rest = &rest[end + 1..];
    }

    let namespace = if rest.starts_with('/') {
        match rest.find(',') {
            Some(end) => {
                let ns = &rest[..end];
                rest = &rest[end + 1..];
                ns.to_string()
            }
            None => {
                let ns = rest.to_string();
                rest = "";
                ns
            }
        }
    } else {
        "/".to_string()
    };

    let ack_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    rest = &rest[ack_len..];

    let data = if rest.is_empty() {
        None
    } else {
        Some(serde_json::from_str(rest).map_err(|e| PushError::Protocol(format!("bad packet json: {e}")))?)
    };

    Ok(SocketPacket { kind, namespace, data })
}

/// Frame asking the server to join `namespace`.
pub fn encode_connect(namespace: &str) -> String {
    if namespace == "/" { "40".to_string() } else { format!("40{namespace},") }
}

/// Frame leaving `namespace`.
pub fn encode_disconnect(namespace: &str) -> String {
    if namespace == "/" { "41".to_string() } else { format!("41{namespace},") }
}

/// What the push channel reports to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected(String),
    ConnectError(String),
    NewForm(ContactRecord),
    FormDeleted(String),
}

pub const SERVER_DISCONNECT: &str = "io server disconnect";

impl PushEvent {
    /// Map a packet on our namespace to a domain event. Packets we do not
    /// care about, and payloads we cannot make sense of, yield `None`.
    pub fn from_packet(packet: &SocketPacket) -> Option<Self> {
        match packet.kind {
            SocketPacketKind::Connect => Some(Self::Connected),
            SocketPacketKind::Disconnect => Some(Self::Disconnected(SERVER_DISCONNECT.into())),
            SocketPacketKind::ConnectError => {
                let message = packet
                    .data
                    .as_ref()
                    .and_then(|d| d.get("message").and_then(Value::as_str).map(str::to_string).or_else(|| d.as_str().map(str::to_string)))
                    .unwrap_or_else(|| "connect error".into());
                Some(Self::ConnectError(message))
            }
            SocketPacketKind::Event => {
                let args = packet.data.as_ref()?.as_array()?;
                let name = args.first()?.as_str()?;
                let payload = args.get(1).cloned().unwrap_or(Value::Null);
                Self::from_named(name, payload)
            }
            _ => None,
        }
    }

    fn from_named(name: &str, payload: Value) -> Option<Self> {
        match name {
            "new_form" => {
                // Either the record itself or `{ data: record }`.
                let record = match payload.get("data") {
                    Some(inner) if inner.is_object() => inner.clone(),
                    _ => payload,
                };
                match serde_json::from_value::<ContactRecord>(record) {
                    Ok(rec) => Some(Self::NewForm(rec)),
                    Err(e) => {
                        log::warn!("dropping malformed new_form payload: {e}");
                        None
                    }
                }
            }
            "form_deleted" => {
                let id = payload.get("formId")?;
                let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
                Some(Self::FormDeleted(id))
            }
            "connected" => {
                log::debug!("server acknowledged push connection: {payload}");
                None
            }
            other => {
                log::debug!("ignoring push event {other}");
                None
            }
        }
    }
}
