//! Text framing for Socket.IO v5 over Engine.IO v4 websockets.
//!
//! Only the default namespace and text packets are supported; binary
//! attachments are never produced by the dice server.
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,
    #[error("unknown engine.io packet type `{0}`")]
    UnknownEnginePacket(char),
    #[error("unknown socket.io packet type `{0}`")]
    UnknownSocketPacket(char),
    #[error("invalid JSON in frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event frame without a name")]
    MissingEventName,
}

/// Handshake parameters sent by the server in the Engine.IO open packet.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Option<Value> },
    Ack,
    ConnectError(Value),
}

impl Frame {
    pub fn event(name: impl Into<String>, data: Option<Value>) -> Self {
        Frame::Event {
            name: name.into(),
            data,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Frame::Open(info) => format!(
                "0{}",
                serde_json::json!({
                    "sid": info.sid,
                    "pingInterval": info.ping_interval,
                    "pingTimeout": info.ping_timeout,
                })
            ),
            Frame::Close => "1".into(),
            Frame::Ping => "2".into(),
            Frame::Pong => "3".into(),
            Frame::Noop => "6".into(),
            Frame::Connect(None) => "40".into(),
            Frame::Connect(Some(data)) => format!("40{data}"),
            Frame::Disconnect => "41".into(),
            Frame::Event { name, data } => {
                let mut args = vec![Value::String(name.clone())];
                args.extend(data.clone());
                format!("42{}", Value::Array(args))
            }
            Frame::Ack => "43[]".into(),
            Frame::ConnectError(data) => format!("44{data}"),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        let mut chars = raw.chars();
        let engine = chars.next().ok_or(CodecError::Empty)?;
        let rest = chars.as_str();
        match engine {
            '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Frame::Close),
            '2' => Ok(Frame::Ping),
            '3' => Ok(Frame::Pong),
            '4' => decode_socket_packet(rest),
            '5' | '6' => Ok(Frame::Noop),
            other => Err(CodecError::UnknownEnginePacket(other)),
        }
    }
}

fn decode_socket_packet(raw: &str) -> Result<Frame, CodecError> {
    let mut chars = raw.chars();
    let kind = chars.next().ok_or(CodecError::Empty)?;
    let body = strip_ack_id(strip_namespace(chars.as_str()));
    match kind {
        '0' => Ok(Frame::Connect(parse_optional(body)?)),
        '1' => Ok(Frame::Disconnect),
        '2' => {
            let args: Vec<Value> = serde_json::from_str(body)?;
            let mut args = args.into_iter();
            let name = match args.next() {
                Some(Value::String(name)) => name,
                _ => return Err(CodecError::MissingEventName),
            };
            Ok(Frame::Event {
                name,
                data: args.next(),
            })
        }
        '3' | '6' => Ok(Frame::Ack),
        '4' => Ok(Frame::ConnectError(parse_optional(body)?.unwrap_or(Value::Null))),
        other => Err(CodecError::UnknownSocketPacket(other)),
    }
}

fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        body.split_once(',').map_or("", |(_, rest)| rest)
    } else {
        body
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_optional(body: &str) -> Result<Option<Value>, CodecError> {
    if body.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::from_str(body)?))
    }
}
