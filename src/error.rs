use crate::{
    protocol::RollId,
    socketio::CodecError,
};
use thiserror::Error;

/// Error type for the dice chamber client library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
    #[error("socket.io frame error: {0}")]
    Codec(#[from] CodecError),
    #[error("malformed `{event}` payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown die type: {0}")]
    UnknownDie(String),
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
    #[error("GM mode is required for this roll")]
    GmModeRequired,
    #[error("roll {0} is already pending")]
    DuplicateRoll(RollId),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("server refused the namespace connection: {0}")]
    ConnectRefused(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
