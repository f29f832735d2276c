use std::io;

use thiserror::Error;

/// Failures of the command codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Missing delimiter, or a value field that is not an integer.
    #[error("malformed command {0:?}")]
    Malformed(String),

    /// Grammatical message naming a channel outside the vocabulary.
    #[error("unrecognized channel {0:?}")]
    UnrecognizedChannel(String),

    #[error("value {value} out of range for channel {channel}")]
    ValueOutOfRange { channel: String, value: i64 },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("link closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}
