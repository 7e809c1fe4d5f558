//! Error types shared across the client.

use std::fmt::{Display, Formatter};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Client error enumeration covering all domain failure modes.
///
/// None of these are fatal to a session: the reply pipeline logs them and
/// moves on to the next message.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Malformed or unrecognised frame on the engine stream.
    Protocol(String),
    /// Explicit `Error` reply sent by the completion engine.
    Engine(String),
    /// Computed edit range is invalid against the live document.
    EditConflict(String),
    /// Connect or write failure on the engine socket.
    Connection(String),
    /// Request rejected before it reached the encoder.
    InvalidRequest(String),
    /// Requested session or document does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Engine(msg) => write!(f, "engine: {msg}"),
            Self::EditConflict(msg) => write!(f, "edit conflict: {msg}"),
            Self::Connection(msg) => write!(f, "connection: {msg}"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
