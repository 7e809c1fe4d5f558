//! Typed decoding of inbound frames.
//!
//! | Leading byte | Reply                                       |
//! |--------------|---------------------------------------------|
//! | `00`         | [`Response::Ok`]                            |
//! | `01`         | [`Response::Error`] (NUL-terminated text)   |
//! | `02`         | [`Response::RegexFull`]                     |
//! | `03`         | [`Response::Capabilities`] (`;`-separated)  |
//! | `04`         | [`Response::CursorHandle`] (one byte)       |
//! | `05`         | [`Response::InvalidChar`]                   |
//! | `06`         | [`Response::RegexStart`]                    |
//! | *(other)*    | [`Response::Expanded`] (untagged text)      |

use crate::wire::opcode;
use crate::{AppError, Result};

/// A reply from the completion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Request accepted without output, or revert acknowledged.
    Ok,
    /// Engine-side failure, to be surfaced to the user.
    Error(String),
    /// The engine's regex buffer is full; flush and start fresh.
    RegexFull,
    /// Languages the engine can complete.
    Capabilities(Vec<String>),
    /// Handle the engine assigned to the current cursor.
    CursorHandle(u8),
    /// The last typed character was rejected.
    InvalidChar,
    /// The engine started accumulating a user-defined pattern.
    RegexStart,
    /// Completion text replacing the active span.
    Expanded(String),
}

impl Response {
    /// Decode one complete frame.
    ///
    /// Untagged frames fall through to [`Response::Expanded`].
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] for an empty frame, a `CursorHandle`
    /// frame without its handle byte, or text that is not valid UTF-8.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let Some(&lead) = frame.first() else {
            return Err(AppError::Protocol("empty frame".into()));
        };

        match lead {
            opcode::OK => Ok(Self::Ok),
            opcode::ERROR => payload_text(&frame[1..]).map(|msg| Self::Error(msg.to_owned())),
            opcode::REGEX_FULL => Ok(Self::RegexFull),
            opcode::CAPABILITIES => payload_text(&frame[1..]).map(|list| {
                Self::Capabilities(
                    list.split(';')
                        .filter(|name| !name.is_empty())
                        .map(str::to_owned)
                        .collect(),
                )
            }),
            opcode::CURSOR_HANDLE => frame
                .get(1)
                .map(|handle| Self::CursorHandle(*handle))
                .ok_or_else(|| AppError::Protocol("cursor handle frame missing handle".into())),
            opcode::INVALID_CHAR => Ok(Self::InvalidChar),
            opcode::REGEX_START => Ok(Self::RegexStart),
            // Untagged: the whole frame is completion text.
            _ => payload_text(frame).map(|text| Self::Expanded(text.to_owned())),
        }
    }

    /// Short name used in log fields.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error(_) => "error",
            Self::RegexFull => "regex_full",
            Self::Capabilities(_) => "capabilities",
            Self::CursorHandle(_) => "cursor_handle",
            Self::InvalidChar => "invalid_char",
            Self::RegexStart => "regex_start",
            Self::Expanded(_) => "expanded",
        }
    }
}

/// UTF-8 payload with the trailing terminator, if any, excluded.
fn payload_text(payload: &[u8]) -> Result<&str> {
    let payload = match payload.split_last() {
        Some((&opcode::TERMINATOR, rest)) => rest,
        _ => payload,
    };
    std::str::from_utf8(payload)
        .map_err(|err| AppError::Protocol(format!("payload is not utf-8: {err}")))
}
