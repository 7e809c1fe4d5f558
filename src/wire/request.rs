//! Outbound requests and their byte layout.
//!
//! | Request           | Bytes                             |
//! |-------------------|-----------------------------------|
//! | `GetCapabilities` | `01`                              |
//! | `Revert`          | `03`                              |
//! | `Reset`           | `04`                              |
//! | `Initialize`      | `05` + utf8(language) + `00`      |
//! | `SetCursor`       | `06` + u16 handle (BE) + `00`     |
//! | `Advance`         | utf8(character) + `00` (untagged) |

use bytes::{BufMut, BytesMut};

use crate::wire::opcode;
use crate::{AppError, Result};

/// A command sent to the completion engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Ask which languages the engine can complete.
    GetCapabilities,
    /// Undo the engine's most recent step.
    Revert,
    /// Restart the engine's automaton for the current language.
    Reset,
    /// Select the grammar for the session's document.
    Initialize(String),
    /// Hand a cursor handle assigned by the engine back to it.
    SetCursor(u16),
    /// Feed one typed character.
    Advance(char),
}

/// Discriminant of a [`Request`], tracked as the session's last request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// [`Request::GetCapabilities`].
    GetCapabilities,
    /// [`Request::Revert`].
    Revert,
    /// [`Request::Reset`].
    Reset,
    /// [`Request::Initialize`].
    Initialize,
    /// [`Request::SetCursor`].
    SetCursor,
    /// [`Request::Advance`].
    Advance,
}

impl Request {
    /// Build an `Advance` request from a typed string.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] unless `text` is exactly one
    /// character, or if that character would be read as an opcode.
    pub fn advance(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return Err(AppError::InvalidRequest(format!(
                "advance takes exactly one character, got {text:?}"
            )));
        };
        if u32::from(ch) < u32::from(opcode::RESERVED_LIMIT) {
            return Err(AppError::InvalidRequest(format!(
                "character {ch:?} collides with a protocol opcode"
            )));
        }
        Ok(Self::Advance(ch))
    }

    /// Build an `Initialize` request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] if `language` is empty or contains
    /// a NUL byte.
    pub fn initialize(language: &str) -> Result<Self> {
        if language.is_empty() || language.contains('\0') {
            return Err(AppError::InvalidRequest(format!(
                "invalid language id {language:?}"
            )));
        }
        Ok(Self::Initialize(language.to_owned()))
    }

    /// The request's discriminant.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::GetCapabilities => RequestKind::GetCapabilities,
            Self::Revert => RequestKind::Revert,
            Self::Reset => RequestKind::Reset,
            Self::Initialize(_) => RequestKind::Initialize,
            Self::SetCursor(_) => RequestKind::SetCursor,
            Self::Advance(_) => RequestKind::Advance,
        }
    }

    /// Append the request's wire bytes to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        match self {
            Self::GetCapabilities => dst.put_u8(opcode::GET_CAPABILITIES),
            Self::Revert => dst.put_u8(opcode::REVERT),
            Self::Reset => dst.put_u8(opcode::RESET),
            Self::Initialize(language) => {
                dst.reserve(language.len() + 2);
                dst.put_u8(opcode::INITIALIZE);
                dst.put_slice(language.as_bytes());
                dst.put_u8(opcode::TERMINATOR);
            }
            Self::SetCursor(handle) => {
                dst.reserve(4);
                dst.put_u8(opcode::SET_CURSOR);
                dst.put_u16(*handle);
                dst.put_u8(opcode::TERMINATOR);
            }
            Self::Advance(ch) => {
                let mut utf8 = [0_u8; 4];
                dst.put_slice(ch.encode_utf8(&mut utf8).as_bytes());
                dst.put_u8(opcode::TERMINATOR);
            }
        }
    }

    /// Serialize the request to a fresh byte vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.to_vec()
    }
}
