//! Frame codec for the engine socket.
//!
//! Inbound bytes carry no length prefix. The first byte of each frame decides
//! how long it is:
//!
//! | First byte           | Frame                                   |
//! |----------------------|-----------------------------------------|
//! | `00` `02` `05` `06`  | that single byte                        |
//! | `04`                 | two bytes: opcode + handle              |
//! | `01` `03`            | through the next `00` terminator        |
//! | `07`                 | reserved noise, dropped                 |
//! | `08`..=`FF`          | untagged text through the next `00`     |
//!
//! A frame split across reads stays in the buffer until the rest arrives.
//!
//! # Usage
//!
//! Use [`FrameCodec`] with [`tokio_util::codec::FramedRead`] on the socket's
//! read half. Outbound requests are encoded by
//! [`Request::encode_into`](crate::wire::request::Request::encode_into) and
//! written by the writer task, which drops a failed request instead of
//! leaving its bytes queued for the next write.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use crate::wire::opcode;
use crate::{AppError, Result};

/// Default limit on a buffered unterminated frame: 1 MiB.
pub const MAX_FRAME_BYTES: usize = 1_048_576;

/// Splits the engine stream into frames.
#[derive(Debug)]
pub struct FrameCodec {
    max_frame_bytes: usize,
    /// Offset already scanned for a terminator in the pending frame.
    next_index: usize,
    /// Dropping an oversized frame through its terminator.
    discarding: bool,
}

impl FrameCodec {
    /// Create a codec with the default [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_bytes(MAX_FRAME_BYTES)
    }

    /// Create a codec with a custom limit on unterminated frames.
    #[must_use]
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            next_index: 0,
            discarding: false,
        }
    }

    /// Emit the NUL-terminated frame at the head of `src`, if complete.
    ///
    /// `body_start` skips the opcode byte of tagged frames so it is never
    /// mistaken for a terminator.
    fn take_terminated(&mut self, src: &mut BytesMut, body_start: usize) -> Option<Bytes> {
        let from = self.next_index.max(body_start);
        if let Some(offset) = src[from..]
            .iter()
            .position(|byte| *byte == opcode::TERMINATOR)
        {
            self.next_index = 0;
            return Some(src.split_to(from + offset + 1).freeze());
        }

        if src.len() > self.max_frame_bytes {
            warn!(
                buffered = src.len(),
                limit = self.max_frame_bytes,
                "frame codec: frame too long, discarding through next terminator"
            );
            src.clear();
            self.next_index = 0;
            self.discarding = true;
        } else {
            self.next_index = src.len();
        }
        None
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = AppError;

    /// Decode the next complete frame from `src`.
    ///
    /// Returns `Ok(None)` while the frame at the head of `src` is incomplete.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            if self.discarding {
                if let Some(pos) = src.iter().position(|byte| *byte == opcode::TERMINATOR) {
                    src.advance(pos + 1);
                    self.discarding = false;
                } else {
                    src.clear();
                    return Ok(None);
                }
            }

            let Some(&lead) = src.first() else {
                return Ok(None);
            };

            let frame = match lead {
                opcode::OK | opcode::REGEX_FULL | opcode::INVALID_CHAR | opcode::REGEX_START => {
                    Some(src.split_to(1).freeze())
                }
                opcode::CURSOR_HANDLE => (src.len() >= 2).then(|| src.split_to(2).freeze()),
                opcode::ERROR | opcode::CAPABILITIES => self.take_terminated(src, 1),
                noise if noise < opcode::RESERVED_LIMIT => {
                    trace!(byte = noise, "frame codec: dropping reserved control byte");
                    src.advance(1);
                    continue;
                }
                _ => self.take_terminated(src, 0),
            };
            return Ok(frame);
        }
    }

    /// Decode remaining frames at end of stream; a dangling partial frame is
    /// logged and dropped.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let frame = self.decode(src)?;
        if frame.is_none() && !src.is_empty() {
            warn!(
                remaining = src.len(),
                "frame codec: stream ended inside a frame"
            );
            src.clear();
            self.next_index = 0;
        }
        Ok(frame)
    }
}

