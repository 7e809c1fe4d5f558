//! Binary wire protocol spoken with the completion engine.
//!
//! Every message starts with a one-byte opcode, except untagged text
//! (`Advance` requests and `Expanded` replies) which is recognised by the
//! absence of a known opcode. Variable-length messages end in a NUL byte.
//!
//! - `codec`: [`FrameCodec`](codec::FrameCodec) splits the inbound byte stream
//!   into frames.
//! - `request`: outbound commands and their byte layout.
//! - `response`: typed decoding of a single inbound frame.
//! - `reader`: async task turning socket bytes into decoded replies.
//! - `writer`: async task writing queued requests to the socket.

pub mod codec;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;

/// Opcode bytes shared by requests and replies.
pub mod opcode {
    /// Reply `Ok`; also the NUL terminator of variable-length frames.
    pub const OK: u8 = 0x00;
    /// Reply `Error` (NUL-terminated message); request `GetCapabilities`.
    pub const ERROR: u8 = 0x01;
    /// Reply `RegexFull`.
    pub const REGEX_FULL: u8 = 0x02;
    /// Reply `Capabilities` (NUL-terminated list); request `Revert`.
    pub const CAPABILITIES: u8 = 0x03;
    /// Reply `CursorHandle` (two bytes); request `Reset`.
    pub const CURSOR_HANDLE: u8 = 0x04;
    /// Reply `InvalidChar`; request `Initialize`.
    pub const INVALID_CHAR: u8 = 0x05;
    /// Reply `RegexStart`; request `SetCursor`.
    pub const REGEX_START: u8 = 0x06;
    /// Bytes below this value are reserved for opcodes.
    pub const RESERVED_LIMIT: u8 = 0x08;

    /// Request `GetCapabilities`.
    pub const GET_CAPABILITIES: u8 = ERROR;
    /// Request `Revert`.
    pub const REVERT: u8 = CAPABILITIES;
    /// Request `Reset`.
    pub const RESET: u8 = CURSOR_HANDLE;
    /// Request `Initialize`.
    pub const INITIALIZE: u8 = INVALID_CHAR;
    /// Request `SetCursor` (u16 handle, NUL-terminated).
    pub const SET_CURSOR: u8 = REGEX_START;

    /// Frame terminator.
    pub const TERMINATOR: u8 = OK;
}
