//! Host editor collaborator.
//!
//! The client never owns the document. It asks the host to mutate it through
//! [`DocumentEditor`] and learns about user edits through
//! [`DocumentChange`] notifications the host forwards to the session
//! registry. All offsets count Unicode scalar values.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;

use serde::Serialize;
use tracing::warn;

use crate::{AppError, Result};

/// Boxed future returned by [`DocumentEditor`] operations.
pub type EditFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Identity of an open document (a URI in most hosts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a host-provided document identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Zero-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// Line index.
    pub line: usize,
    /// Column within the line, in characters.
    pub character: usize,
}

impl Position {
    /// Build a position.
    #[must_use]
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

/// One content change reported by the host.
///
/// `removed` characters starting at `offset` were replaced by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Start of the changed range.
    pub offset: usize,
    /// Number of characters removed.
    pub removed: usize,
    /// Inserted text.
    pub text: String,
}

impl DocumentChange {
    /// A pure insertion.
    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            removed: 0,
            text: text.into(),
        }
    }

    /// A pure deletion.
    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self {
            offset: range.start,
            removed: range.len(),
            text: String::new(),
        }
    }
}

/// Document operations the client needs from its host.
///
/// Every mutation resolves only once the host has applied it, so the session
/// knows when it may release its insert lock.
pub trait DocumentEditor: Send + Sync {
    /// Replace `range` with `text`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EditConflict`](crate::AppError::EditConflict) if the
    /// range is inverted.
    fn replace<'a>(&'a self, range: Range<usize>, text: &'a str) -> EditFuture<'a, ()>;

    /// Insert `text` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the edit.
    fn insert<'a>(&'a self, offset: usize, text: &'a str) -> EditFuture<'a, ()>;

    /// Delete `range`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EditConflict`](crate::AppError::EditConflict) if the
    /// range is inverted.
    fn delete(&self, range: Range<usize>) -> EditFuture<'_, ()>;

    /// Offset engine edits are anchored at.
    ///
    /// While the reply to a typed character is pending this is the offset
    /// just before that character, where an editor's cursor sits when it
    /// reports the change. `Expanded` replaces the active span through
    /// `cursor + 1` and `InvalidChar` deletes `[cursor, cursor + 1)`, so both
    /// cover exactly the typed character. Once
    /// [`reply_applied`](Self::reply_applied) has been called the live cursor
    /// is reported again.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is no longer open.
    fn cursor_offset(&self) -> EditFuture<'_, usize>;

    /// Convert a position to an offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is no longer open.
    fn offset_at(&self, position: Position) -> EditFuture<'_, usize>;

    /// Convert an offset to a position.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is no longer open.
    fn position_at(&self, offset: usize) -> EditFuture<'_, Position>;

    /// Called after the session finished applying one reply.
    fn reply_applied(&self) {}

    /// Surface an engine error to the user.
    fn show_error(&self, error: &AppError) {
        warn!(error = %error, "completion engine error");
    }
}
