//! In-memory [`DocumentEditor`] used by the CLI and the test suite.
//!
//! Ranges are clamped to the document the way editors validate them, and the
//! cursor follows edits: text inserted at or before the cursor pushes it
//! right. Every mutation, programmatic or typed, is reported synchronously to
//! the registered change listener before the mutation's future resolves,
//! which is how a real editor delivers its change events.
//!
//! A typed character leaves an anchor at its own offset. Until the reply to
//! it has been applied, [`DocumentEditor::cursor_offset`] reports that anchor
//! instead of the live cursor, so engine edits land on the typed character
//! rather than on the text after it.

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use crate::edit::document::{DocumentChange, DocumentEditor, EditFuture, Position};
use crate::{AppError, Result};

type ChangeListener = Arc<dyn Fn(&DocumentChange) + Send + Sync>;

#[derive(Default)]
struct BufferState {
    chars: Vec<char>,
    cursor: usize,
    /// Offset of the last typed character while its reply is pending.
    typed_at: Option<usize>,
}

/// Who made a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// The user typed a character.
    Typed,
    /// The user deleted text.
    Deleted,
    /// An edit requested through [`DocumentEditor`].
    Editor,
}

/// Plain text document with a single cursor.
#[derive(Default)]
pub struct TextBuffer {
    state: Mutex<BufferState>,
    listener: Mutex<Option<ChangeListener>>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TextBuffer")
            .field("text", &state.chars.iter().collect::<String>())
            .field("cursor", &state.cursor)
            .finish_non_exhaustive()
    }
}

impl TextBuffer {
    /// Empty document, cursor at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding `text` with the cursor at its end.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        Self {
            state: Mutex::new(BufferState {
                chars,
                cursor,
                typed_at: None,
            }),
            listener: Mutex::new(None),
        }
    }

    /// Register the callback receiving every change.
    pub fn set_change_listener(&self, listener: impl Fn(&DocumentChange) + Send + Sync + 'static) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(listener));
    }

    /// Current document text.
    #[must_use]
    pub fn text(&self) -> String {
        self.lock().chars.iter().collect()
    }

    /// Current cursor offset.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// Document length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().chars.len()
    }

    /// Whether the document is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset engine edits are currently anchored at.
    #[must_use]
    pub fn edit_cursor(&self) -> usize {
        let state = self.lock();
        state.typed_at.unwrap_or(state.cursor)
    }

    /// Move the cursor, clamped to the document.
    pub fn set_cursor(&self, offset: usize) {
        let mut state = self.lock();
        state.cursor = offset.min(state.chars.len());
        state.typed_at = None;
    }

    /// Simulate the user typing `ch` at the cursor.
    pub fn type_char(&self, ch: char) {
        let cursor = self.cursor();
        let mut utf8 = [0_u8; 4];
        // A typed character at the cursor can never be an inverted range.
        let _ = self.splice(cursor..cursor, ch.encode_utf8(&mut utf8), Origin::Typed);
    }

    /// Simulate the user pressing backspace; returns whether anything was
    /// deleted.
    #[must_use]
    pub fn backspace(&self) -> bool {
        let cursor = self.cursor();
        if cursor == 0 {
            return false;
        }
        self.splice(cursor - 1..cursor, "", Origin::Deleted).is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace `range` with `text`, move the cursor, notify the listener.
    fn splice(&self, range: Range<usize>, text: &str, origin: Origin) -> Result<()> {
        if range.start > range.end {
            return Err(AppError::EditConflict(format!(
                "inverted range {}..{}",
                range.start, range.end
            )));
        }

        let change = {
            let mut state = self.lock();
            let len = state.chars.len();
            let start = range.start.min(len);
            let end = range.end.min(len);
            let inserted: Vec<char> = text.chars().collect();
            let inserted_len = inserted.len();
            state.chars.splice(start..end, inserted);

            let cursor = state.cursor;
            state.cursor = if end <= cursor {
                cursor - (end - start) + inserted_len
            } else if start < cursor {
                start + inserted_len
            } else {
                cursor
            };
            state.typed_at = (origin == Origin::Typed).then_some(start);

            DocumentChange {
                offset: start,
                removed: end - start,
                text: text.to_owned(),
            }
        };

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(&change);
        }
        Ok(())
    }

    fn offset_of(&self, position: Position) -> usize {
        let state = self.lock();
        let mut line = 0;
        for (offset, ch) in state.chars.iter().enumerate() {
            if line == position.line {
                let line_len = state.chars[offset..]
                    .iter()
                    .take_while(|c| **c != '\n')
                    .count();
                return offset + position.character.min(line_len);
            }
            if *ch == '\n' {
                line += 1;
            }
        }
        state.chars.len()
    }

    fn position_of(&self, offset: usize) -> Position {
        let state = self.lock();
        let offset = offset.min(state.chars.len());
        let before = &state.chars[..offset];
        let line = before.iter().filter(|c| **c == '\n').count();
        let character = before.iter().rev().take_while(|c| **c != '\n').count();
        Position { line, character }
    }
}

impl DocumentEditor for TextBuffer {
    fn replace<'a>(&'a self, range: Range<usize>, text: &'a str) -> EditFuture<'a, ()> {
        Box::pin(async move { self.splice(range, text, Origin::Editor) })
    }

    fn insert<'a>(&'a self, offset: usize, text: &'a str) -> EditFuture<'a, ()> {
        Box::pin(async move { self.splice(offset..offset, text, Origin::Editor) })
    }

    fn delete(&self, range: Range<usize>) -> EditFuture<'_, ()> {
        Box::pin(async move { self.splice(range, "", Origin::Editor) })
    }

    fn cursor_offset(&self) -> EditFuture<'_, usize> {
        Box::pin(async move { Ok(self.edit_cursor()) })
    }

    fn reply_applied(&self) {
        self.lock().typed_at = None;
    }

    fn offset_at(&self, position: Position) -> EditFuture<'_, usize> {
        Box::pin(async move { Ok(self.offset_of(position)) })
    }

    fn position_at(&self, offset: usize) -> EditFuture<'_, Position> {
        Box::pin(async move { Ok(self.position_of(offset)) })
    }
}
