//! Bounded undo stack of previous active-span starts.

use std::collections::VecDeque;

/// Stack of prior span starts, newest last.
///
/// When full, pushing drops the oldest entry, so the depth bounds how many
/// steps can be reverted. Popping an empty history yields the document start.
#[derive(Debug, Clone)]
pub struct SpanHistory {
    starts: VecDeque<usize>,
    max_depth: usize,
}

impl SpanHistory {
    /// Empty history keeping at most `max_depth` entries (at least one).
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        let max_depth = max_depth.max(1);
        Self {
            starts: VecDeque::with_capacity(max_depth.min(64)),
            max_depth,
        }
    }

    /// Record a span start being superseded.
    pub fn push(&mut self, start: usize) {
        if self.starts.len() == self.max_depth {
            self.starts.pop_front();
        }
        self.starts.push_back(start);
    }

    /// Previous span start, or 0 when nothing is left to undo.
    pub fn pop_or_start(&mut self) -> usize {
        self.starts.pop_back().unwrap_or(0)
    }

    /// Most recent entry without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<usize> {
        self.starts.back().copied()
    }

    /// Number of undoable steps.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.starts.len()
    }

    /// Whether nothing can be undone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Forget every step.
    pub fn clear(&mut self) {
        self.starts.clear();
    }

    /// Entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.starts.iter().copied()
    }
}
