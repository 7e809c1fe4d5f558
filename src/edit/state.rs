//! Client-side edit state machine.
//!
//! The machine owns the *active span*: the offset where the text the engine
//! is currently completing begins. The span ends at the cursor. Each decoded
//! reply is turned into a list of [`Effect`]s for the host document and an
//! update of the span and its undo history.
//!
//! The machine is synchronous and never touches the document itself; the
//! session worker reads the cursor, calls [`EditStateMachine::apply`], and
//! then performs the returned effects in order.
//!
//! | Reply            | Effect                                                |
//! |------------------|-------------------------------------------------------|
//! | `Ok`             | revert after `Revert`; restart after `Initialize`     |
//! |                  | or `Reset`; commit span while in regex                |
//! | `Error`          | show message                                          |
//! | `RegexFull`      | leave regex; snap span after `Advance`; insert `" "`  |
//! | `RegexStart`     | enter regex                                           |
//! | `InvalidChar`    | delete the character after the cursor                 |
//! | `CursorHandle`   | record handle                                         |
//! | `Capabilities`   | record names                                          |
//! | `Expanded`       | revert after `Revert`; else replace the active span   |

use std::ops::Range;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::edit::history::SpanHistory;
use crate::wire::request::{Request, RequestKind};
use crate::wire::response::Response;

/// Whether the session is waiting on the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No reply outstanding.
    #[default]
    Idle,
    /// A request was sent and its reply has not been applied yet.
    AwaitingReply,
}

/// A document operation requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace `range` with `text`.
    Replace {
        /// Range to replace.
        range: Range<usize>,
        /// Replacement text.
        text: String,
    },
    /// Insert `text` at `offset`.
    Insert {
        /// Insertion point.
        offset: usize,
        /// Inserted text.
        text: String,
    },
    /// Delete `range`.
    Delete {
        /// Range to delete.
        range: Range<usize>,
    },
    /// Show an engine error to the user.
    ShowError(String),
}

/// Point-in-time view of a session's edit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSnapshot {
    /// Start of the active span.
    pub span_start: usize,
    /// Number of undoable span steps.
    pub history_depth: usize,
    /// Waiting on the engine or not.
    pub phase: Phase,
    /// Engine is accumulating a pattern.
    pub in_regex: bool,
    /// Most recent request sent.
    pub last_request: Option<RequestKind>,
    /// Last cursor handle assigned by the engine.
    pub cursor_handle: Option<u8>,
    /// Languages reported by the engine.
    pub capabilities: Vec<String>,
}

/// Per-document edit state driven by engine replies.
#[derive(Debug, Clone)]
pub struct EditStateMachine {
    span_start: usize,
    history: SpanHistory,
    in_regex: bool,
    phase: Phase,
    last_request: Option<RequestKind>,
    cursor_handle: Option<u8>,
    capabilities: Vec<String>,
}

impl EditStateMachine {
    /// Fresh machine with the span at the document start.
    #[must_use]
    pub fn new(history_depth: usize) -> Self {
        Self {
            span_start: 0,
            history: SpanHistory::new(history_depth),
            in_regex: false,
            phase: Phase::Idle,
            last_request: None,
            cursor_handle: None,
            capabilities: Vec::new(),
        }
    }

    /// Machine positioned at `span_start` with the given prior starts
    /// (oldest first).
    #[must_use]
    pub fn with_span(history_depth: usize, span_start: usize, history: &[usize]) -> Self {
        let mut machine = Self::new(history_depth);
        machine.span_start = span_start;
        for start in history {
            machine.history.push(*start);
        }
        machine
    }

    /// Start of the active span.
    #[must_use]
    pub fn span_start(&self) -> usize {
        self.span_start
    }

    /// Undo history of span starts.
    #[must_use]
    pub fn history(&self) -> &SpanHistory {
        &self.history
    }

    /// Whether the engine is accumulating a pattern.
    #[must_use]
    pub fn in_regex(&self) -> bool {
        self.in_regex
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Most recent request sent.
    #[must_use]
    pub fn last_request(&self) -> Option<RequestKind> {
        self.last_request
    }

    /// Last cursor handle assigned by the engine.
    #[must_use]
    pub fn cursor_handle(&self) -> Option<u8> {
        self.cursor_handle
    }

    /// Copy of the observable state.
    #[must_use]
    pub fn snapshot(&self) -> EditSnapshot {
        EditSnapshot {
            span_start: self.span_start,
            history_depth: self.history.depth(),
            phase: self.phase,
            in_regex: self.in_regex,
            last_request: self.last_request,
            cursor_handle: self.cursor_handle,
            capabilities: self.capabilities.clone(),
        }
    }

    /// Record that `request` went out; its reply is now pending.
    pub fn on_request_sent(&mut self, request: &Request) {
        self.last_request = Some(request.kind());
        self.phase = Phase::AwaitingReply;
    }

    /// Give up on the outstanding reply.
    pub fn expire_wait(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Apply one reply with the cursor at `cursor` and return the document
    /// effects to perform, in order.
    pub fn apply(&mut self, response: Response, cursor: usize) -> Vec<Effect> {
        let reverting = self.last_request == Some(RequestKind::Revert);
        let mut effects = Vec::new();

        match response {
            Response::Ok | Response::Expanded(_) if reverting => self.revert(cursor, &mut effects),
            Response::Ok => match self.last_request {
                Some(RequestKind::Initialize | RequestKind::Reset) => self.restart(cursor),
                Some(RequestKind::SetCursor) => debug!("engine acknowledged cursor handle"),
                _ if self.in_regex => self.move_span(cursor),
                _ => {}
            },
            Response::Error(message) => {
                warn!(message = %message, "engine reported an error");
                effects.push(Effect::ShowError(message));
            }
            Response::RegexFull => {
                self.in_regex = false;
                if self.last_request == Some(RequestKind::Advance) {
                    self.move_span(cursor);
                }
                effects.push(Effect::Insert {
                    offset: self.span_start,
                    text: " ".to_owned(),
                });
                self.span_start += 1;
            }
            Response::RegexStart => self.in_regex = true,
            Response::InvalidChar => effects.push(Effect::Delete {
                range: cursor..cursor + 1,
            }),
            Response::CursorHandle(handle) => {
                debug!(handle, "engine assigned cursor handle");
                self.cursor_handle = Some(handle);
            }
            Response::Capabilities(names) => {
                info!(count = names.len(), "engine capabilities received");
                self.capabilities = names;
            }
            Response::Expanded(text) => {
                let range = self.span_start..cursor + 1;
                if range.start > range.end {
                    warn!(
                        span_start = self.span_start,
                        cursor, "edit conflict: span starts past the cursor, expansion skipped"
                    );
                } else {
                    let old_start = self.span_start;
                    self.history.push(old_start);
                    self.span_start = old_start + text.chars().count();
                    effects.push(Effect::Replace { range, text });
                }
            }
        }

        self.phase = Phase::Idle;
        effects
    }

    /// Delete the active span and fall back to the previous span start.
    fn revert(&mut self, cursor: usize, effects: &mut Vec<Effect>) {
        if self.span_start > cursor {
            warn!(
                span_start = self.span_start,
                cursor, "edit conflict: span starts past the cursor, revert delete skipped"
            );
        } else if self.span_start < cursor {
            effects.push(Effect::Delete {
                range: self.span_start..cursor,
            });
        }
        self.span_start = self.history.pop_or_start();
        debug!(span_start = self.span_start, "span reverted");
    }

    /// Commit everything before `cursor`; the span now starts there.
    fn move_span(&mut self, cursor: usize) {
        self.history.push(self.span_start);
        self.span_start = cursor;
    }

    /// The engine started over: nothing before the cursor is revertible.
    fn restart(&mut self, cursor: usize) {
        self.history.clear();
        self.in_regex = false;
        self.span_start = cursor;
    }
}
