//! Unit tests for the edit state machine.
//!
//! Covers:
//! - initialise then expand: `print` replaces `[0, 2)`
//! - revert acknowledgement deletes the span and pops history
//! - regex start/full snaps the span and inserts a space
//! - edit conflicts leave the span untouched
//! - phase transitions and recorded replies

use nightfury_client::edit::state::{EditStateMachine, Effect, Phase};
use nightfury_client::wire::request::{Request, RequestKind};
use nightfury_client::wire::response::Response;

const DEPTH: usize = 16;

fn history_of(machine: &EditStateMachine) -> Vec<usize> {
    machine.history().iter().collect()
}

// ── Scenarios ───────────────────────────────────────────────────────────────

/// `Initialize` → `Ok` changes nothing; `Advance('p')` → `Expanded("print")`
/// with the cursor at 1 replaces `[0, 2)` and moves the span to 5.
#[test]
fn initialize_then_expand_print() {
    let mut machine = EditStateMachine::new(DEPTH);

    machine.on_request_sent(&Request::initialize("python").expect("valid language"));
    assert_eq!(machine.phase(), Phase::AwaitingReply);
    let effects = machine.apply(Response::Ok, 0);
    assert!(effects.is_empty(), "initialize ack must not touch the document");
    assert_eq!(machine.phase(), Phase::Idle);

    machine.on_request_sent(&Request::Advance('p'));
    let effects = machine.apply(Response::Expanded("print".into()), 1);

    assert_eq!(
        effects,
        vec![Effect::Replace {
            range: 0..2,
            text: "print".into()
        }]
    );
    assert_eq!(machine.span_start(), 5);
    assert_eq!(history_of(&machine), vec![0]);
    assert_eq!(machine.phase(), Phase::Idle);
}

/// Span 5 with history `[0]`: a revert acknowledgement deletes `[5, cursor)`
/// and pops the span back to 0.
#[test]
fn revert_ack_deletes_span_and_pops_history() {
    let mut machine = EditStateMachine::with_span(DEPTH, 5, &[0]);

    machine.on_request_sent(&Request::Revert);
    let effects = machine.apply(Response::Ok, 8);

    assert_eq!(effects, vec![Effect::Delete { range: 5..8 }]);
    assert_eq!(machine.span_start(), 0);
    assert!(machine.history().is_empty());
}

/// `RegexStart` then `RegexFull` after an `Advance` with the cursor at 10 and
/// the span at 3: the span snaps to 10, a space goes in at 10, span ends at 11.
#[test]
fn regex_full_snaps_span_and_inserts_space() {
    let mut machine = EditStateMachine::with_span(DEPTH, 3, &[]);

    machine.on_request_sent(&Request::Advance('['));
    assert!(machine.apply(Response::RegexStart, 9).is_empty());
    assert!(machine.in_regex());

    machine.on_request_sent(&Request::Advance('a'));
    let effects = machine.apply(Response::RegexFull, 10);

    assert_eq!(
        effects,
        vec![Effect::Insert {
            offset: 10,
            text: " ".into()
        }]
    );
    assert_eq!(machine.span_start(), 11);
    assert_eq!(history_of(&machine), vec![3]);
    assert!(!machine.in_regex());
}

/// `RegexFull` after a non-`Advance` request inserts at the current span
/// without snapping it.
#[test]
fn regex_full_after_revert_keeps_span() {
    let mut machine = EditStateMachine::with_span(DEPTH, 4, &[]);

    machine.on_request_sent(&Request::Revert);
    let effects = machine.apply(Response::RegexFull, 9);

    assert_eq!(
        effects,
        vec![Effect::Insert {
            offset: 4,
            text: " ".into()
        }]
    );
    assert_eq!(machine.span_start(), 5);
    assert!(machine.history().is_empty());
}

// ── Revert ──────────────────────────────────────────────────────────────────

/// Expansion followed by a revert acknowledgement restores the span start
/// and history depth from before the expansion.
#[test]
fn revert_after_expansion_restores_span_and_depth() {
    let mut machine = EditStateMachine::with_span(DEPTH, 2, &[0]);
    let before = (machine.span_start(), machine.history().depth());

    machine.on_request_sent(&Request::Advance('h'));
    machine.apply(Response::Expanded("hi".into()), 2);
    assert_eq!(machine.span_start(), 4);

    machine.on_request_sent(&Request::Revert);
    machine.apply(Response::Ok, 4);

    assert_eq!((machine.span_start(), machine.history().depth()), before);
}

/// An `Expanded` arriving after a `Revert` is treated as the revert
/// acknowledgement, not as new text.
#[test]
fn expanded_after_revert_reverts() {
    let mut machine = EditStateMachine::with_span(DEPTH, 6, &[1]);

    machine.on_request_sent(&Request::Revert);
    let effects = machine.apply(Response::Expanded("stale".into()), 9);

    assert_eq!(effects, vec![Effect::Delete { range: 6..9 }]);
    assert_eq!(machine.span_start(), 1);
}

/// Reverting with no history falls back to the document start.
#[test]
fn revert_with_empty_history_falls_back_to_start() {
    let mut machine = EditStateMachine::with_span(DEPTH, 3, &[]);

    machine.on_request_sent(&Request::Revert);
    let effects = machine.apply(Response::Ok, 3);

    assert!(effects.is_empty(), "empty span deletes nothing");
    assert_eq!(machine.span_start(), 0);
}

/// A span past the cursor skips the delete but still pops history, since the
/// engine has already stepped back.
#[test]
fn revert_conflict_skips_delete() {
    let mut machine = EditStateMachine::with_span(DEPTH, 7, &[2]);

    machine.on_request_sent(&Request::Revert);
    let effects = machine.apply(Response::Ok, 4);

    assert!(effects.is_empty());
    assert_eq!(machine.span_start(), 2);
}

// ── Conflicts and other replies ─────────────────────────────────────────────

/// An expansion whose span starts past the cursor is skipped and the span
/// stays where it was.
#[test]
fn expansion_conflict_leaves_span_unchanged() {
    let mut machine = EditStateMachine::with_span(DEPTH, 10, &[4]);

    machine.on_request_sent(&Request::Advance('x'));
    let effects = machine.apply(Response::Expanded("xyz".into()), 3);

    assert!(effects.is_empty());
    assert_eq!(machine.span_start(), 10);
    assert_eq!(history_of(&machine), vec![4]);
    assert_eq!(machine.phase(), Phase::Idle);
}

/// `Ok` while accumulating a pattern commits everything before the cursor.
#[test]
fn ok_in_regex_commits_span() {
    let mut machine = EditStateMachine::with_span(DEPTH, 2, &[]);
    machine.on_request_sent(&Request::Advance('('));
    machine.apply(Response::RegexStart, 5);

    machine.on_request_sent(&Request::Advance('a'));
    let effects = machine.apply(Response::Ok, 6);

    assert!(effects.is_empty());
    assert_eq!(machine.span_start(), 6);
    assert_eq!(history_of(&machine), vec![2]);
    assert!(machine.in_regex(), "ok does not end the pattern");
}

/// Acknowledging a restored cursor handle never commits the span, even
/// inside a pattern.
#[test]
fn set_cursor_ack_keeps_span_in_regex() {
    let mut machine = EditStateMachine::with_span(DEPTH, 2, &[]);
    machine.on_request_sent(&Request::Advance('('));
    machine.apply(Response::RegexStart, 5);
    machine.apply(Response::CursorHandle(7), 5);
    assert_eq!(machine.cursor_handle(), Some(7));

    machine.on_request_sent(&Request::SetCursor(7));
    let effects = machine.apply(Response::Ok, 6);

    assert!(effects.is_empty());
    assert_eq!(machine.span_start(), 2);
    assert!(machine.history().is_empty());
    assert!(machine.in_regex());
    assert_eq!(machine.phase(), Phase::Idle);
}

/// Plain `Ok` outside a pattern leaves the span alone.
#[test]
fn plain_ok_is_a_no_op() {
    let mut machine = EditStateMachine::with_span(DEPTH, 2, &[]);

    machine.on_request_sent(&Request::Advance('a'));
    assert!(machine.apply(Response::Ok, 3).is_empty());
    assert_eq!(machine.span_start(), 2);
}

/// A rejected character is deleted right after the cursor.
#[test]
fn invalid_char_deletes_after_cursor() {
    let mut machine = EditStateMachine::with_span(DEPTH, 1, &[]);

    machine.on_request_sent(&Request::Advance('#'));
    let effects = machine.apply(Response::InvalidChar, 4);

    assert_eq!(effects, vec![Effect::Delete { range: 4..5 }]);
    assert_eq!(machine.span_start(), 1, "span must not move");
}

/// Engine errors are surfaced without touching the span.
#[test]
fn error_is_surfaced() {
    let mut machine = EditStateMachine::with_span(DEPTH, 3, &[0]);

    machine.on_request_sent(&Request::Advance('q'));
    let effects = machine.apply(Response::Error("no grammar".into()), 4);

    assert_eq!(effects, vec![Effect::ShowError("no grammar".into())]);
    assert_eq!(machine.span_start(), 3);
    assert_eq!(machine.phase(), Phase::Idle);
}

/// `Reset` acknowledgement restarts the span at the cursor with no history.
#[test]
fn reset_ack_restarts_at_cursor() {
    let mut machine = EditStateMachine::with_span(DEPTH, 5, &[0, 2]);
    machine.on_request_sent(&Request::Advance('('));
    machine.apply(Response::RegexStart, 5);

    machine.on_request_sent(&Request::Reset);
    let effects = machine.apply(Response::Ok, 12);

    assert!(effects.is_empty());
    assert_eq!(machine.span_start(), 12);
    assert!(machine.history().is_empty());
    assert!(!machine.in_regex());
}

/// Cursor handles and capabilities are recorded in the snapshot.
#[test]
fn handles_and_capabilities_are_recorded() {
    let mut machine = EditStateMachine::new(DEPTH);

    machine.on_request_sent(&Request::GetCapabilities);
    machine.apply(Response::Capabilities(vec!["c".into(), "python".into()]), 0);
    machine.apply(Response::CursorHandle(3), 0);

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.capabilities, vec!["c".to_owned(), "python".to_owned()]);
    assert_eq!(snapshot.cursor_handle, Some(3));
    assert_eq!(snapshot.last_request, Some(RequestKind::GetCapabilities));
}

/// A timed-out wait returns to idle without other changes.
#[test]
fn expire_wait_returns_to_idle() {
    let mut machine = EditStateMachine::with_span(DEPTH, 4, &[1]);

    machine.on_request_sent(&Request::Advance('z'));
    machine.expire_wait();

    assert_eq!(machine.phase(), Phase::Idle);
    assert_eq!(machine.span_start(), 4);
    assert_eq!(machine.last_request(), Some(RequestKind::Advance));
}

/// The snapshot serializes phase and request kinds in snake case.
#[test]
fn snapshot_serializes() {
    let mut machine = EditStateMachine::new(DEPTH);
    machine.on_request_sent(&Request::Reset);

    let json = serde_json::to_value(machine.snapshot()).expect("serialize snapshot");

    assert_eq!(json["phase"], "awaiting_reply");
    assert_eq!(json["last_request"], "reset");
    assert_eq!(json["span_start"], 0);
}
