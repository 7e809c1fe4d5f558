//! Local text-splicing state that consumes engine replies.
//!
//! - `document`: the host editor collaborator ([`DocumentEditor`](document::DocumentEditor)).
//! - `buffer`: an in-memory document implementing that collaborator.
//! - `history`: bounded undo stack of active-span starts.
//! - `state`: the reply-driven [`EditStateMachine`](state::EditStateMachine).

pub mod buffer;
pub mod document;
pub mod history;
pub mod state;
