//! Per-session reply worker.
//!
//! Drains the reply channel strictly in arrival order. For each reply it
//! raises the session's insert lock, reads the cursor, runs the edit state
//! machine, and performs the resulting effects against the host document
//! before taking the next reply. The lock guard is dropped on every exit
//! path, including cursor and mutation failures.
//!
//! While a request is outstanding the worker also watches the reply timeout;
//! when it elapses the session goes back to idle with a warning.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::edit::document::DocumentEditor;
use crate::edit::state::{Effect, EditStateMachine, Phase};
use crate::session::lock::InsertLock;
use crate::wire::response::Response;
use crate::{AppError, Result};

/// Everything the worker shares with its session.
pub struct WorkerContext {
    /// Document identity, for log fields.
    pub document: String,
    /// The session's edit state.
    pub machine: Arc<Mutex<EditStateMachine>>,
    /// Host document.
    pub editor: Arc<dyn DocumentEditor>,
    /// The session's insert lock.
    pub insert_lock: InsertLock,
    /// Signalled whenever a request is sent.
    pub request_sent: Arc<Notify>,
    /// How long to wait for a reply; `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

/// Worker task: decoded replies in, document mutations out.
///
/// Exits when `cancel` fires or the reader drops its end of `reply_rx`.
pub async fn run_worker(
    ctx: WorkerContext,
    mut reply_rx: mpsc::Receiver<Response>,
    cancel: CancellationToken,
) {
    let document = ctx.document.as_str();
    let mut deadline: Option<Instant> = None;

    loop {
        let awaiting = lock_machine(&ctx.machine).phase() == Phase::AwaitingReply;
        deadline = match (awaiting, ctx.reply_timeout) {
            (true, Some(timeout)) => Some(deadline.unwrap_or_else(|| Instant::now() + timeout)),
            _ => None,
        };
        let timer = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now));

        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(document, "reply worker: cancellation received, stopping");
                break;
            }

            reply = reply_rx.recv() => {
                let Some(reply) = reply else {
                    debug!(document, "reply worker: reply channel closed, stopping");
                    break;
                };
                deadline = None;
                apply_reply(&ctx, reply).await;
            }

            () = ctx.request_sent.notified() => {}

            () = timer, if deadline.is_some() => {
                warn!(document, "reply worker: engine did not reply in time, returning to idle");
                lock_machine(&ctx.machine).expire_wait();
                deadline = None;
            }
        }
    }
}

/// Apply a single reply under the insert lock.
pub async fn apply_reply(ctx: &WorkerContext, reply: Response) {
    let document = ctx.document.as_str();
    let _guard = ctx.insert_lock.acquire();
    let reply_name = reply.name();

    let cursor = match ctx.editor.cursor_offset().await {
        Ok(cursor) => cursor,
        Err(e) => {
            warn!(document, error = %e, reply = reply_name, "reply worker: cursor unavailable, reply dropped");
            lock_machine(&ctx.machine).expire_wait();
            ctx.editor.reply_applied();
            return;
        }
    };

    let effects = lock_machine(&ctx.machine).apply(reply, cursor);
    debug!(
        document,
        reply = reply_name,
        cursor,
        effects = effects.len(),
        "reply worker: reply applied"
    );

    for effect in effects {
        if let Err(e) = perform(ctx.editor.as_ref(), effect).await {
            warn!(document, error = %e, "reply worker: document edit failed, skipped");
        }
    }
    ctx.editor.reply_applied();
}

async fn perform(editor: &dyn DocumentEditor, effect: Effect) -> Result<()> {
    match effect {
        Effect::Replace { range, text } => editor.replace(range, &text).await,
        Effect::Insert { offset, text } => editor.insert(offset, &text).await,
        Effect::Delete { range } => editor.delete(range).await,
        Effect::ShowError(message) => {
            editor.show_error(&AppError::Engine(message));
            Ok(())
        }
    }
}

/// Lock the edit state, recovering from poisoning.
pub(crate) fn lock_machine(
    machine: &Mutex<EditStateMachine>,
) -> std::sync::MutexGuard<'_, EditStateMachine> {
    machine.lock().unwrap_or_else(PoisonError::into_inner)
}
