//! One document's binding to the completion engine.
//!
//! A [`Session`] owns three tasks: the engine reader, the engine writer, and
//! the reply worker. Requests are queued to the writer without waiting for
//! delivery; replies flow reader → worker in arrival order.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ClientConfig;
use crate::edit::document::{DocumentChange, DocumentEditor, DocumentId};
use crate::edit::state::{EditSnapshot, EditStateMachine, Phase};
use crate::session::connection::EngineStream;
use crate::session::lock::InsertLock;
use crate::session::worker::{lock_machine, run_worker, WorkerContext};
use crate::wire::codec::FrameCodec;
use crate::wire::reader::run_reader;
use crate::wire::request::Request;
use crate::wire::writer::run_writer;
use crate::{AppError, Result};

/// Capacity of the decoded-reply queue between reader and worker.
const REPLY_QUEUE_CAPACITY: usize = 256;

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Document the session is bound to.
    pub document: DocumentId,
    /// Language the engine was initialised with.
    pub language: String,
    /// Whether a reply is being applied right now.
    pub insert_locked: bool,
    /// Edit state.
    #[serde(flatten)]
    pub edit: EditSnapshot,
}

/// Live binding of one document to one engine connection.
pub struct Session {
    document: DocumentId,
    language: String,
    machine: Arc<Mutex<EditStateMachine>>,
    insert_lock: InsertLock,
    request_tx: mpsc::UnboundedSender<Request>,
    request_sent: Arc<Notify>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("document", &self.document)
            .field("language", &self.language)
            .field("insert_locked", &self.insert_lock.is_held())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Spawn the reader, writer, and worker tasks over an open connection.
    ///
    /// Must be called from within a tokio runtime. No request is sent yet.
    #[must_use]
    pub fn spawn(
        document: DocumentId,
        language: &str,
        stream: EngineStream,
        editor: Arc<dyn DocumentEditor>,
        config: &ClientConfig,
    ) -> Self {
        let machine = Arc::new(Mutex::new(EditStateMachine::new(config.history_depth)));
        let insert_lock = InsertLock::new();
        let request_sent = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::channel(REPLY_QUEUE_CAPACITY);

        let name = document.to_string();
        let reader = tokio::spawn(
            run_reader(
                name.clone(),
                stream.reader,
                FrameCodec::with_max_frame_bytes(config.max_frame_bytes),
                reply_tx,
                cancel.clone(),
            )
            .instrument(info_span!("session_reader", document = %name)),
        );
        let writer = tokio::spawn(
            run_writer(name.clone(), stream.writer, request_rx, cancel.clone())
                .instrument(info_span!("session_writer", document = %name)),
        );
        let worker = tokio::spawn(
            run_worker(
                WorkerContext {
                    document: name.clone(),
                    machine: Arc::clone(&machine),
                    editor,
                    insert_lock: insert_lock.clone(),
                    request_sent: Arc::clone(&request_sent),
                    reply_timeout: config.reply_timeout(),
                },
                reply_rx,
                cancel.clone(),
            )
            .instrument(info_span!("session_worker", document = %name)),
        );

        info!(document = %name, language, "session started");

        Self {
            document,
            language: language.to_owned(),
            machine,
            insert_lock,
            request_tx,
            request_sent,
            cancel,
            tasks: Mutex::new(vec![reader, writer, worker]),
        }
    }

    /// Document this session is bound to.
    #[must_use]
    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Language the session was initialised with.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Queue `request` for the engine and record it as the last request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connection`] if the session's writer has stopped.
    pub fn send(&self, request: Request) -> Result<()> {
        let kind = request.kind();
        lock_machine(&self.machine).on_request_sent(&request);
        self.request_tx.send(request).map_err(|_| {
            AppError::Connection(format!("session for {} is closed", self.document))
        })?;
        self.request_sent.notify_one();
        debug!(document = %self.document, request = ?kind, "request queued");
        Ok(())
    }

    /// Hand the last cursor handle the engine assigned back to it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the engine never assigned a handle,
    /// or [`AppError::Connection`] if the session's writer has stopped.
    pub fn restore_cursor(&self) -> Result<()> {
        let handle = lock_machine(&self.machine).cursor_handle();
        let Some(handle) = handle else {
            return Err(AppError::NotFound(format!(
                "no cursor handle assigned for {}",
                self.document
            )));
        };
        self.send(Request::SetCursor(u16::from(handle)))
    }

    /// Turn a host document change into engine requests.
    ///
    /// Changes reported while the insert lock is held are echoes of the
    /// session's own edits and are ignored. Otherwise each removed character
    /// becomes one `Revert`, and a single inserted character becomes an
    /// `Advance`. Returns the number of requests queued.
    #[must_use]
    pub fn handle_change(&self, change: &DocumentChange) -> usize {
        if self.insert_lock.is_held() {
            debug!(document = %self.document, offset = change.offset, "ignoring change made by the session");
            return 0;
        }

        let mut sent = 0;
        for _ in 0..change.removed {
            if let Err(e) = self.send(Request::Revert) {
                warn!(document = %self.document, error = %e, "failed to queue revert");
                return sent;
            }
            sent += 1;
        }

        if change.text.is_empty() {
            return sent;
        }

        match Request::advance(&change.text) {
            Ok(request) => match self.send(request) {
                Ok(()) => sent += 1,
                Err(e) => warn!(document = %self.document, error = %e, "failed to queue advance"),
            },
            Err(e) => debug!(document = %self.document, error = %e, "insertion not forwarded"),
        }
        sent
    }

    /// Whether the session is applying a reply right now.
    #[must_use]
    pub fn is_insert_locked(&self) -> bool {
        self.insert_lock.is_held()
    }

    /// Whether a reply is outstanding.
    #[must_use]
    pub fn is_awaiting_reply(&self) -> bool {
        lock_machine(&self.machine).phase() == Phase::AwaitingReply
    }

    /// Current state of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            document: self.document.clone(),
            language: self.language.clone(),
            insert_locked: self.insert_lock.is_held(),
            edit: lock_machine(&self.machine).snapshot(),
        }
    }

    /// Languages the engine reported, if asked.
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        lock_machine(&self.machine).snapshot().capabilities
    }

    /// Stop all session tasks and close the connection.
    ///
    /// Safe to call while replies are queued; unapplied replies are dropped.
    /// Idempotent.
    pub async fn close(&self) {
        self.cancel.cancel();
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(document = %self.document, error = %e, "session task ended abnormally");
            }
        }
        info!(document = %self.document, "session closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
