//! Document → session routing.
//!
//! The host owns one [`SessionRegistry`]. Activation connects to the engine
//! and sends `Initialize`; document change notifications are routed to the
//! matching session; deactivation closes connections.
//!
//! The session map sits behind a `std::sync::RwLock` because change
//! notifications arrive from synchronous host callbacks.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ClientConfig;
use crate::edit::document::{DocumentChange, DocumentEditor, DocumentId};
use crate::session::connection::Connector;
use crate::session::handle::Session;
use crate::wire::request::Request;
use crate::{AppError, Result};

/// Active sessions keyed by document.
pub struct SessionRegistry {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    sessions: RwLock<HashMap<DocumentId, Arc<Session>>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("config", &self.config)
            .field("sessions", &self.documents())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Empty registry opening connections through `connector`.
    #[must_use]
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Configuration shared by every session.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect a session for `document` and initialise it for `language`.
    ///
    /// An existing session for the same document is closed and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidRequest`] for an unusable language id and
    /// [`AppError::Connection`] if the engine cannot be reached.
    pub async fn activate(
        &self,
        document: DocumentId,
        language: &str,
        editor: Arc<dyn DocumentEditor>,
    ) -> Result<Arc<Session>> {
        let initialize = Request::initialize(language)?;
        let address = self.config.engine_address();

        let stream = self
            .connector
            .connect(&address)
            .instrument(info_span!("activate", document = %document))
            .await
            .map_err(|err| {
                warn!(document = %document, %err, "engine connection failed");
                err
            })?;

        let session = Arc::new(Session::spawn(
            document.clone(),
            language,
            stream,
            editor,
            &self.config,
        ));
        session.send(initialize)?;

        let previous = self
            .write_sessions()
            .insert(document.clone(), Arc::clone(&session));
        if let Some(previous) = previous {
            debug!(document = %document, "replacing existing session");
            previous.close().await;
        }

        info!(document = %document, language, address = %address, "document activated");
        Ok(session)
    }

    /// Route a host change notification to its document's session.
    ///
    /// Returns the number of requests queued; zero for unknown documents and
    /// for changes made by the session itself.
    #[must_use]
    pub fn on_document_changed(&self, document: &DocumentId, change: &DocumentChange) -> usize {
        match self.get(document) {
            Some(session) => session.handle_change(change),
            None => {
                debug!(document = %document, "change for inactive document ignored");
                0
            }
        }
    }

    /// Send a request on `document`'s session.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the document has no session, or
    /// [`AppError::Connection`] if its writer has stopped.
    pub fn send(&self, document: &DocumentId, request: Request) -> Result<()> {
        self.get(document)
            .ok_or_else(|| AppError::NotFound(format!("no session for {document}")))?
            .send(request)
    }

    /// Session bound to `document`, if any.
    #[must_use]
    pub fn get(&self, document: &DocumentId) -> Option<Arc<Session>> {
        self.read_sessions().get(document).cloned()
    }

    /// Documents with an active session, sorted.
    #[must_use]
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut documents: Vec<DocumentId> = self.read_sessions().keys().cloned().collect();
        documents.sort();
        documents
    }

    /// Number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    /// Whether no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and forget `document`'s session. Returns whether one existed.
    pub async fn deactivate(&self, document: &DocumentId) -> bool {
        let removed = self.write_sessions().remove(document);
        match removed {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    /// Close every session.
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<Session>> = self
            .write_sessions()
            .drain()
            .map(|(_, session)| session)
            .collect();
        let count = sessions.len();
        for session in sessions {
            session.close().await;
        }
        info!(count, "all sessions closed");
    }

    fn read_sessions(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<DocumentId, Arc<Session>>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<DocumentId, Arc<Session>>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
