//! Shared helpers for session-level integration tests.
//!
//! Provides an in-memory engine connection built on `tokio::io::duplex`, a
//! recording document editor, and polling helpers, so individual test
//! modules can focus on behaviour rather than plumbing.

use std::collections::VecDeque;
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use nightfury_client::config::{ClientConfig, EngineAddress};
use nightfury_client::edit::buffer::TextBuffer;
use nightfury_client::edit::document::{DocumentEditor, DocumentId, EditFuture, Position};
use nightfury_client::session::connection::{Connector, EngineStream};
use nightfury_client::session::registry::SessionRegistry;
use nightfury_client::{AppError, Result};

/// How long helpers wait before failing a test.
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Configuration with an explicit socket path and the given reply timeout.
pub fn test_config(reply_timeout_ms: u64) -> ClientConfig {
    let toml = format!(
        r#"
socket_path = '/tmp/nightfury-test.sock'
history_depth = 16
reply_timeout_ms = {reply_timeout_ms}
"#
    );
    ClientConfig::from_toml_str(&toml).expect("valid test config")
}

// ── Engine connection ───────────────────────────────────────────────────────

/// Hands out pre-made in-memory connections, one per `connect` call.
pub struct DuplexConnector {
    streams: Mutex<VecDeque<DuplexStream>>,
    connects: AtomicUsize,
}

impl DuplexConnector {
    /// Connector with `count` connections; returns the engine ends in order.
    pub fn with_engines(count: usize) -> (Arc<Self>, Vec<DuplexStream>) {
        let mut clients = VecDeque::new();
        let mut engines = Vec::new();
        for _ in 0..count {
            let (client, engine) = tokio::io::duplex(4096);
            clients.push_back(client);
            engines.push(engine);
        }
        let connector = Arc::new(Self {
            streams: Mutex::new(clients),
            connects: AtomicUsize::new(0),
        });
        (connector, engines)
    }

    /// Number of connection attempts so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for DuplexConnector {
    fn connect<'a>(
        &'a self,
        _address: &'a EngineAddress,
    ) -> Pin<Box<dyn Future<Output = Result<EngineStream>> + Send + 'a>> {
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let stream = self
                .streams
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Connection("engine not listening".into()))?;
            let (reader, writer) = tokio::io::split(stream);
            Ok(EngineStream::new(reader, writer))
        })
    }
}

/// Read exactly `len` request bytes sent by the client.
pub async fn read_request(engine: &mut DuplexStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0_u8; len];
    tokio::time::timeout(WAIT_LIMIT, engine.read_exact(&mut buf))
        .await
        .expect("client request in time")
        .expect("read client request");
    buf
}

/// Write reply bytes as the engine, in one write.
pub async fn reply(engine: &mut DuplexStream, bytes: &[u8]) {
    engine.write_all(bytes).await.expect("write engine reply");
    engine.flush().await.expect("flush engine reply");
}

/// Assert the client sends nothing more for a short while.
pub async fn assert_no_request(engine: &mut DuplexStream) {
    let mut buf = [0_u8; 16];
    let outcome = tokio::time::timeout(Duration::from_millis(100), engine.read(&mut buf)).await;
    if let Ok(read) = outcome {
        let read = read.expect("read client stream");
        panic!("unexpected request bytes: {:?}", &buf[..read]);
    }
}

/// Poll `condition` until it holds, failing the test after [`WAIT_LIMIT`].
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

// ── Host document ───────────────────────────────────────────────────────────

/// Document editor over a [`TextBuffer`] that records surfaced errors and can
/// be told to reject edits.
pub struct RecordingEditor {
    pub buffer: Arc<TextBuffer>,
    pub errors: Mutex<Vec<String>>,
    pub reject_edits: AtomicBool,
}

impl RecordingEditor {
    pub fn new(buffer: Arc<TextBuffer>) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            errors: Mutex::new(Vec::new()),
            reject_edits: AtomicBool::new(false),
        })
    }

    fn rejected(&self) -> Option<EditFuture<'static, ()>> {
        if self.reject_edits.load(Ordering::SeqCst) {
            Some(Box::pin(async {
                Err(AppError::EditConflict("rejected by host".into()))
            }))
        } else {
            None
        }
    }
}

impl DocumentEditor for RecordingEditor {
    fn replace<'a>(&'a self, range: Range<usize>, text: &'a str) -> EditFuture<'a, ()> {
        match self.rejected() {
            Some(rejected) => rejected,
            None => self.buffer.replace(range, text),
        }
    }

    fn insert<'a>(&'a self, offset: usize, text: &'a str) -> EditFuture<'a, ()> {
        match self.rejected() {
            Some(rejected) => rejected,
            None => self.buffer.insert(offset, text),
        }
    }

    fn delete(&self, range: Range<usize>) -> EditFuture<'_, ()> {
        match self.rejected() {
            Some(rejected) => rejected,
            None => self.buffer.delete(range),
        }
    }

    fn cursor_offset(&self) -> EditFuture<'_, usize> {
        self.buffer.cursor_offset()
    }

    fn offset_at(&self, position: Position) -> EditFuture<'_, usize> {
        self.buffer.offset_at(position)
    }

    fn position_at(&self, offset: usize) -> EditFuture<'_, Position> {
        self.buffer.position_at(offset)
    }

    fn reply_applied(&self) {
        self.buffer.reply_applied();
    }

    fn show_error(&self, error: &AppError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Forward `buffer` changes to `registry` the way an editor host would.
pub fn forward_changes(buffer: &TextBuffer, registry: &Arc<SessionRegistry>, document: &DocumentId) {
    let registry = Arc::downgrade(registry);
    let document = document.clone();
    buffer.set_change_listener(move |change| {
        if let Some(registry) = registry.upgrade() {
            let _ = registry.on_document_changed(&document, change);
        }
    });
}
