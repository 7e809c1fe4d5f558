#![forbid(unsafe_code)]

//! `nightfury-client`: drive a completion engine from the terminal.
//!
//! Binds an in-memory document to the engine exactly the way an editor
//! extension would, types input into it one character at a time, and prints
//! the document the engine's replies produced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{fmt, EnvFilter};

use nightfury_client::config::ClientConfig;
use nightfury_client::edit::buffer::TextBuffer;
use nightfury_client::edit::document::{DocumentEditor, DocumentId};
use nightfury_client::session::connection::{Connector, LocalSocketConnector};
use nightfury_client::session::handle::Session;
use nightfury_client::session::registry::SessionRegistry;
use nightfury_client::wire::request::Request;
use nightfury_client::{AppError, Result};

/// Backspace in `--input` deletes the character before the cursor.
const BACKSPACE: char = '\u{8}';

/// Poll interval while waiting for replies to settle.
const SETTLE_POLL: Duration = Duration::from_millis(10);

/// Quiet period after the last reply before the document is considered final.
const SETTLE_QUIET: Duration = Duration::from_millis(50);

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "nightfury-client", about = "Completion engine client", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine socket path; overrides the configuration.
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// How long to wait for the engine after each keystroke, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type input into a fresh document and print the result.
    Send {
        /// Language id to initialise the engine with.
        #[arg(short, long)]
        language: String,

        /// Characters to type; a backspace (U+0008) deletes the previous one.
        #[arg(short, long)]
        input: Option<String>,

        /// Reset the engine before typing.
        #[arg(short, long)]
        reset: bool,

        /// Print the session snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List the languages the engine can complete.
    Capabilities,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(socket) = args.socket.clone() {
        config.socket_path = Some(socket);
    }
    let settle = Duration::from_millis(args.settle_ms);

    match args.command {
        Command::Send {
            language,
            input,
            reset,
            json,
        } => send(config, &language, input.as_deref(), reset, json, settle).await,
        Command::Capabilities => capabilities(&config, settle).await,
    }
}

async fn send(
    config: ClientConfig,
    language: &str,
    input: Option<&str>,
    reset: bool,
    json: bool,
    settle: Duration,
) -> Result<()> {
    let registry = Arc::new(SessionRegistry::new(config, Arc::new(LocalSocketConnector)));
    let buffer = Arc::new(TextBuffer::new());
    let document = DocumentId::new("nightfury://cli");

    let listener_registry = Arc::downgrade(&registry);
    let listener_document = document.clone();
    buffer.set_change_listener(move |change| {
        if let Some(registry) = listener_registry.upgrade() {
            let queued = registry.on_document_changed(&listener_document, change);
            trace!(queued, offset = change.offset, "document change forwarded");
        }
    });

    let editor: Arc<dyn DocumentEditor> = buffer.clone();
    let session = registry.activate(document.clone(), language, editor).await?;
    wait_settled(&session, settle).await;

    if reset {
        session.send(Request::Reset)?;
        wait_settled(&session, settle).await;
    }

    for ch in input.unwrap_or_default().chars() {
        if ch == BACKSPACE {
            if !buffer.backspace() {
                debug!("backspace at document start ignored");
            }
        } else {
            buffer.type_char(ch);
        }
        wait_settled(&session, settle).await;
    }

    let snapshot = session.snapshot();
    println!("{}", buffer.text());
    if json {
        let rendered = serde_json::to_string_pretty(&snapshot)
            .map_err(|err| AppError::Io(format!("failed to render snapshot: {err}")))?;
        println!("{rendered}");
    } else {
        info!(
            span_start = snapshot.edit.span_start,
            history_depth = snapshot.edit.history_depth,
            in_regex = snapshot.edit.in_regex,
            "final session state"
        );
    }

    registry.shutdown().await;
    Ok(())
}

async fn capabilities(config: &ClientConfig, settle: Duration) -> Result<()> {
    let address = config.engine_address();
    let stream = LocalSocketConnector.connect(&address).await?;
    let buffer = Arc::new(TextBuffer::new());
    let session = Session::spawn(
        DocumentId::new("nightfury://capabilities"),
        "",
        stream,
        buffer,
        config,
    );

    session.send(Request::GetCapabilities)?;
    wait_settled(&session, settle).await;

    let names = session.capabilities();
    if names.is_empty() {
        warn!("engine reported no capabilities");
    }
    for name in names {
        println!("{name}");
    }

    session.close().await;
    Ok(())
}

/// Wait until the session has no reply outstanding and has stayed quiet for
/// [`SETTLE_QUIET`], or until `limit` elapses.
async fn wait_settled(session: &Session, limit: Duration) {
    let settled = tokio::time::timeout(limit, async {
        loop {
            while session.is_awaiting_reply() || session.is_insert_locked() {
                tokio::time::sleep(SETTLE_POLL).await;
            }
            tokio::time::sleep(SETTLE_QUIET).await;
            if !session.is_awaiting_reply() && !session.is_insert_locked() {
                break;
            }
        }
    })
    .await;

    if settled.is_err() {
        warn!(document = %session.document(), "engine did not settle in time");
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
