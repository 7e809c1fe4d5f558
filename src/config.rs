//! Client configuration parsing, validation, and engine address resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{AppError, Result};

/// Fallback directory when no runtime directory can be found.
const DEFAULT_SOCKET_DIR: &str = ".";

fn default_socket_file_name() -> String {
    "nightfury.sock".into()
}

fn default_pipe_name() -> String {
    "nightfury".into()
}

fn default_history_depth() -> usize {
    256
}

fn default_reply_timeout_ms() -> u64 {
    2000
}

fn default_max_frame_bytes() -> usize {
    1_048_576
}

/// Where the completion engine listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAddress {
    /// Unix domain socket on the filesystem.
    Path(PathBuf),
    /// Namespaced local socket (named pipe on Windows).
    Namespaced(String),
}

impl std::fmt::Display for EngineAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Namespaced(name) => write!(f, "@{name}"),
        }
    }
}

/// Client configuration parsed from `nightfury.toml`.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ClientConfig {
    /// Explicit engine socket path; skips runtime-directory resolution.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
    /// Socket file name joined onto the runtime directory.
    #[serde(default = "default_socket_file_name")]
    pub socket_file_name: String,
    /// Pipe name used on platforms without filesystem sockets.
    #[serde(default = "default_pipe_name")]
    pub pipe_name: String,
    /// Maximum number of undoable span steps kept per session.
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,
    /// How long a session waits for a reply before giving up; 0 disables.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// Largest unterminated frame the reader will buffer.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            socket_file_name: default_socket_file_name(),
            pipe_name: default_pipe_name(),
            history_depth: default_history_depth(),
            reply_timeout_ms: default_reply_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reply timeout, or `None` when disabled.
    #[must_use]
    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_timeout_ms > 0).then(|| Duration::from_millis(self.reply_timeout_ms))
    }

    /// Resolve the address the engine is expected to listen on.
    ///
    /// An explicit `socket_path` wins. Otherwise Windows uses the namespaced
    /// `pipe_name` and every other platform joins `socket_file_name` onto the
    /// runtime directory.
    #[must_use]
    pub fn engine_address(&self) -> EngineAddress {
        if let Some(ref path) = self.socket_path {
            return EngineAddress::Path(path.clone());
        }
        if cfg!(windows) {
            return EngineAddress::Namespaced(self.pipe_name.clone());
        }
        let address = runtime_dir().join(&self.socket_file_name);
        debug!(address = %address.display(), "resolved engine socket path");
        EngineAddress::Path(address)
    }

    fn validate(&self) -> Result<()> {
        if self.history_depth == 0 {
            return Err(AppError::Config(
                "history_depth must be greater than zero".into(),
            ));
        }

        if self.max_frame_bytes == 0 {
            return Err(AppError::Config(
                "max_frame_bytes must be greater than zero".into(),
            ));
        }

        if self.socket_path.is_none() && self.socket_file_name.trim().is_empty() {
            return Err(AppError::Config(
                "socket_file_name must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Directory holding per-user runtime sockets.
///
/// `$XDG_RUNTIME_DIR` first, then `/run/user/<euid>` when it exists, then the
/// current directory.
#[must_use]
pub fn runtime_dir() -> PathBuf {
    if let Ok(dir) = env::var("XDG_RUNTIME_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    #[cfg(unix)]
    {
        let candidate = PathBuf::from(format!("/run/user/{}", nix::unistd::geteuid()));
        if candidate.is_dir() {
            return candidate;
        }
    }
    PathBuf::from(DEFAULT_SOCKET_DIR)
}
