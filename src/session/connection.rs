//! Engine connection collaborator.
//!
//! A [`Connector`] opens one byte stream per document session. The default
//! [`LocalSocketConnector`] uses the `interprocess` crate: a Unix domain
//! socket on Linux and macOS and a named pipe on Windows.

use std::future::Future;
use std::pin::Pin;

use interprocess::local_socket::tokio::prelude::*;
use interprocess::local_socket::tokio::Stream;
use interprocess::local_socket::{GenericFilePath, GenericNamespaced, ToFsName, ToNsName};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info_span, Instrument};

use crate::config::EngineAddress;
use crate::{AppError, Result};

/// Read half of an engine connection.
pub type EngineReader = Box<dyn AsyncRead + Unpin + Send>;

/// Write half of an engine connection.
pub type EngineWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// An open connection to the engine, split into halves.
pub struct EngineStream {
    /// Inbound bytes.
    pub reader: EngineReader,
    /// Outbound bytes.
    pub writer: EngineWriter,
}

impl EngineStream {
    /// Wrap already split halves.
    #[must_use]
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

impl std::fmt::Debug for EngineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineStream").finish_non_exhaustive()
    }
}

/// Opens engine connections.
pub trait Connector: Send + Sync {
    /// Connect to the engine at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Connection`] if the engine is unreachable.
    fn connect<'a>(
        &'a self,
        address: &'a EngineAddress,
    ) -> Pin<Box<dyn Future<Output = Result<EngineStream>> + Send + 'a>>;
}

/// [`Connector`] over `interprocess` local sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSocketConnector;

impl Connector for LocalSocketConnector {
    fn connect<'a>(
        &'a self,
        address: &'a EngineAddress,
    ) -> Pin<Box<dyn Future<Output = Result<EngineStream>> + Send + 'a>> {
        let span = info_span!("engine_connect", address = %address);
        Box::pin(
            async move {
                let name = match address {
                    EngineAddress::Path(path) => path.as_path().to_fs_name::<GenericFilePath>(),
                    EngineAddress::Namespaced(name) => name.as_str().to_ns_name::<GenericNamespaced>(),
                }
                .map_err(|err| {
                    AppError::Connection(format!("invalid engine address '{address}': {err}"))
                })?;

                let stream = Stream::connect(name).await.map_err(|err| {
                    AppError::Connection(format!("failed to connect to '{address}': {err}"))
                })?;
                debug!("engine connection established");

                let (reader, writer) = stream.split();
                Ok(EngineStream::new(reader, writer))
            }
            .instrument(span),
        )
    }
}
