//! Engine writer task.
//!
//! Receives [`Request`]s from an unbounded tokio [`mpsc`] channel, encodes
//! each one, and writes it to the engine socket. Writes are fire-and-forget:
//! a failed write is logged and the request dropped, never retried.

use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::wire::request::Request;

/// Writer task: queued requests in, encoded bytes out to `writer`.
///
/// The task exits cleanly when `cancel` fires or when every sender for
/// `request_rx` has been dropped. The write half is shut down on exit.
pub async fn run_writer<W>(
    document: String,
    writer: W,
    mut request_rx: mpsc::UnboundedReceiver<Request>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin + Send,
{
    let mut writer = writer;
    let mut buf = BytesMut::new();

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(document, "engine writer: cancellation received, stopping");
                break;
            }

            request = request_rx.recv() => {
                let Some(request) = request else {
                    debug!(document, "engine writer: request channel closed, stopping");
                    break;
                };

                buf.clear();
                request.encode_into(&mut buf);

                let written = async {
                    writer.write_all(&buf).await?;
                    writer.flush().await
                }
                .await;

                match written {
                    Ok(()) => trace!(document, request = ?request.kind(), "engine writer: request sent"),
                    Err(e) => warn!(
                        document,
                        error = %e,
                        request = ?request.kind(),
                        "engine writer: write failed, request dropped"
                    ),
                }
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(document, error = %e, "engine writer: shutdown failed");
    }
}
