//! Engine reader task.
//!
//! Reads the engine socket through [`FramedRead`] backed by [`FrameCodec`],
//! decodes each frame into a [`Response`], and forwards replies in arrival
//! order through a tokio [`mpsc`] channel to the session's reply worker.
//!
//! Frames that fail to decode are logged and skipped; they never stop the
//! reader. Dropping the channel sender on exit tells the worker the engine
//! is gone.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::wire::codec::FrameCodec;
use crate::wire::response::Response;

/// Reader task: socket bytes in, decoded replies out through `reply_tx`.
///
/// Exits on EOF, on a non-recoverable I/O error, when `reply_tx` is closed,
/// or when `cancel` fires.
pub async fn run_reader<R>(
    document: String,
    reader: R,
    codec: FrameCodec,
    reply_tx: mpsc::Sender<Response>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(reader, codec);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(document, "engine reader: cancellation received, stopping");
                break;
            }

            item = framed.next() => {
                match item {
                    None => {
                        debug!(document, "engine reader: EOF detected");
                        break;
                    }

                    Some(Err(e)) => {
                        warn!(document, error = %e, "engine reader: stream error, stopping");
                        break;
                    }

                    Some(Ok(frame)) => match Response::decode(&frame) {
                        Ok(response) => {
                            trace!(document, reply = response.name(), "engine reader: reply decoded");
                            if reply_tx.send(response).await.is_err() {
                                debug!(document, "engine reader: reply_tx closed, stopping");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(
                                document,
                                error = %e,
                                frame_len = frame.len(),
                                "engine reader: undecodable frame, skipping"
                            );
                        }
                    },
                }
            }
        }
    }
}
