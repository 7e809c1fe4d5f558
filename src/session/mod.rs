//! Per-document sessions and their registry.
//!
//! - `connection`: engine connection collaborator and the local-socket
//!   implementation.
//! - `handle`: a live [`Session`](handle::Session) and its tasks.
//! - `lock`: the insert lock suppressing echoes of the session's own edits.
//! - `registry`: [`SessionRegistry`](registry::SessionRegistry), document →
//!   session routing.
//! - `worker`: FIFO reply worker applying engine replies to the document.

pub mod connection;
pub mod handle;
pub mod lock;
pub mod registry;
pub mod worker;
