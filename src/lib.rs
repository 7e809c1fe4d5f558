#![forbid(unsafe_code)]

//! Editor-side client for the nightfury completion engine.
//!
//! Streams keystrokes to the engine over a local socket and splices the
//! engine's replies back into the open document.

pub mod config;
pub mod edit;
pub mod errors;
pub mod session;
pub mod wire;

pub use config::ClientConfig;
pub use errors::{AppError, Result};
