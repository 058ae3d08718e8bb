//! Error types for the logic-process side.

use perch_core::TransportError;
use std::io;
use thiserror::Error;

/// Errors that end a [`Host`](crate::Host).
#[derive(Error, Debug)]
pub enum HostError {
    /// The connection to the renderer failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A worker thread could not be started.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
