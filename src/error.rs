// ABOUTME: Error types surfaced at the one boundary this crate exposes a Result at
// ABOUTME: binding the listener and accepting connections; everything else is recovered per-connection

use std::io;
use thiserror::Error;

/// Errors that can terminate the accept loop.
///
/// Every other failure in this crate (a bad frame, a handler panic, a write
/// that fails because the peer left) is recovered locally and never reaches
/// this type; see the per-connection error handling design in the crate
/// docs. Only listener-level failures are fatal to the process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
}
