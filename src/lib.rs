//! A small TCP server library whose distinguishing feature is **per-connection
//! request pipelining with ordered responses**: a caller supplies a handler
//! and a framing policy, the library frames requests off the wire, runs the
//! handler for each one concurrently, and writes the responses back on the
//! same connection in the exact order the requests arrived, even when
//! handlers finish out of order.
//!
//! ```no_run
//! use bytes::Bytes;
//! use pipeline_tcp::{Server, ServerConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::new("127.0.0.1:7777", "\n");
//!
//!     let handler = |request: Bytes, _context: Arc<()>| async move {
//!         // Echo everything after "GET " back to the client.
//!         let text = String::from_utf8_lossy(&request);
//!         let reply = text.strip_prefix("GET ").unwrap_or(&text).to_string();
//!         Bytes::from(reply)
//!     };
//!
//!     Server::new(config, handler, ()).run().await;
//! }
//! ```
//!
//! Framing, dispatch, and response reordering are internal to a connection;
//! callers only ever see the handler contract in [`Handler`]. See the crate's
//! design notes (`DESIGN.md` in the source tree) for why responses can be
//! written in order even though handlers are not run in order.

mod acceptor;
mod config;
mod connection;
mod dispatcher;
mod error;
mod framer;
mod handler;
mod reorderer;

pub use config::{FramingMode, ServerConfig};
pub use error::ServerError;
pub use handler::Handler;

use std::sync::Arc;

/// A configured, not-yet-running pipelined TCP server.
pub struct Server<H, C> {
    config: ServerConfig,
    handler: Arc<H>,
    context: Arc<C>,
}

impl<H, C> Server<H, C>
where
    H: Handler<C>,
    C: Send + Sync + 'static,
{
    /// Pairs a configuration with a handler and the user context shared
    /// across every handler invocation on every connection.
    pub fn new(config: ServerConfig, handler: H, context: C) -> Self {
        Server {
            config,
            handler: Arc::new(handler),
            context: Arc::new(context),
        }
    }

    /// Binds the listener, logs the bind, and runs the accept loop forever.
    /// A bind or accept failure is logged and terminates the process with a
    /// non-zero exit status; this call never returns normally.
    pub async fn run(self) -> ! {
        acceptor::run(self.config, self.handler, self.context).await
    }
}
