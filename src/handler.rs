// ABOUTME: The caller-supplied request handler contract
// ABOUTME: Blanket-implemented for plain async closures so most callers never name the trait

use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;

/// A user-supplied request handler.
///
/// Receives the framed request bytes (including the framing delimiter, for
/// delimiter mode, see the crate docs) and the shared user context, and
/// returns the bytes to write back verbatim. Implementations must be safe to
/// invoke concurrently: the library never serializes calls across requests,
/// even on the same connection.
///
/// Most callers don't need to name this trait directly: a plain
/// `Fn(Bytes, Arc<C>) -> impl Future<Output = Bytes> + Send` closure
/// implements it via the blanket impl below. Implement it directly when the
/// handler needs named state beyond what a closure's captures provide.
pub trait Handler<C>: Send + Sync + 'static
where
    C: Send + Sync + 'static,
{
    /// Handle one request and produce the bytes to write back.
    fn handle(&self, request: Bytes, context: Arc<C>) -> impl Future<Output = Bytes> + Send;
}

impl<C, F, Fut> Handler<C> for F
where
    C: Send + Sync + 'static,
    F: Fn(Bytes, Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Bytes> + Send + 'static,
{
    fn handle(&self, request: Bytes, context: Arc<C>) -> impl Future<Output = Bytes> + Send {
        self(request, context)
    }
}
