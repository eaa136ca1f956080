// ABOUTME: Launches one concurrent unit per framed request and isolates handler panics
// ABOUTME: A panicking handler still yields an (empty) response so the reorderer keeps draining

use crate::handler::Handler;
use crate::reorderer::ResponseRecord;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawns the concurrent unit that invokes `handler` for one request and
/// submits its result to the reorderer's channel.
///
/// The handler call is nested in its own task so a panic inside it is
/// caught by that inner task's `JoinHandle` rather than unwinding into this
/// one; the outer task always submits a response, empty on panic, so the
/// reorderer's pending table keeps draining (see crate docs, error handling
/// design).
pub(crate) fn spawn_handler<H, C>(
    req_num: u64,
    request: Bytes,
    handler: Arc<H>,
    context: Arc<C>,
    responses: mpsc::Sender<ResponseRecord>,
) -> JoinHandle<()>
where
    H: Handler<C>,
    C: Send + Sync + 'static,
{
    tokio::spawn(async move {
        let invocation = tokio::spawn(async move { handler.handle(request, context).await });

        let payload = match invocation.await {
            Ok(payload) => payload,
            Err(join_error) => {
                tracing::error!(
                    req_num,
                    error = %join_error,
                    "handler panicked; responding with an empty payload so the pipeline keeps draining"
                );
                Bytes::new()
            }
        };

        if responses
            .send(ResponseRecord::Normal { req_num, payload })
            .await
            .is_err()
        {
            tracing::debug!(
                req_num,
                "reorderer channel closed before this response could be delivered"
            );
        }
    })
}
