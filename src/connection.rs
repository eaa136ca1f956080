// ABOUTME: Owns one accepted connection end to end: framing loop, dispatch fan-out, reorder drain
// ABOUTME: Guarantees the response channel is never closed while a handler might still send to it

use crate::config::ServerConfig;
use crate::dispatcher;
use crate::framer::{FrameEvent, Framer};
use crate::handler::Handler;
use crate::reorderer::{self, ResponseRecord};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Runs one connection to completion: `active` (frame + dispatch) until
/// client-gone, `draining` (join every dispatched unit) and finally
/// `closed` (join the reorderer, dropping both socket halves).
///
/// This is the sentinel strategy described in the crate docs: the
/// client-gone marker travels through the same channel as normal
/// responses, so the reorderer alone decides when it is done, and the
/// engine only drops its own sender after every unit that could still send
/// has already finished doing so.
pub(crate) async fn run<H, C>(
    socket: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    handler: Arc<H>,
    context: Arc<C>,
) where
    H: Handler<C>,
    C: Send + Sync + 'static,
{
    let (read_half, write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half);
    let mut framer = Framer::new(config.framing(), config.max_frame_size);

    // Small-bounded: a handler finishing while the reorderer blocks on I/O
    // waits here; this is the back-pressure point.
    let (response_tx, response_rx) = mpsc::channel::<ResponseRecord>(1);
    let reorderer_handle = tokio::spawn(reorderer::run(write_half, response_rx));

    let mut in_flight = Vec::new();

    loop {
        match framer.next_frame(&mut reader).await {
            FrameEvent::Request { req_num, bytes } => {
                in_flight.push(dispatcher::spawn_handler(
                    req_num,
                    bytes,
                    handler.clone(),
                    context.clone(),
                    response_tx.clone(),
                ));
            }
            FrameEvent::ClientGone { req_num } => {
                if response_tx
                    .send(ResponseRecord::ClientGone { req_num })
                    .await
                    .is_err()
                {
                    tracing::debug!(%peer, "reorderer already gone when submitting client-gone");
                }
                break;
            }
        }
    }

    // Entering `draining`: no more units will be spawned. Drop this unit's
    // own sender clone so that once every dispatched unit below has also
    // dropped its clone, the channel closes; never before that.
    drop(response_tx);

    for task in in_flight {
        if let Err(err) = task.await {
            tracing::error!(%peer, error = %err, "dispatched unit failed to join");
        }
    }

    // Entering `closed`: every unit that could send has finished sending.
    if let Err(err) = reorderer_handle.await {
        tracing::error!(%peer, error = %err, "reorderer unit failed to join");
    }

    tracing::debug!(%peer, "connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::sleep;

    async fn spawn_connection<H>(config: ServerConfig, handler: H) -> (TcpStream, SocketAddr)
    where
        H: Handler<()>,
    {
        let listener = TcpListener::bind(config.address()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Arc::new(ServerConfig { address: addr.to_string(), ..config });
        let handler = Arc::new(handler);
        let context = Arc::new(());

        let client = TcpStream::connect(addr).await.unwrap();
        let (socket, peer) = listener.accept().await.unwrap();

        tokio::spawn(run(socket, peer, config, handler, context));

        (client, addr)
    }

    struct Echo;
    impl Handler<()> for Echo {
        async fn handle(&self, request: Bytes, _context: Arc<()>) -> Bytes {
            request
        }
    }

    struct SleepThenEcho;
    impl Handler<()> for SleepThenEcho {
        async fn handle(&self, request: Bytes, _context: Arc<()>) -> Bytes {
            sleep(Duration::from_millis(50)).await;
            request
        }
    }

    #[tokio::test]
    async fn echoes_a_single_delimited_request() {
        let config = ServerConfig::new("127.0.0.1:0", "\n");
        let (mut client, _addr) = spawn_connection(config, Echo).await;

        client.write_all(b"echo\n").await.unwrap();
        client.shutdown().await.unwrap();

        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"echo\n");
    }

    #[tokio::test]
    async fn disconnect_mid_handler_does_not_hang_the_engine() {
        let config = ServerConfig::new("127.0.0.1:0", "\n");
        let (mut client, _addr) = spawn_connection(config, SleepThenEcho).await;

        client.write_all(b"echo\n").await.unwrap();
        drop(client); // close before the 50ms handler finishes

        // Give the spawned connection engine time to observe client-gone,
        // let the handler finish, and join everything. If the sentinel
        // strategy were broken this would panic on a send-after-close.
        sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn connect_and_close_without_sending_anything() {
        let config = ServerConfig::new("127.0.0.1:0", "\n");
        let (client, _addr) = spawn_connection(config, Echo).await;
        drop(client);

        sleep(Duration::from_millis(50)).await;
    }
}
