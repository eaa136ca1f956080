// ABOUTME: Binds the listener and spawns one connection engine per accepted socket
// ABOUTME: A bind or accept failure is fatal: logged, then the process exits non-zero

use crate::config::ServerConfig;
use crate::connection;
use crate::error::ServerError;
use crate::handler::Handler;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds `config.address()`, logs the bind, and accepts connections forever,
/// spawning one connection engine per accepted socket. Never returns
/// normally: a bind or accept failure is logged and the process exits with
/// status 1, matching the source's `log.Fatal` behavior.
pub(crate) async fn run<H, C>(config: ServerConfig, handler: Arc<H>, context: Arc<C>) -> !
where
    H: Handler<C>,
    C: Send + Sync + 'static,
{
    let listener = match TcpListener::bind(&config.address).await {
        Ok(listener) => listener,
        Err(source) => {
            let err = ServerError::Bind {
                address: config.address.clone(),
                source,
            };
            tracing::error!(error = %err, "fatal: could not bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(address = %config.address, "listening");

    let config = Arc::new(config);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(source) => {
                let err = ServerError::Accept(source);
                tracing::error!(error = %err, "fatal: accept loop failed");
                std::process::exit(1);
            }
        };

        tracing::debug!(%peer, "accepted connection");
        tokio::spawn(connection::run(
            socket,
            peer,
            config.clone(),
            handler.clone(),
            context.clone(),
        ));
    }
}
