//! Parley Chat Command Server
//!
//! A synchronous command endpoint (login, registries, channel
//! creation, publish, direct messages) backed by an in-memory store,
//! a single-file JSON snapshot, and a one-way bridge to an external
//! fan-out relay.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod models;
pub mod store;

use anyhow::Context;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bridge::TcpFanout;
use config::ServerConfig;
use dispatch::Dispatcher;
use store::{SnapshotFile, Store};

/// One pending request: the raw line plus the slot for its response.
/// The capacity-1 channel keeps the transport's one-in-flight rule.
type PendingRequest = (String, oneshot::Sender<String>);

pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Parley Chat Server ===");

    let snapshot_file = SnapshotFile::new(config.snapshot_path());
    let snapshot = snapshot_file.load().await;
    info!(
        users = snapshot.users.len(),
        channels = snapshot.channels.len(),
        publications = snapshot.publications.len(),
        messages = snapshot.messages.len(),
        "loaded persisted state"
    );
    let store = Store::from_snapshot(snapshot);

    // Both connections are startup requirements: failing either is
    // the only fatal path in the server.
    let fanout = TcpFanout::connect(&config.relay_addr).await?;
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind command endpoint on port {}", config.port))?;
    info!(port = config.port, "command endpoint listening");

    let (request_tx, mut request_rx) = mpsc::channel::<PendingRequest>(1);
    tokio::spawn(accept_loop(listener, request_tx));

    let mut dispatcher = Dispatcher::new(store, snapshot_file, Box::new(fanout));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some((line, reply)) = request_rx.recv() => {
                let response = dispatcher.handle_line(&line).await;
                // A dropped receiver just means the client went away
                // before its reply; nothing to do about it.
                let _ = reply.send(response);
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    dispatcher.save_on_shutdown().await;
    Ok(())
}

/// Accept command connections and hand each one to its own task.
async fn accept_loop(listener: TcpListener, request_tx: mpsc::Sender<PendingRequest>) {
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };
        info!(%addr, "client connected");
        let request_tx = request_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, request_tx).await {
                warn!(%addr, "client error: {e}");
            }
            info!(%addr, "client disconnected");
        });
    }
}

/// Per-connection loop: read one line, wait for the dispatcher's
/// response, write it back. The await on the reply enforces strict
/// request/response alternation on this connection.
async fn handle_client(
    socket: TcpStream,
    request_tx: mpsc::Sender<PendingRequest>,
) -> anyhow::Result<()> {
    let mut framed = Framed::new(socket, LinesCodec::new());

    while let Some(line) = framed.next().await {
        let line = line?;
        let (reply_tx, reply_rx) = oneshot::channel();
        request_tx
            .send((line, reply_tx))
            .await
            .map_err(|_| anyhow::anyhow!("dispatcher is gone"))?;
        let response = reply_rx.await.context("dispatcher dropped the request")?;
        framed.send(response).await?;
    }

    Ok(())
}

/// Resolves on SIGINT, or SIGTERM where available.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate => {}
    }
}
