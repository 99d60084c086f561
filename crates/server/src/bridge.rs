//! One-way bridge to the external fan-out relay.
//!
//! Each successful `publish`/`message` command produces exactly one
//! send attempt. A failed send is reported to the caller and never
//! retried; subscribers that are offline at send time simply miss the
//! frame. Durability lives in the store, not on this path.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::info;

use parley_wire::FanoutFrame;

/// Seam between the dispatcher and the relay transport. Tests supply
/// a recording implementation instead of a live connection.
#[async_trait]
pub trait FanoutSink: Send {
    /// Attempt delivery of one `(topic, payload)` frame.
    async fn send(&mut self, topic: &str, payload: Value) -> Result<()>;
}

/// Production sink: a single TCP connection to the relay, established
/// at startup. Connection failure at startup is fatal; write failures
/// afterwards are surfaced per-frame and leave the connection as-is.
pub struct TcpFanout {
    stream: TcpStream,
}

impl TcpFanout {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to fan-out relay at {addr}"))?;
        info!(%addr, "connected to fan-out relay");
        Ok(Self { stream })
    }
}

#[async_trait]
impl FanoutSink for TcpFanout {
    async fn send(&mut self, topic: &str, payload: Value) -> Result<()> {
        let mut line = FanoutFrame::new(topic, payload).to_line();
        line.push('\n');
        self.stream
            .write_all(line.as_bytes())
            .await
            .context("relay write failed")?;
        self.stream.flush().await.context("relay flush failed")?;
        Ok(())
    }
}
