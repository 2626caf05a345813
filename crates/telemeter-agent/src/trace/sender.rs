//! Collector transport seam.
//!
//! `SpanSender` is what the flusher talks to. `UdpSpanSender` packs spans as
//! JSON arrays into datagrams addressed to the reporter host/port; other
//! encodings plug in through the same trait.

use async_trait::async_trait;
use tokio::net::UdpSocket;

use telemeter_core::error::{Result, TelemeterError};

use super::span::FinishedSpan;

/// Largest datagram payload we produce.
pub const MAX_DATAGRAM_BYTES: usize = 65_000;

#[async_trait]
pub trait SpanSender: Send + Sync {
    async fn send(&self, batch: Vec<FinishedSpan>) -> Result<()>;
}

pub struct UdpSpanSender {
    socket: UdpSocket,
    target: String,
}

impl UdpSpanSender {
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let target = format!("{host}:{port}");
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| TelemeterError::Transport(format!("bind udp socket failed: {e}")))?;
        socket
            .connect(target.as_str())
            .await
            .map_err(|e| TelemeterError::Transport(format!("connect {target} failed: {e}")))?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl SpanSender for UdpSpanSender {
    async fn send(&self, batch: Vec<FinishedSpan>) -> Result<()> {
        for datagram in pack_datagrams(&batch, MAX_DATAGRAM_BYTES)? {
            self.socket
                .send(&datagram)
                .await
                .map_err(|e| TelemeterError::Transport(format!("send to {} failed: {e}", self.target)))?;
        }
        Ok(())
    }
}

/// Split spans into JSON-array payloads no larger than `limit` bytes.
/// A single span that alone exceeds `limit` is skipped with a warning.
pub fn pack_datagrams(spans: &[FinishedSpan], limit: usize) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    let mut cur: Vec<u8> = Vec::new();

    for span in spans {
        let enc = serde_json::to_vec(span)
            .map_err(|e| TelemeterError::Internal(format!("encode span failed: {e}")))?;
        if enc.len() + 2 > limit {
            tracing::warn!(span_id = span.span_id, bytes = enc.len(), "span too large for a datagram, dropped");
            continue;
        }
        // `[` + items + `,` separators + `]`
        if !cur.is_empty() && cur.len() + 1 + enc.len() + 1 > limit {
            cur.push(b']');
            out.push(std::mem::take(&mut cur));
        }
        if cur.is_empty() {
            cur.push(b'[');
        } else {
            cur.push(b',');
        }
        cur.extend_from_slice(&enc);
    }
    if !cur.is_empty() {
        cur.push(b']');
        out.push(cur);
    }
    Ok(out)
}
