//! Background span flusher.
//!
//! Producers call `enqueue` from request-handling code: a short mutex around a
//! `VecDeque`, no I/O, no await. When the buffer is full the oldest span is
//! dropped. A tokio task drains the buffer every `flush_interval`, or sooner
//! when the buffer fills, and hands the batch to a `SpanSender`. Failed sends
//! are logged and the batch is discarded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use telemeter_core::error::{Result, TelemeterError};

use super::sender::SpanSender;
use super::span::FinishedSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlusherConfig {
    pub flush_interval: Duration,
    pub max_buffer_spans: usize,
}

struct Shared {
    buf: Mutex<VecDeque<FinishedSpan>>,
    capacity: usize,
    wake: Notify,
    dropped: AtomicU64,
    sent: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<FinishedSpan>> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct AsyncSpanFlusher {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncSpanFlusher {
    /// Spawn the flush task on the current tokio runtime.
    pub fn start(sender: Arc<dyn SpanSender>, cfg: FlusherConfig) -> Result<Self> {
        let rt = tokio::runtime::Handle::try_current()
            .map_err(|e| TelemeterError::Init(format!("span flusher needs a tokio runtime: {e}")))?;

        let capacity = cfg.max_buffer_spans.max(1);
        let shared = Arc::new(Shared {
            buf: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            wake: Notify::new(),
            dropped: AtomicU64::new(0),
            sent: AtomicU64::new(0),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = cfg.flush_interval.max(Duration::from_millis(1));

        let task = rt.spawn(run(Arc::clone(&shared), sender, interval, shutdown_rx));

        Ok(Self {
            shared,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    /// Buffer a finished span. Never blocks on I/O; drops the oldest span when full.
    pub fn enqueue(&self, span: FinishedSpan) {
        let full = {
            let mut buf = self.shared.lock();
            if buf.len() >= self.shared.capacity {
                buf.pop_front();
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            buf.push_back(span);
            buf.len() >= self.shared.capacity
        };
        if full {
            self.shared.wake.notify_one();
        }
    }

    pub fn buffered(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Spans discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Spans accepted by the sender.
    pub fn sent(&self) -> u64 {
        self.shared.sent.load(Ordering::Relaxed)
    }

    /// Stop the task after one last flush, waiting at most `timeout`.
    /// Returns `false` if the task had to be aborted.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let _ = self.shutdown_tx.send(true);
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut handle) = handle else {
            return true;
        };
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(_) => true,
            Err(_) => {
                handle.abort();
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    buffered = self.buffered(),
                    "span flusher did not drain in time"
                );
                false
            }
        }
    }
}

async fn run(
    shared: Arc<Shared>,
    sender: Arc<dyn SpanSender>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = shared.wake.notified() => {}
            _ = shutdown_rx.changed() => {
                flush_once(&shared, sender.as_ref()).await;
                break;
            }
        }
        flush_once(&shared, sender.as_ref()).await;
    }
}

async fn flush_once(shared: &Shared, sender: &dyn SpanSender) {
    let batch: Vec<FinishedSpan> = shared.lock().drain(..).collect();
    if batch.is_empty() {
        return;
    }
    let n = batch.len();
    match sender.send(batch).await {
        Ok(()) => {
            shared.sent.fetch_add(n as u64, Ordering::Relaxed);
            tracing::debug!(spans = n, "span batch flushed");
        }
        Err(e) => tracing::warn!(spans = n, error = %e, "span batch dropped"),
    }
}
