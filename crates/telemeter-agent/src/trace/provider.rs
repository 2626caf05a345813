//! Tracer provider: one sampler and one flusher shared by every `Tracer`.

use std::sync::Arc;
use std::time::Duration;

use telemeter_core::error::Result;

use super::flusher::AsyncSpanFlusher;
use super::reporter::TraceReporterConfig;
use super::sampler::Sampler;
use super::sender::SpanSender;
use super::span::Tracer;

pub struct TracerProvider {
    cfg: TraceReporterConfig,
    sampler: Arc<Sampler>,
    flusher: Arc<AsyncSpanFlusher>,
}

impl TracerProvider {
    /// Start the background flusher and log the readiness line.
    pub fn start(cfg: TraceReporterConfig, sender: Arc<dyn SpanSender>) -> Result<Self> {
        let flusher = Arc::new(AsyncSpanFlusher::start(sender, cfg.flusher_config())?);
        let sampler = Arc::new(cfg.sampler());
        tracing::info!(
            sampler = cfg.sampler_type.as_str(),
            "started publishing tracers to Jaeger on {}",
            cfg.reporter_address()
        );
        Ok(Self {
            cfg,
            sampler,
            flusher,
        })
    }

    pub fn config(&self) -> &TraceReporterConfig {
        &self.cfg
    }

    /// Tracer for one service, sharing this provider's sampler and flusher.
    pub fn tracer(&self, service_name: &str) -> Tracer {
        Tracer::new(service_name, Arc::clone(&self.sampler), Arc::clone(&self.flusher))
    }

    pub fn flusher(&self) -> &AsyncSpanFlusher {
        &self.flusher
    }

    /// Flush what is buffered and stop, waiting at most `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.flusher.shutdown(timeout).await
    }
}
