//! Composition root.
//!
//! Builds the enabled features explicitly from config: the metrics registry
//! (when `metrics.enabled`) and the tracer provider (when `tracing.enabled`).
//! Instrumentation sites receive clones of the handles exposed here.

use std::sync::Arc;
use std::time::Duration;

use telemeter_core::error::Result;

use crate::config::AgentConfig;
use crate::metrics::MetricsRegistry;
use crate::trace::reporter::init_failed;
use crate::trace::{SpanSender, TraceReporterConfig, TracerProvider, UdpSpanSender};

#[derive(Clone)]
pub struct AgentState {
    cfg: Arc<AgentConfig>,
    metrics: Option<Arc<MetricsRegistry>>,
    tracing: Option<Arc<TracerProvider>>,
}

impl AgentState {
    /// Build state; tracing is attached separately via `init_tracing*`.
    pub fn new(cfg: AgentConfig) -> Self {
        let metrics = if cfg.metrics.enabled {
            let registry = MetricsRegistry::with_summary_config(cfg.metrics.summary_config());
            tracing::info!("enabled prometheus metrics reporter");
            Some(Arc::new(registry))
        } else {
            None
        };

        Self {
            cfg: Arc::new(cfg),
            metrics,
            tracing: None,
        }
    }

    pub fn cfg(&self) -> &AgentConfig {
        &self.cfg
    }

    pub fn metrics(&self) -> Option<Arc<MetricsRegistry>> {
        self.metrics.clone()
    }

    pub fn tracer_provider(&self) -> Option<Arc<TracerProvider>> {
        self.tracing.clone()
    }

    /// Resolve reporter settings and start publishing over UDP.
    ///
    /// No-op when tracing is disabled. On error tracing stays off and the
    /// rest of the state is untouched.
    pub async fn init_tracing(&mut self) -> Result<()> {
        if !self.cfg.tracing.enabled {
            return Ok(());
        }
        let cfg = TraceReporterConfig::resolve(&self.cfg.tracing.jaeger)?;
        let sender = UdpSpanSender::connect(&cfg.reporter_hostname, cfg.reporter_port)
            .await
            .map_err(|e| init_failed(e.to_string()))?;
        self.attach_tracing(cfg, Arc::new(sender))
    }

    /// Like `init_tracing`, with a caller-provided transport.
    pub fn init_tracing_with(&mut self, sender: Arc<dyn SpanSender>) -> Result<()> {
        if !self.cfg.tracing.enabled {
            return Ok(());
        }
        let cfg = TraceReporterConfig::resolve(&self.cfg.tracing.jaeger)?;
        self.attach_tracing(cfg, sender)
    }

    fn attach_tracing(&mut self, cfg: TraceReporterConfig, sender: Arc<dyn SpanSender>) -> Result<()> {
        let provider = TracerProvider::start(cfg, sender)?;
        self.tracing = Some(Arc::new(provider));
        Ok(())
    }

    /// Best-effort drain of buffered spans.
    pub async fn shutdown(&self, timeout: Duration) {
        if let Some(p) = &self.tracing {
            p.shutdown(timeout).await;
        }
    }
}
