//! Tracing support: reporter settings, samplers, span lifecycle, and the
//! background flusher that ships finished spans to a collector.
//!
//! Startup order: `TraceReporterConfig::resolve` (recoverable sampler
//! fallback, fatal numeric errors) -> `TracerProvider::start` with a
//! `SpanSender` -> `provider.tracer(service)` per instrumented service.

pub mod flusher;
pub mod provider;
pub mod reporter;
pub mod sampler;
pub mod sender;
pub mod span;

pub use flusher::{AsyncSpanFlusher, FlusherConfig};
pub use provider::TracerProvider;
pub use reporter::TraceReporterConfig;
pub use sampler::{Sampler, SamplerType};
pub use sender::{SpanSender, UdpSpanSender};
pub use span::{ActiveSpan, FinishedSpan, SpanContext, Tracer};
