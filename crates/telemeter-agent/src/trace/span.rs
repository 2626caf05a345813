//! Span lifecycle: `Tracer` -> `ActiveSpan` -> `FinishedSpan`.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Serialize;
use telemeter_core::LabelSet;

use super::flusher::AsyncSpanFlusher;
use super::sampler::Sampler;

/// Identity carried from a parent span to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpanContext {
    pub trace_id: u64,
    pub span_id: u64,
    pub sampled: bool,
}

/// A completed span, ready for the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishedSpan {
    pub trace_id: u64,
    pub span_id: u64,
    pub parent_span_id: Option<u64>,
    pub service: String,
    pub operation: String,
    pub start_unix_micros: u64,
    pub duration_micros: u64,
    pub tags: LabelSet,
}

/// Per-service handle producing spans. Cheap to clone.
#[derive(Clone)]
pub struct Tracer {
    service: Arc<str>,
    sampler: Arc<Sampler>,
    flusher: Arc<AsyncSpanFlusher>,
}

impl Tracer {
    pub(crate) fn new(service: &str, sampler: Arc<Sampler>, flusher: Arc<AsyncSpanFlusher>) -> Self {
        Self {
            service: Arc::from(service),
            sampler,
            flusher,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    /// Start a span. Children inherit the trace id and sampling decision.
    pub fn start_span(&self, operation: &str, parent: Option<SpanContext>) -> ActiveSpan {
        let mut rng = rand::thread_rng();
        let span_id = rng.gen::<u64>();
        let (ctx, parent_span_id) = match parent {
            Some(p) => (
                SpanContext {
                    trace_id: p.trace_id,
                    span_id,
                    sampled: p.sampled,
                },
                Some(p.span_id),
            ),
            None => {
                let trace_id = rng.gen::<u64>();
                let sampled = self.sampler.is_sampled(trace_id);
                (
                    SpanContext {
                        trace_id,
                        span_id,
                        sampled,
                    },
                    None,
                )
            }
        };

        ActiveSpan {
            tracer: self.clone(),
            ctx,
            parent_span_id,
            operation: operation.to_string(),
            started_wall: SystemTime::now(),
            started: Instant::now(),
            tags: Vec::new(),
        }
    }
}

/// An in-flight span. Dropping it without `finish` discards it.
pub struct ActiveSpan {
    tracer: Tracer,
    ctx: SpanContext,
    parent_span_id: Option<u64>,
    operation: String,
    started_wall: SystemTime,
    started: Instant,
    tags: Vec<(String, String)>,
}

impl ActiveSpan {
    pub fn context(&self) -> SpanContext {
        self.ctx
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.push((key.into(), value.into()));
    }

    /// Close the span and hand it to the flusher when sampled.
    pub fn finish(self) {
        if !self.ctx.sampled {
            return;
        }
        let tags = LabelSet::from_pairs(self.tags.into_iter().filter(|(k, _)| !k.is_empty()))
            .unwrap_or_default();
        let start_unix_micros = self
            .started_wall
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        self.tracer.flusher.enqueue(FinishedSpan {
            trace_id: self.ctx.trace_id,
            span_id: self.ctx.span_id,
            parent_span_id: self.parent_span_id,
            service: self.tracer.service.to_string(),
            operation: self.operation,
            start_unix_micros,
            duration_micros: self.started.elapsed().as_micros() as u64,
            tags,
        });
    }
}
