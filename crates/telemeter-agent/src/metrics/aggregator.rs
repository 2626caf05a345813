//! Per-series aggregators.
//!
//! Counter and gauge values are `f64` stored as bits in an `AtomicU64` and
//! updated with a CAS loop, so the write path never takes a lock. Summaries
//! carry a short per-series mutex (see `summary`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::summary::{Summary, SummaryConfig, SummarySnapshot};

/// Aggregator variant requested by a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Summary,
}

impl MetricKind {
    /// Prometheus `# TYPE` name.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Summary => "summary",
        }
    }
}

#[derive(Debug, Default)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn fetch_add(&self, delta: f64) -> f64 {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => cur = actual,
            }
        }
    }
}

/// Monotonic running total.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicF64,
}

impl Counter {
    /// Caller guarantees `v >= 0`.
    pub fn inc_by(&self, v: f64) {
        self.value.fetch_add(v);
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

/// Signed current value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicF64,
}

impl Gauge {
    pub fn add(&self, v: f64) {
        self.value.fetch_add(v);
    }

    pub fn set(&self, v: f64) {
        self.value.store(v);
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

#[derive(Debug)]
pub enum Aggregator {
    Counter(Counter),
    Gauge(Gauge),
    Summary(Summary),
}

impl Aggregator {
    pub fn new(kind: MetricKind, summary_cfg: &Arc<SummaryConfig>) -> Self {
        match kind {
            MetricKind::Counter => Aggregator::Counter(Counter::default()),
            MetricKind::Gauge => Aggregator::Gauge(Gauge::default()),
            MetricKind::Summary => Aggregator::Summary(Summary::new(Arc::clone(summary_cfg))),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Aggregator::Counter(_) => MetricKind::Counter,
            Aggregator::Gauge(_) => MetricKind::Gauge,
            Aggregator::Summary(_) => MetricKind::Summary,
        }
    }

    /// Coherent copy of this series' current state.
    pub fn state(&self) -> AggregatorState {
        match self {
            Aggregator::Counter(c) => AggregatorState::Counter(c.get()),
            Aggregator::Gauge(g) => AggregatorState::Gauge(g.get()),
            Aggregator::Summary(s) => AggregatorState::Summary(s.snapshot()),
        }
    }
}

/// Exported state of one series.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorState {
    Counter(f64),
    Gauge(f64),
    Summary(SummarySnapshot),
}

impl AggregatorState {
    pub fn kind(&self) -> MetricKind {
        match self {
            AggregatorState::Counter(_) => MetricKind::Counter,
            AggregatorState::Gauge(_) => MetricKind::Gauge,
            AggregatorState::Summary(_) => MetricKind::Summary,
        }
    }
}
