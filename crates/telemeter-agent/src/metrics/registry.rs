//! Central series registry.
//!
//! Write path: a shard read lock on the `DashMap` for existing series, and a
//! shard write lock only the first time a `MetricId` is seen. The entry API
//! makes creation exactly-once: racing first callers all land on the same
//! aggregator. Read path: `snapshot` walks shards one at a time and copies
//! each series under its own synchronization, so a scrape never freezes the
//! whole registry.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use telemeter_core::error::{Result, TelemeterError};
use telemeter_core::{LabelSet, MetricId};

use super::aggregator::{Aggregator, AggregatorState, MetricKind};
use super::exporter::{sanitize_name, PrometheusTextExporter};
use super::summary::SummaryConfig;

/// One exported series.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub id: MetricId,
    pub state: AggregatorState,
}

#[derive(Debug, Clone, Copy)]
enum Update {
    Add(f64),
    Set(f64),
    Observe(f64),
}

impl Update {
    fn value(self) -> f64 {
        match self {
            Update::Add(v) | Update::Set(v) | Update::Observe(v) => v,
        }
    }
}

pub struct MetricsRegistry {
    series: DashMap<MetricId, Aggregator>,
    /// Sanitized family name -> (owning metric name, kind).
    families: DashMap<String, (String, MetricKind)>,
    help: DashMap<String, String>,
    summary_cfg: Arc<SummaryConfig>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_summary_config(SummaryConfig::default())
    }

    pub fn with_summary_config(cfg: SummaryConfig) -> Self {
        Self {
            series: DashMap::new(),
            families: DashMap::new(),
            help: DashMap::new(),
            summary_cfg: Arc::new(cfg),
        }
    }

    pub fn summary_config(&self) -> &SummaryConfig {
        &self.summary_cfg
    }

    /// Record `value` into the series `name{labels}` of type `kind`.
    ///
    /// Counters add `value`, gauges add `value` (negative to decrement),
    /// summaries observe it. Failures are logged and the update is dropped.
    pub fn record(&self, name: &str, labels: &LabelSet, kind: MetricKind, value: f64) {
        let update = match kind {
            MetricKind::Counter | MetricKind::Gauge => Update::Add(value),
            MetricKind::Summary => Update::Observe(value),
        };
        if let Err(e) = self.apply(name, labels, kind, update) {
            tracing::warn!(metric = %name, labels = %labels, error = %e, "metric update dropped");
        }
    }

    /// Like `record`, but hands the failure back instead of logging it.
    pub fn try_record(
        &self,
        name: &str,
        labels: &LabelSet,
        kind: MetricKind,
        value: f64,
    ) -> Result<()> {
        let update = match kind {
            MetricKind::Counter | MetricKind::Gauge => Update::Add(value),
            MetricKind::Summary => Update::Observe(value),
        };
        self.apply(name, labels, kind, update)
    }

    /// Increment a counter by 1.
    pub fn increment(&self, name: &str, labels: &LabelSet) {
        self.record(name, labels, MetricKind::Counter, 1.0);
    }

    /// Add a signed delta to a gauge.
    pub fn add_gauge(&self, name: &str, labels: &LabelSet, delta: f64) {
        self.record(name, labels, MetricKind::Gauge, delta);
    }

    /// Overwrite a gauge.
    pub fn set_gauge(&self, name: &str, labels: &LabelSet, value: f64) {
        if let Err(e) = self.apply(name, labels, MetricKind::Gauge, Update::Set(value)) {
            tracing::warn!(metric = %name, labels = %labels, error = %e, "metric update dropped");
        }
    }

    /// Observe a value into a summary.
    pub fn observe(&self, name: &str, labels: &LabelSet, value: f64) {
        self.record(name, labels, MetricKind::Summary, value);
    }

    /// Attach `# HELP` text to a metric name.
    pub fn describe(&self, name: &str, help: &str) {
        self.help.insert(name.to_string(), help.to_string());
    }

    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.help
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn apply(&self, name: &str, labels: &LabelSet, kind: MetricKind, update: Update) -> Result<()> {
        let v = update.value();
        if !v.is_finite() {
            return Err(TelemeterError::Internal(format!("non-finite value {v}")));
        }
        if kind == MetricKind::Counter && v < 0.0 {
            return Err(TelemeterError::Internal(format!(
                "counter increment must not be negative (got {v})"
            )));
        }

        let id = MetricId::new(name, labels.clone())?;

        // Fast path: series exists, shard read lock only.
        if let Some(agg) = self.series.get(&id) {
            return apply_to(&agg, name, kind, update);
        }

        // First sighting of this series: the family must agree on kind and
        // the label names must stay distinct once rendered.
        check_label_names(labels, kind)?;
        self.claim_family(name, kind)?;

        let agg = self
            .series
            .entry(id)
            .or_insert_with(|| Aggregator::new(kind, &self.summary_cfg));
        apply_to(&agg, name, kind, update)
    }

    fn claim_family(&self, name: &str, kind: MetricKind) -> Result<()> {
        let (owner, existing) = self
            .families
            .entry(sanitize_name(name))
            .or_insert_with(|| (name.to_string(), kind))
            .clone();
        if owner != name {
            return Err(TelemeterError::InvalidMetricName(format!(
                "{name:?} renders the same as existing metric {owner:?}"
            )));
        }
        if existing != kind {
            return Err(TelemeterError::KindMismatch {
                name: name.to_string(),
                existing: existing.as_str(),
                requested: kind.as_str(),
            });
        }
        Ok(())
    }

    /// Per-series consistent copy of every series, sorted by `MetricId`.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let mut out: Vec<MetricSample> = self
            .series
            .iter()
            .map(|r| MetricSample {
                id: r.key().clone(),
                state: r.value().state(),
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Scrape body for the current state.
    pub fn render_prometheus(&self) -> String {
        PrometheusTextExporter::render_described(&self.snapshot(), &self.descriptions())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop every series and description.
    pub fn clear(&self) {
        self.series.clear();
        self.families.clear();
        self.help.clear();
    }
}

fn apply_to(agg: &Aggregator, name: &str, kind: MetricKind, update: Update) -> Result<()> {
    match (agg, update) {
        (Aggregator::Counter(c), Update::Add(v)) if kind == MetricKind::Counter => c.inc_by(v),
        (Aggregator::Gauge(g), Update::Add(v)) if kind == MetricKind::Gauge => g.add(v),
        (Aggregator::Gauge(g), Update::Set(v)) if kind == MetricKind::Gauge => g.set(v),
        (Aggregator::Summary(s), Update::Observe(v)) if kind == MetricKind::Summary => s.observe(v),
        _ => {
            return Err(TelemeterError::KindMismatch {
                name: name.to_string(),
                existing: agg.kind().as_str(),
                requested: kind.as_str(),
            })
        }
    }
    Ok(())
}

fn check_label_names(labels: &LabelSet, kind: MetricKind) -> Result<()> {
    let mut seen = HashSet::new();
    for (k, _) in labels.iter() {
        let rendered = sanitize_name(k);
        if kind == MetricKind::Summary && rendered == "quantile" {
            return Err(TelemeterError::InvalidLabel(format!(
                "label {k:?} is reserved on summaries"
            )));
        }
        if !seen.insert(rendered) {
            return Err(TelemeterError::InvalidLabel(format!(
                "label {k:?} collides with another label once sanitized"
            )));
        }
    }
    Ok(())
}
