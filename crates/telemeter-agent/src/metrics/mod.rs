//! In-process metrics: registry, aggregators, windowed summaries, and the
//! Prometheus text exporter.
//!
//! Series are keyed by `MetricId` (name + canonical `LabelSet`) and created on
//! first use. The registry is an explicit object; the composition root owns a
//! single `Arc<MetricsRegistry>` and hands clones to instrumentation sites.

pub mod aggregator;
pub mod exporter;
pub mod registry;
pub mod summary;

pub use aggregator::{AggregatorState, MetricKind};
pub use exporter::PrometheusTextExporter;
pub use registry::{MetricSample, MetricsRegistry};
pub use summary::{Percentile, Summary, SummaryConfig, SummarySnapshot};
