//! Prometheus text exposition.
//!
//! Output shape per series (labels in canonical order, every pair followed by
//! a comma, including the last one):
//!
//! ```text
//! requests_total_value{method="GET",path="/sum",} 5
//! response_time_seconds{method="GET",quantile="0.99",} 0.0042
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;

use telemeter_core::LabelSet;

use super::aggregator::AggregatorState;
use super::registry::MetricSample;

/// Stateless formatter from a registry snapshot to a scrape body.
pub struct PrometheusTextExporter;

impl PrometheusTextExporter {
    pub fn render(samples: &[MetricSample]) -> String {
        Self::render_described(samples, &BTreeMap::new())
    }

    /// Render with optional `# HELP` text keyed by metric name.
    pub fn render_described(samples: &[MetricSample], help: &BTreeMap<String, String>) -> String {
        // Names that sanitize to the same family must render under one header.
        let mut ordered: Vec<(String, &MetricSample)> =
            samples.iter().map(|s| (sanitize_name(s.id.name()), s)).collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        let mut out = String::new();
        let mut family: Option<&str> = None;

        for (name, s) in &ordered {
            let raw_name = s.id.name();
            let name = name.as_str();

            if family != Some(name) {
                family = Some(name);
                if let Some(h) = help.get(raw_name) {
                    let _ = writeln!(out, "# HELP {} {}", name, escape_help(h));
                }
                let _ = writeln!(out, "# TYPE {} {}", name, s.state.kind().as_str());
            }

            let labels = render_labels(s.id.labels());
            match &s.state {
                AggregatorState::Counter(v) | AggregatorState::Gauge(v) => {
                    let _ = writeln!(out, "{}_value{{{}}} {}", name, labels, format_value(*v));
                }
                AggregatorState::Summary(snap) => {
                    let line = |out: &mut String, suffix: &str, v: String| {
                        let _ = writeln!(out, "{}_{}{{{}}} {}", name, suffix, labels, v);
                    };
                    line(&mut out, "value", format_value(snap.last));
                    line(&mut out, "count", snap.count.to_string());
                    line(&mut out, "sum", format_value(snap.sum));
                    line(&mut out, "mean", format_value(snap.mean));
                    line(&mut out, "max", format_value(snap.max));
                    line(&mut out, "min", format_value(snap.min));
                    for (p, v) in &snap.quantiles {
                        let _ = writeln!(
                            out,
                            "{}{{{}quantile=\"{}\",}} {}",
                            name,
                            labels,
                            p,
                            format_value(*v)
                        );
                    }
                }
            }
        }
        out
    }
}

/// `k="v",` for each label in canonical order.
fn render_labels(labels: &LabelSet) -> String {
    let mut s = String::new();
    for (k, v) in labels.iter() {
        let _ = write!(s, "{}=\"{}\",", sanitize_name(k), escape_label(v));
    }
    s
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Replace characters outside `[a-zA-Z0-9_:]` (and a leading digit) with `_`.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            let ok = c.is_ascii_alphabetic() || c == '_' || c == ':' || (i > 0 && c.is_ascii_digit());
            if ok {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Decimal rendering; integers without a fraction, scientific only for
/// extreme magnitudes.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        return "NaN".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf".into() } else { "-Inf".into() };
    }
    let a = v.abs();
    if v.fract() == 0.0 && a < 1e15 {
        return format!("{}", v as i64);
    }
    if a >= 1e21 || (a != 0.0 && a < 1e-6) {
        return format!("{v:e}");
    }
    format!("{v}")
}
