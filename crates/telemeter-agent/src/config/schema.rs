use serde::{Deserialize, Deserializer};
use telemeter_core::error::{Result, TelemeterError};

use crate::metrics::summary::{Percentile, SummaryConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub version: u32,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub tracing: TracingSection,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TelemeterError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_host")]
    pub host: String,

    #[serde(default = "default_metrics_port")]
    pub port: u16,

    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,

    #[serde(default = "default_percentile_tolerance")]
    pub percentile_tolerance: f64,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_window_buckets")]
    pub window_buckets: usize,

    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_metrics_host(),
            port: default_metrics_port(),
            percentiles: default_percentiles(),
            percentile_tolerance: default_percentile_tolerance(),
            window_secs: default_window_secs(),
            window_buckets: default_window_buckets(),
            max_samples: default_max_samples(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if self.percentiles.is_empty() {
            return Err(TelemeterError::Config(
                "metrics.percentiles must not be empty".into(),
            ));
        }
        if self.percentiles.iter().any(|p| !(*p > 0.0 && *p <= 1.0)) {
            return Err(TelemeterError::Config(
                "metrics.percentiles must be in (0, 1]".into(),
            ));
        }
        if !(self.percentile_tolerance > 0.0 && self.percentile_tolerance < 1.0) {
            return Err(TelemeterError::Config(
                "metrics.percentile_tolerance must be in (0, 1)".into(),
            ));
        }
        if self.window_secs == 0 {
            return Err(TelemeterError::Config(
                "metrics.window_secs must be at least 1".into(),
            ));
        }
        if !(1..=60).contains(&self.window_buckets) {
            return Err(TelemeterError::Config(
                "metrics.window_buckets must be between 1 and 60".into(),
            ));
        }
        if self.max_samples < 64 {
            return Err(TelemeterError::Config(
                "metrics.max_samples must be at least 64".into(),
            ));
        }
        Ok(())
    }

    /// Address the scrape listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn summary_config(&self) -> SummaryConfig {
        SummaryConfig {
            percentiles: self
                .percentiles
                .iter()
                .map(|p| Percentile::new(*p, self.percentile_tolerance))
                .collect(),
            window: std::time::Duration::from_secs(self.window_secs),
            window_buckets: self.window_buckets,
            max_samples: self.max_samples,
        }
    }
}

fn default_metrics_host() -> String {
    "0.0.0.0".into()
}
fn default_metrics_port() -> u16 {
    9797
}
fn default_percentiles() -> Vec<f64> {
    vec![0.5, 0.75, 0.98, 0.99, 0.999]
}
fn default_percentile_tolerance() -> f64 {
    0.05
}
fn default_window_secs() -> u64 {
    600
}
fn default_window_buckets() -> usize {
    5
}
fn default_max_samples() -> usize {
    4096
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub jaeger: JaegerSection,
}

/// Raw Jaeger reporter settings.
///
/// Every field is kept as text: numbers are parsed when the tracer is
/// initialized, so a malformed value disables tracing instead of rejecting
/// the whole config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JaegerSection {
    #[serde(default, deserialize_with = "scalar_string")]
    pub reporter_hostname: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub reporter_port: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub sampler_type: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub sampler_param: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub reporter_flush_interval_ms: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub reporter_max_buffer_spans: Option<String>,
}

/// Accept any YAML scalar (string, number, bool) as its textual form.
fn scalar_string<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_yaml::Value::deserialize(de)? {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s)),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected a scalar, found {other:?}"))),
    }
}
