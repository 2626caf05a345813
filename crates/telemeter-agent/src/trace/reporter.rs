//! Jaeger reporter settings, resolved once at startup.

use std::str::FromStr;
use std::time::Duration;

use telemeter_core::error::{Result, TelemeterError};

use super::flusher::FlusherConfig;
use super::sampler::{Sampler, SamplerType};
use crate::config::JaegerSection;

pub const DEFAULT_REPORTER_HOSTNAME: &str = "localhost";
pub const DEFAULT_REPORTER_PORT: u16 = 5775;
pub const DEFAULT_SAMPLER_TYPE: SamplerType = SamplerType::Const;
pub const DEFAULT_SAMPLER_PARAM: f64 = 1.0;
pub const DEFAULT_REPORTER_FLUSH_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_REPORTER_MAX_BUFFER_SPANS: usize = 10000;

#[derive(Debug, Clone, PartialEq)]
pub struct TraceReporterConfig {
    pub sampler_type: SamplerType,
    pub sampler_param: f64,
    pub reporter_hostname: String,
    pub reporter_port: u16,
    pub flush_interval: Duration,
    pub max_buffer_spans: usize,
}

impl Default for TraceReporterConfig {
    fn default() -> Self {
        Self {
            sampler_type: DEFAULT_SAMPLER_TYPE,
            sampler_param: DEFAULT_SAMPLER_PARAM,
            reporter_hostname: DEFAULT_REPORTER_HOSTNAME.to_string(),
            reporter_port: DEFAULT_REPORTER_PORT,
            flush_interval: Duration::from_millis(DEFAULT_REPORTER_FLUSH_INTERVAL_MS),
            max_buffer_spans: DEFAULT_REPORTER_MAX_BUFFER_SPANS,
        }
    }
}

impl TraceReporterConfig {
    /// Resolve raw settings.
    ///
    /// An unknown sampler type falls back to `const` with an `error:` warning.
    /// A malformed number fails the whole resolution.
    pub fn resolve(raw: &JaegerSection) -> Result<Self> {
        let reporter_port = parse_field("reporter_port", raw.reporter_port.as_deref(), DEFAULT_REPORTER_PORT)?;
        let reporter_hostname = raw
            .reporter_hostname
            .clone()
            .unwrap_or_else(|| DEFAULT_REPORTER_HOSTNAME.to_string());

        let sampler_type = match raw.sampler_type.as_deref() {
            None => DEFAULT_SAMPLER_TYPE,
            Some(s) => SamplerType::parse(s).unwrap_or_else(|| {
                tracing::warn!(
                    sampler_type = %s,
                    "error: Jaeger configuration: \"sampler type\" invalid. Defaulted to const sampling"
                );
                DEFAULT_SAMPLER_TYPE
            }),
        };

        let sampler_param: f64 = parse_field("sampler_param", raw.sampler_param.as_deref(), DEFAULT_SAMPLER_PARAM)?;
        if !sampler_param.is_finite() {
            return Err(init_failed(format!("sampler_param must be finite, got {sampler_param}")));
        }
        let flush_ms: u64 = parse_field(
            "reporter_flush_interval_ms",
            raw.reporter_flush_interval_ms.as_deref(),
            DEFAULT_REPORTER_FLUSH_INTERVAL_MS,
        )?;
        let max_buffer_spans: usize = parse_field(
            "reporter_max_buffer_spans",
            raw.reporter_max_buffer_spans.as_deref(),
            DEFAULT_REPORTER_MAX_BUFFER_SPANS,
        )?;

        Ok(Self {
            sampler_type,
            sampler_param,
            reporter_hostname,
            reporter_port,
            flush_interval: Duration::from_millis(flush_ms),
            max_buffer_spans,
        })
    }

    /// `host:port` of the collector.
    pub fn reporter_address(&self) -> String {
        format!("{}:{}", self.reporter_hostname, self.reporter_port)
    }

    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.sampler_type, self.sampler_param)
    }

    pub fn flusher_config(&self) -> FlusherConfig {
        FlusherConfig {
            flush_interval: self.flush_interval,
            max_buffer_spans: self.max_buffer_spans,
        }
    }
}

pub(crate) fn init_failed(detail: String) -> TelemeterError {
    TelemeterError::Init(format!("initializing Jaeger tracer failed: {detail}"))
}

fn parse_field<T>(field: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s
            .parse::<T>()
            .map_err(|e| init_failed(format!("invalid {field} {s:?}: {e}"))),
    }
}
