//! telemeter agent library entry.
//!
//! Wires the metrics registry, Prometheus exporter, tracer configuration and
//! span flusher into one stack. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod config;
pub mod metrics;
pub mod router;
pub mod trace;
