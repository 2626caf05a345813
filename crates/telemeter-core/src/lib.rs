//! telemeter core: label sets, series identifiers, and the shared error type.
//!
//! This crate has no async runtime dependency, so instrumentation call sites
//! can share these primitives with the aggregation engine.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Invalid names surface as `TelemeterError` so instrumented processes never
//! crash because of a bad label.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod labels;

pub use error::{ErrorCode, Result, TelemeterError};
pub use labels::{LabelSet, MetricId};
