//! Top-level facade crate for telemeter.
//!
//! Re-exports core types and the agent library so users can depend on a single crate.

pub mod core {
    pub use telemeter_core::*;
}

pub mod agent {
    pub use telemeter_agent::*;
}
