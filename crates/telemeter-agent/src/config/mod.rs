//! Agent config loader (strict parsing).

pub mod schema;

use std::fs;

use telemeter_core::error::{Result, TelemeterError};

pub use schema::{AgentConfig, JaegerSection, MetricsSection, TracingSection};

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "TELEMETER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "telemeter.yaml";

pub fn load_from_file(path: &str) -> Result<AgentConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TelemeterError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AgentConfig> {
    let cfg: AgentConfig = serde_yaml::from_str(s)
        .map_err(|e| TelemeterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `TELEMETER_CONFIG`, falling back to `telemeter.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}
